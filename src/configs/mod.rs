mod td3;

pub use td3::TD3_Config;

use {
    anyhow::Result,
    serde::{
        de::DeserializeOwned,
        Serialize,
    },
    std::{
        fs::File,
        io::{
            Read,
            Write,
        },
        path::Path,
    },
};


pub trait AlgorithmConfig {
    fn total_timesteps(&self) -> usize;
    fn eval_freq(&self) -> usize;
    fn skip_initial_evaluation(&self) -> bool;
}


/// Read a config from a RON file.
///
/// Unknown keys are an error for configs marked `deny_unknown_fields`, and
/// missing keys take their default values for configs marked `default`.
pub fn read_config<C: DeserializeOwned>(
    path: &dyn AsRef<Path>,
) -> Result<C> {
    let mut contents = String::new();
    File::open(path)?.read_to_string(&mut contents)?;
    Ok(ron::from_str(&contents)?)
}

/// Write a config to a RON file, pretty-printed.
pub fn write_config<C: Serialize>(
    config: &C,
    path: &dyn AsRef<Path>,
) -> Result<()> {
    File::create(path)?.write_all(
        ron::ser::to_string_pretty(
            config,
            ron::ser::PrettyConfig::default(),
        )?.as_bytes()
    )?;
    Ok(())
}
