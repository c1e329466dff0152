use {
    td3_rl::{
        agents::TD3,
        configs::{
            read_config,
            TD3_Config,
        },
        engines::run_experiment,
        envs::{
            Environment,
            PointEnv,
            PointEnvConfig,
        },
        logging::setup_logging,
    },
    candle_core::Device,
    clap::{
        Parser,
        ValueEnum,
    },
    anyhow::Result,
    tracing::{
        Level,
        warn,
    },
    std::path::Path,
};


#[derive(ValueEnum, Debug, Clone)]
enum ArgLoglevel {
    Error,
    Warn,
    Info,
    None,
}

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Environment config.
    #[arg(long)]
    pub env_config: Option<String>,

    /// Algorithm config.
    #[arg(long)]
    pub alg_config: Option<String>,

    /// The number of seeds to train in parallel.
    #[arg(long, default_value_t = 10)]
    pub num_seeds: usize,

    /// The seed all run keys are derived from.
    #[arg(long, default_value_t = 0)]
    pub seed_id: u64,

    /// Setup logging
    #[arg(long, value_enum, default_value_t=ArgLoglevel::Warn)]
    pub log: ArgLoglevel,

    /// Experiment name to use for logging / collecting data.
    #[arg(long)]
    pub name: String,
}


fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.log {
        ArgLoglevel::Error => Some(Level::ERROR),
        ArgLoglevel::Warn => Some(Level::WARN),
        ArgLoglevel::Info => Some(Level::INFO),
        ArgLoglevel::None => None,
    };
    setup_logging(&format!("{}.log", args.name), level, level)?;


    //// Create the Environment ////

    let env = PointEnv::new(match args.env_config {
        Some(config_path) => read_config(&config_path)?,
        None => PointEnvConfig::default(),
    })?;


    //// Read the Algorithm Config ////

    let alg_config = match args.alg_config {
        Some(config_path) => read_config(&config_path)?,
        None => TD3_Config::pointenv(),
    };


    //// Run TD3 in Experiment ////

    let td3 = TD3::new(alg_config, env, &Device::Cpu)?;
    let results = run_experiment(
        &Path::new("data/").join(&args.name),
        &td3,
        args.seed_id,
        args.num_seeds,
    )?;

    for (n, evaluations) in results.iter().enumerate() {
        if let Some(last) = evaluations.last() {
            warn!(
                "seed {n}: final mean return {:.3}, mean episode length {:.1}",
                last.mean_return(),
                last.mean_length(),
            );
        }
    }
    Ok(())
}
