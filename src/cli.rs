use {
    crate::{
        agents::TD3,
        configs::{
            read_config,
            TD3_Config,
        },
        engines::{
            run_experiment,
            time_fit,
            train_seeds,
            Evaluation,
        },
        envs::Environment,
        logging::setup_logging,
    },
    anyhow::Result,
    candle_core::Device,
    clap::{
        Parser,
        ValueEnum,
    },
    serde::Serialize,
    std::{
        path::PathBuf,
        time::Instant,
    },
    tracing::{
        warn,
        Level,
    },
};


#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum Algorithm {
    Td3,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum Env {
    Pendulum,
    Pointenv,
}
impl Env {
    pub fn name(&self) -> &str {
        match self {
            Env::Pendulum => "pendulum",
            Env::Pointenv => "pointenv",
        }
    }

    /// The algorithm config tuned for this environment.
    pub fn preset(&self) -> TD3_Config {
        match self {
            Env::Pendulum => TD3_Config::pendulum(),
            Env::Pointenv => TD3_Config::pointenv(),
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum Loglevel {
    Error, // put these only during active debugging and then downgrade later
    Warn,  // main events in the program
    Info,  // all the little details
    None,  // don't log anything
}
impl Loglevel {
    pub fn level(&self) -> Option<Level> {
        match self {
            Loglevel::Error => Some(Level::ERROR),
            Loglevel::Warn => Some(Level::WARN),
            Loglevel::Info => Some(Level::INFO),
            Loglevel::None => None,
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// The algorithm to train.
    #[arg(long, value_enum, default_value_t=Algorithm::Td3)]
    pub algorithm: Algorithm,

    /// The environment to train on.
    #[arg(long, value_enum)]
    pub env: Env,

    /// A RON file with the algorithm config. Defaults to the environment's preset.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// A RON file with the environment config. Defaults to the environment's defaults.
    #[arg(long)]
    pub env_config: Option<PathBuf>,

    /// The seed from which the keys of all runs are derived.
    #[arg(long, default_value_t = 0)]
    pub seed_id: u64,

    /// The number of independent runs, trained in parallel.
    #[arg(long, default_value_t = 1)]
    pub num_seeds: usize,

    /// Also time the fit over three repetitions.
    #[arg(long)]
    pub time_fit: bool,

    /// Setup logging
    #[arg(long, value_enum, default_value_t=Loglevel::Warn)]
    pub log: Loglevel,

    /// Directory to write the experiment data to.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

impl Args {
    pub fn algorithm_config(&self) -> Result<TD3_Config> {
        let config = match &self.config {
            Some(path) => read_config(path)?,
            None => self.env.preset(),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Set up logging, then train the requested seeds on `Env` and report the
/// mean final return and the wall-clock time.
pub fn run<E>(args: &Args) -> Result<Vec<Vec<Evaluation>>>
where
    E: Environment + Sync,
    E::Config: Default + Serialize + serde::de::DeserializeOwned,
{
    setup_logging(
        &format!("{}_td3.log", args.env.name()),
        args.log.level(),
        args.log.level(),
    )?;

    let env_config = match &args.env_config {
        Some(path) => read_config(path)?,
        None => E::Config::default(),
    };
    let alg = TD3::new(args.algorithm_config()?, E::new(env_config)?, &Device::Cpu)?;

    warn!(
        "training {:?} on {} with {} seeds from seed id {}",
        args.algorithm, args.env.name(), args.num_seeds, args.seed_id,
    );

    let start = Instant::now();
    let results = match &args.output {
        Some(path) => run_experiment(path, &alg, args.seed_id, args.num_seeds)?,
        None => train_seeds(&alg, args.seed_id, args.num_seeds)?,
    };
    let elapsed = start.elapsed().as_secs_f64();

    let finals: Vec<f64> = results
        .iter()
        .filter_map(|evaluations| evaluations.last().map(Evaluation::mean_return))
        .collect();
    let mean_final = finals.iter().sum::<f64>() / finals.len().max(1) as f64;
    println!(
        "{} seeds on {}: mean final return {mean_final:.3} in {elapsed:.2}s",
        results.len(),
        args.env.name(),
    );

    if args.time_fit {
        let mean = time_fit(&alg, args.seed_id, args.num_seeds)?;
        println!("mean fit time over three repetitions: {mean:.2}s");
    }
    Ok(results)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arguments_parse_with_defaults() {
        let args = Args::try_parse_from(["td3_rl", "--env", "pointenv", "--num-seeds", "4"]).unwrap();
        assert!(matches!(args.algorithm, Algorithm::Td3));
        assert_eq!(args.num_seeds, 4);
        assert_eq!(args.seed_id, 0);
        assert!(!args.time_fit);
        assert_eq!(args.algorithm_config().unwrap(), TD3_Config::pointenv());
    }

    #[test]
    fn unknown_environment_is_rejected() {
        assert!(Args::try_parse_from(["td3_rl", "--env", "cartpole"]).is_err());
    }
}
