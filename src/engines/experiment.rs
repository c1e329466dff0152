use {
    super::{
        train,
        Evaluation,
    },
    crate::{
        agents::{
            Algorithm,
            TD3,
        },
        components::PrngKey,
        configs::write_config,
        envs::Environment,
    },
    anyhow::{
        anyhow,
        Result,
    },
    polars::prelude::{
        DataFrame,
        NamedFrom,
        ParquetWriter,
        Series,
    },
    rayon::prelude::*,
    serde::Serialize,
    std::{
        fs::{
            create_dir_all,
            File,
        },
        path::Path,
        time::Instant,
    },
    tracing::warn,
};


/// The keys of `num_seeds` independent runs derived from one seed.
pub fn seed_keys(
    seed_id: u64,
    num_seeds: usize,
) -> Vec<PrngKey> {
    PrngKey::new(seed_id).split_many(num_seeds)
}

/// Train one run per seed, in parallel on the rayon thread pool.
///
/// Every lane owns its training state; only the algorithm value is shared.
/// Returns the evaluations of every seed, in seed order.
pub fn train_seeds<Env>(
    alg: &TD3<Env>,
    seed_id: u64,
    num_seeds: usize,
) -> Result<Vec<Vec<Evaluation>>>
where
    Env: Environment + Sync,
{
    seed_keys(seed_id, num_seeds)
        .into_par_iter()
        .enumerate()
        .map(|(n, key)| {
            let start = Instant::now();
            let (_, evaluations) = train(alg, Some(key), None)?;
            warn!(
                "seed {n}/{num_seeds} finished in {:.2}s with final mean return {:.3}",
                start.elapsed().as_secs_f64(),
                evaluations.last().map(Evaluation::mean_return).unwrap_or_default(),
            );
            Ok(evaluations)
        })
        .collect()
}

/// Run an experiment with TD3 over a batch of seeds.
///
/// # Arguments
///
/// * `path` - The directory where the configs and the collected data will be stored.
/// * `alg` - The algorithm, holding the config and the environment.
/// * `seed_id` - The seed from which the key of every run is derived.
/// * `num_seeds` - The number of independent runs.
///
/// Writes `config_algorithm.ron`, `config_environment.ron` and one
/// `seed_{n}_data.parquet` per seed with the columns `evaluation`,
/// `mean_return` and `mean_length`.
pub fn run_experiment<Env>(
    path: &dyn AsRef<Path>,
    alg: &TD3<Env>,
    seed_id: u64,
    num_seeds: usize,
) -> Result<Vec<Vec<Evaluation>>>
where
    Env: Environment + Sync,
    Env::Config: Serialize,
{
    let path = path.as_ref();

    let alg_config_exists = path.join("config_algorithm.ron").try_exists()?;
    let env_config_exists = path.join("config_environment.ron").try_exists()?;
    if alg_config_exists || env_config_exists {
        return Err(anyhow!(concat!(
            "Config files already exist in this directory!\n",
            "I am assuming I would be overwriting existing data!",
        )));
    }

    create_dir_all(path)?;
    write_config(alg.config(), &path.join("config_algorithm.ron"))?;
    write_config(alg.env().config(), &path.join("config_environment.ron"))?;

    warn!("Collecting data, {num_seeds} seeds from seed id {seed_id}");
    let start = Instant::now();
    let results = train_seeds(alg, seed_id, num_seeds)?;
    warn!("Trained {num_seeds} seeds in {:.2}s", start.elapsed().as_secs_f64());

    for (n, evaluations) in results.iter().enumerate() {
        let mut df = DataFrame::new(vec![
            Series::new(
                "evaluation",
                &(0..evaluations.len() as u32).collect::<Vec<u32>>(),
            ),
            Series::new(
                "mean_return",
                &evaluations.iter().map(Evaluation::mean_return).collect::<Vec<f64>>(),
            ),
            Series::new(
                "mean_length",
                &evaluations.iter().map(Evaluation::mean_length).collect::<Vec<f64>>(),
            ),
        ])?;

        ParquetWriter::new(
            File::create(path.join(format!("seed_{n}_data.parquet")))?
        ).finish(&mut df)?;
    }
    Ok(results)
}

/// Time the seed-parallel training over three repetitions and return the
/// mean wall-clock time in seconds.
pub fn time_fit<Env>(
    alg: &TD3<Env>,
    seed_id: u64,
    num_seeds: usize,
) -> Result<f64>
where
    Env: Environment + Sync,
{
    const REPETITIONS: usize = 3;

    let mut times = Vec::with_capacity(REPETITIONS);
    for repetition in 0..REPETITIONS {
        let start = Instant::now();
        train_seeds(alg, seed_id, num_seeds)?;
        let elapsed = start.elapsed().as_secs_f64();
        warn!("Fit {repetition}: {num_seeds} seeds in {elapsed:.2}s");
        times.push(elapsed);
    }
    let mean = times.iter().sum::<f64>() / REPETITIONS as f64;
    warn!("Mean fit time over {REPETITIONS} repetitions: {mean:.2}s");
    Ok(mean)
}
