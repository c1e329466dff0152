use {
    super::Evaluation,
    crate::{
        agents::{
            Algorithm,
            TrainState,
        },
        components::PrngKey,
        configs::AlgorithmConfig,
        error::TD3Error,
    },
    anyhow::Result,
    tracing::{
        info,
        warn,
    },
};


/// Evaluate without touching the training state: the key is folded from the
/// state's key and the evaluation index.
fn evaluate_at<Alg: Algorithm>(
    alg: &Alg,
    ts: &Alg::TrainState,
    index: usize,
) -> Result<Evaluation> {
    let evaluation = alg.evaluate(ts, ts.rng().fold_in(index as u64))?;
    warn!(
        "evaluation {index} at step {}: mean return {:.3}, mean length {:.1}",
        ts.global_step(),
        evaluation.mean_return(),
        evaluation.mean_length(),
    );
    Ok(evaluation)
}

/// Train for `total_timesteps` iterations, evaluating every `eval_freq`.
///
/// Exactly one of `key` (start a fresh run) and `ts` (continue a run) must be
/// given. Unless `skip_initial_evaluation` is set, the untrained policy is
/// evaluated first. Then `ceil(total_timesteps / eval_freq)` blocks of
/// `eval_freq` iterations follow, each closed by an evaluation.
///
/// Returns the final training state and the evaluations in order.
pub fn train<Alg>(
    alg: &Alg,
    key: Option<PrngKey>,
    ts: Option<Alg::TrainState>,
) -> Result<(Alg::TrainState, Vec<Evaluation>)>
where
    Alg: Algorithm,
    Alg::Config: AlgorithmConfig,
{
    let mut ts = match (key, ts) {
        (Some(key), None) => alg.initialize(key)?,
        (None, Some(ts)) => ts,
        (None, None) => return Err(TD3Error::MissingStart.into()),
        (Some(_), Some(_)) => return Err(TD3Error::AmbiguousStart.into()),
    };

    let config = alg.config();
    let eval_freq = config.eval_freq();
    let num_blocks = config.total_timesteps().div_ceil(eval_freq);
    let mut evaluations = Vec::with_capacity(num_blocks + 1);

    if !config.skip_initial_evaluation() {
        evaluations.push(evaluate_at(alg, &ts, 0)?);
    }

    for block in 1..=num_blocks {
        for _ in 0..eval_freq {
            ts = alg.train_iteration(ts)?;
        }
        info!("finished block {block}/{num_blocks} at step {}", ts.global_step());
        evaluations.push(evaluate_at(alg, &ts, block)?);
    }

    Ok((ts, evaluations))
}


#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            agents::{
                OffPolicyTrainState,
                TD3,
            },
            configs::TD3_Config,
            envs::{
                Environment,
                PointEnv,
                PointEnvConfig,
            },
        },
        candle_core::Device,
    };

    fn alg(config: TD3_Config) -> TD3<PointEnv> {
        let env = PointEnv::new(PointEnvConfig::default()).unwrap();
        let config = TD3_Config {
            hidden_1_size: 8,
            hidden_2_size: 8,
            batch_size: 4,
            buffer_size: 32,
            fill_buffer: 10,
            eval_episodes: 2,
            eval_max_steps: 5,
            ..config
        };
        TD3::new(config, env, &Device::Cpu).unwrap()
    }

    #[test]
    fn exactly_one_start_must_be_given() {
        let alg = alg(TD3_Config::default());
        assert!(matches!(
            train(&alg, None, None).unwrap_err().downcast_ref::<TD3Error>(),
            Some(TD3Error::MissingStart),
        ));

        let ts = alg.initialize(PrngKey::new(0)).unwrap();
        assert!(matches!(
            train(&alg, Some(PrngKey::new(0)), Some(ts)).unwrap_err().downcast_ref::<TD3Error>(),
            Some(TD3Error::AmbiguousStart),
        ));
    }

    #[test]
    fn evaluation_schedule() {
        let alg = alg(TD3_Config {
            total_timesteps: 25,
            eval_freq: 10,
            ..Default::default()
        });
        let (ts, evaluations) = train(&alg, Some(PrngKey::new(1)), None).unwrap();
        // initial + ceil(25 / 10) blocks of 10
        assert_eq!(evaluations.len(), 4);
        assert_eq!(ts.global_step(), 30);
        assert_eq!(ts.replay_buffer().len(), 30.min(32));

        let alg = alg_skip();
        let (_, evaluations) = train(&alg, Some(PrngKey::new(1)), None).unwrap();
        assert_eq!(evaluations.len(), 2);
    }

    fn alg_skip() -> TD3<PointEnv> {
        alg(TD3_Config {
            total_timesteps: 20,
            eval_freq: 10,
            skip_initial_evaluation: true,
            ..Default::default()
        })
    }

    #[test]
    fn training_can_be_resumed() {
        let alg = alg_skip();
        let (ts, first) = train(&alg, Some(PrngKey::new(2)), None).unwrap();
        let (ts, second) = train(&alg, None, Some(ts)).unwrap();
        assert_eq!(ts.global_step(), 40);
        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 2);
        assert_eq!(alg.env().observation_space(), vec![4]);
    }
}
