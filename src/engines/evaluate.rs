use {
    crate::{
        agents::{
            Algorithm,
            RunMode,
            TD3TrainState,
            TD3,
        },
        components::PrngKey,
        envs::Environment,
    },
    anyhow::Result,
    serde::{
        Deserialize,
        Serialize,
    },
};


/// The outcome of one evaluation: the return and length of every episode.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub returns: Vec<f64>,
    pub lengths: Vec<usize>,
}

impl Evaluation {
    pub fn episodes(&self) -> usize {
        self.returns.len()
    }

    pub fn mean_return(&self) -> f64 {
        if self.returns.is_empty() {
            return 0.0;
        }
        self.returns.iter().sum::<f64>() / self.returns.len() as f64
    }

    pub fn mean_length(&self) -> f64 {
        if self.lengths.is_empty() {
            return 0.0;
        }
        self.lengths.iter().sum::<usize>() as f64 / self.lengths.len() as f64
    }
}


/// Run `eval_episodes` episodes with the deterministic online policy.
///
/// Each episode gets its own key split from `key` and lasts until the
/// environment signals the end or `eval_max_steps` steps have passed. The
/// training state is only read.
pub fn evaluate<Env: Environment>(
    alg: &TD3<Env>,
    ts: &TD3TrainState<Env::State>,
    key: PrngKey,
) -> Result<Evaluation> {
    let config = alg.config();
    let env = alg.env();
    let mut evaluation = Evaluation::default();

    for episode_key in key.split_many(config.eval_episodes) {
        let (key_reset, mut key) = episode_key.split();
        let (mut obs, mut state) = env.reset(key_reset)?;
        let mut total_reward = 0.0;
        let mut length = 0;

        while length < config.eval_max_steps {
            let [key_policy, key_step, next] = key.split_n();
            key = next;
            let action = alg.actions(ts, &obs, RunMode::Test, key_policy)?;
            let step = env.step_env(key_step, &state, &action)?;
            total_reward += step.reward;
            length += 1;
            if step.done() {
                break;
            }
            obs = step.observation;
            state = step.state;
        }

        evaluation.returns.push(total_reward);
        evaluation.lengths.push(length);
    }
    Ok(evaluation)
}


#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            agents::TrainState,
            configs::TD3_Config,
            envs::{
                PendulumConfig,
                PendulumEnv,
            },
        },
        candle_core::Device,
    };

    fn alg(eval_max_steps: usize) -> TD3<PendulumEnv> {
        let env = PendulumEnv::new(PendulumConfig { timelimit: 50, ..Default::default() }).unwrap();
        let config = TD3_Config {
            hidden_1_size: 8,
            hidden_2_size: 8,
            eval_episodes: 3,
            eval_max_steps,
            ..Default::default()
        };
        TD3::new(config, env, &Device::Cpu).unwrap()
    }

    #[test]
    fn episodes_stop_at_the_step_limit_or_the_end() {
        let short = alg(10);
        let ts = short.initialize(PrngKey::new(0)).unwrap();
        let evaluation = evaluate(&short, &ts, PrngKey::new(1)).unwrap();
        assert_eq!(evaluation.episodes(), 3);
        assert_eq!(evaluation.lengths, vec![10, 10, 10]);
        assert!(evaluation.returns.iter().all(|r| *r <= 0.0));

        let long = alg(1_000);
        let ts = long.initialize(PrngKey::new(0)).unwrap();
        let evaluation = evaluate(&long, &ts, PrngKey::new(1)).unwrap();
        assert_eq!(evaluation.mean_length(), 50.0);
    }

    #[test]
    fn evaluation_is_read_only_and_reproducible() {
        let alg = alg(20);
        let ts = alg.initialize(PrngKey::new(7)).unwrap();
        let params = ts.actor().params().unwrap();
        let rng = ts.rng();

        let a = alg.evaluate(&ts, PrngKey::new(3)).unwrap();
        let b = alg.evaluate(&ts, PrngKey::new(3)).unwrap();
        assert_eq!(a, b);
        assert_eq!(ts.rng(), rng);
        assert_eq!(ts.actor().params().unwrap(), params);

        let c = alg.evaluate(&ts, PrngKey::new(4)).unwrap();
        assert_ne!(a.returns, c.returns);
    }

    #[test]
    fn empty_evaluation_has_zero_means() {
        let evaluation = Evaluation::default();
        assert_eq!(evaluation.mean_return(), 0.0);
        assert_eq!(evaluation.mean_length(), 0.0);
    }
}
