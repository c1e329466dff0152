use candle_core::Device;
use td3_rl::{
    agents::{
        Algorithm,
        OffPolicyTrainState,
        TrainState,
        TD3,
    },
    components::PrngKey,
    configs::TD3_Config,
    engines::{
        train,
        Evaluation,
    },
    envs::{
        Environment,
        PendulumConfig,
        PendulumEnv,
        PointEnv,
        PointEnvConfig,
    },
    error::TD3Error,
};

fn small(config: TD3_Config) -> TD3_Config {
    TD3_Config {
        hidden_1_size: 16,
        hidden_2_size: 16,
        batch_size: 8,
        buffer_size: 100,
        fill_buffer: 20,
        total_timesteps: 60,
        eval_freq: 20,
        eval_episodes: 2,
        eval_max_steps: 10,
        ..config
    }
}

fn pendulum(config: TD3_Config) -> TD3<PendulumEnv> {
    let env = PendulumEnv::new(PendulumConfig::default()).unwrap();
    TD3::new(config, env, &Device::Cpu).unwrap()
}

#[test]
fn identical_seeds_give_bit_identical_runs() {
    let alg = pendulum(small(TD3_Config::default()));
    let (a, evals_a) = train(&alg, Some(PrngKey::new(42)), None).unwrap();
    let (b, evals_b) = train(&alg, Some(PrngKey::new(42)), None).unwrap();

    assert_eq!(evals_a, evals_b);
    assert_eq!(a.actor().params().unwrap(), b.actor().params().unwrap());
    assert_eq!(a.actor().target_params().unwrap(), b.actor().target_params().unwrap());
    assert_eq!(a.critic().params().unwrap(), b.critic().params().unwrap());
    assert_eq!(a.critic().target_params().unwrap(), b.critic().target_params().unwrap());
    assert_eq!(a.rng(), b.rng());
    assert_eq!(a.global_step(), 60);
}

#[test]
fn different_seeds_give_different_runs() {
    let alg = pendulum(small(TD3_Config::default()));
    let (a, _) = train(&alg, Some(PrngKey::new(1)), None).unwrap();
    let (b, _) = train(&alg, Some(PrngKey::new(2)), None).unwrap();
    assert_ne!(a.actor().params().unwrap(), b.actor().params().unwrap());
}

#[test]
fn normalized_runs_are_deterministic_too() {
    let env = PointEnv::new(PointEnvConfig::default()).unwrap();
    let alg = TD3::new(small(TD3_Config::pointenv()), env, &Device::Cpu).unwrap();
    let (a, evals_a) = train(&alg, Some(PrngKey::new(7)), None).unwrap();
    let (b, evals_b) = train(&alg, Some(PrngKey::new(7)), None).unwrap();
    assert_eq!(evals_a, evals_b);
    assert_eq!(a.obs_stats(), b.obs_stats());
    assert_eq!(a.critic().params().unwrap(), b.critic().params().unwrap());
}

#[test]
fn resuming_equals_training_straight_through() {
    let half = pendulum(TD3_Config {
        skip_initial_evaluation: true,
        total_timesteps: 20,
        eval_freq: 20,
        ..small(TD3_Config::default())
    });
    let whole = pendulum(TD3_Config {
        skip_initial_evaluation: true,
        total_timesteps: 40,
        eval_freq: 20,
        ..small(TD3_Config::default())
    });

    let (first, _) = train(&half, Some(PrngKey::new(5)), None).unwrap();
    assert_eq!(first.global_step(), 20);
    let (resumed, _) = train(&half, None, Some(first)).unwrap();
    let (straight, _) = train(&whole, Some(PrngKey::new(5)), None).unwrap();

    assert_eq!(resumed.global_step(), 40);
    assert_eq!(resumed.rng(), straight.rng());
    assert_eq!(resumed.actor().params().unwrap(), straight.actor().params().unwrap());
    assert_eq!(resumed.actor().target_params().unwrap(), straight.actor().target_params().unwrap());
    assert_eq!(resumed.critic().params().unwrap(), straight.critic().params().unwrap());
    assert_eq!(resumed.critic().target_params().unwrap(), straight.critic().target_params().unwrap());
    assert_eq!(resumed.replay_buffer().len(), straight.replay_buffer().len());
    assert_eq!(resumed.last_obs(), straight.last_obs());
}

#[test]
fn learning_from_the_first_step_is_deterministic() {
    let alg = pendulum(TD3_Config {
        fill_buffer: 0,
        policy_delay: 1,
        ..small(TD3_Config::default())
    });
    let (a, evals_a) = train(&alg, Some(PrngKey::new(11)), None).unwrap();
    let (b, evals_b) = train(&alg, Some(PrngKey::new(11)), None).unwrap();

    assert_eq!(evals_a.len(), 4);
    assert_eq!(evals_a, evals_b);
    assert_eq!(a.rng(), b.rng());
    assert_eq!(a.actor().params().unwrap(), b.actor().params().unwrap());
    assert_eq!(a.actor().target_params().unwrap(), b.actor().target_params().unwrap());
    assert_eq!(a.critic().params().unwrap(), b.critic().params().unwrap());
    assert_eq!(a.critic().target_params().unwrap(), b.critic().target_params().unwrap());
    assert_ne!(a.actor().params().unwrap(), alg.initialize(PrngKey::new(11)).unwrap().actor().params().unwrap());
}

#[test]
fn start_must_be_exactly_one_of_key_and_state() {
    let alg = pendulum(small(TD3_Config::default()));

    let err = train(&alg, None, None).unwrap_err();
    assert!(matches!(err.downcast_ref::<TD3Error>(), Some(TD3Error::MissingStart)));

    let ts = alg.initialize(PrngKey::new(0)).unwrap();
    let err = train(&alg, Some(PrngKey::new(0)), Some(ts)).unwrap_err();
    assert!(matches!(err.downcast_ref::<TD3Error>(), Some(TD3Error::AmbiguousStart)));
}

fn failing_evaluation(
    _: &TD3<PendulumEnv>,
    _: &td3_rl::agents::TD3TrainState<td3_rl::envs::PendulumState>,
    _: PrngKey,
) -> anyhow::Result<Evaluation> {
    Err(anyhow::anyhow!("evaluation failed"))
}

#[test]
fn evaluation_failures_abort_training() {
    let alg = pendulum(small(TD3_Config::default())).with_eval_callback(failing_evaluation);
    assert!(train(&alg, Some(PrngKey::new(0)), None).is_err());
}
