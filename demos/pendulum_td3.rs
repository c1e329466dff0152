use {
    td3_rl::{
        agents::{
            Algorithm,
            TrainState,
            TD3,
        },
        components::PrngKey,
        configs::TD3_Config,
        engines::train,
        envs::{
            Environment,
            PendulumConfig,
            PendulumEnv,
        },
        logging::setup_logging,
    },
    candle_core::Device,
    anyhow::Result,
    tracing::{
        Level,
        warn,
    },
};


/// Train a single seed on the pendulum, then continue the same run for a
/// second round from the returned training state.
fn main() -> Result<()> {
    setup_logging(&"pendulum_td3.log", Some(Level::INFO), Some(Level::WARN))?;

    let env = PendulumEnv::new(PendulumConfig::default())?;
    let td3 = TD3::new(TD3_Config::pendulum(), env, &Device::Cpu)?;

    let (ts, evaluations) = train(&td3, Some(PrngKey::new(0)), None)?;
    for (i, evaluation) in evaluations.iter().enumerate() {
        warn!("round 1, evaluation {i}: {:.3}", evaluation.mean_return());
    }

    let (ts, evaluations) = train(&td3, None, Some(ts))?;
    for (i, evaluation) in evaluations.iter().enumerate() {
        warn!("round 2, evaluation {i}: {:.3}", evaluation.mean_return());
    }

    let final_evaluation = td3.evaluate(&ts, PrngKey::new(1))?;
    warn!(
        "after {} steps: mean return {:.3} over {} episodes",
        ts.global_step(),
        final_evaluation.mean_return(),
        final_evaluation.episodes(),
    );
    Ok(())
}
