mod pendulum;
mod point_env;

use {
    crate::components::PrngKey,
    anyhow::Result,
    rand::Rng,
    std::{
        fmt::Debug,
        ops::RangeInclusive,
    },
};

pub use crate::envs::{
    pendulum::{
        PendulumConfig,
        PendulumEnv,
        PendulumState,
    },
    point_env::{
        PointEnv,
        PointEnvConfig,
        PointReward,
        PointState,
    },
};

/// The result of stepping an environment.
///
/// # Fields
///
/// * `observation` - The observation after the step (after an automatic
///   reset, the first observation of the new episode).
/// * `state` - The environment state after the step.
/// * `reward` - The reward for this step.
/// * `terminated` - The episode reached a terminal state.
/// * `truncated` - The episode hit its time limit.
#[derive(Clone, Debug)]
pub struct Step<S> {
    pub observation: Vec<f64>,
    pub state: S,
    pub reward: f64,
    pub terminated: bool,
    pub truncated: bool,
}

impl<S> Step<S> {
    pub fn done(&self) -> bool {
        self.terminated || self.truncated
    }
}

/// A functional environment.
///
/// The environment value itself is immutable; everything that changes during
/// an episode lives in [`Environment::State`] and every source of randomness
/// is passed in as a [`PrngKey`]. This lets one environment value be shared by
/// many independent training runs.
pub trait Environment {
    type Config;
    type State: Clone + Debug + Send;

    fn config(&self) -> &Self::Config;
    fn new(config: Self::Config) -> Result<Box<Self>>;

    /// Start a new episode.
    fn reset(
        &self,
        key: PrngKey,
    ) -> Result<(Vec<f64>, Self::State)>;

    /// Advance the episode by one step, without resetting at its end.
    fn step_env(
        &self,
        key: PrngKey,
        state: &Self::State,
        action: &[f64],
    ) -> Result<Step<Self::State>>;

    fn action_space(&self) -> Vec<usize>;
    fn action_domain(&self) -> Vec<RangeInclusive<f64>>;
    fn observation_space(&self) -> Vec<usize>;

    /// Advance the episode by one step, resetting automatically when the
    /// episode ends. The returned observation and state then belong to the
    /// new episode while reward and flags describe the step that ended it.
    fn step(
        &self,
        key: PrngKey,
        state: &Self::State,
        action: &[f64],
    ) -> Result<Step<Self::State>> {
        let (key_step, key_reset) = key.split();
        let step = self.step_env(key_step, state, action)?;
        if step.done() {
            let (observation, state) = self.reset(key_reset)?;
            Ok(Step { observation, state, ..step })
        } else {
            Ok(step)
        }
    }
}

/// Sample an action uniformly from a box-shaped action domain.
pub fn sample_action(
    key: PrngKey,
    domain: &[RangeInclusive<f64>],
) -> Vec<f64> {
    let mut rng = key.rng();
    domain.iter().map(|r| rng.gen_range(r.clone())).collect()
}

/// Clip an action elementwise into a box-shaped action domain.
pub fn clip_action(
    action: &[f64],
    domain: &[RangeInclusive<f64>],
) -> Vec<f64> {
    action
        .iter()
        .zip(domain)
        .map(|(a, r)| a.clamp(*r.start(), *r.end()))
        .collect()
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sampled_actions_lie_in_domain() {
        let domain = [-2.0..=2.0, 0.5..=0.5, 0.0..=10.0];
        for seed in 0..100 {
            let action = sample_action(PrngKey::new(seed), &domain);
            assert_eq!(action.len(), 3);
            for (a, r) in action.iter().zip(&domain) {
                assert!(r.contains(a));
            }
        }
    }

    #[test]
    fn clip_action_clamps_each_dimension() {
        let domain = [-1.0..=1.0, 0.0..=2.0];
        assert_eq!(clip_action(&[-3.0, 5.0], &domain), vec![-1.0, 2.0]);
        assert_eq!(clip_action(&[0.25, 1.0], &domain), vec![0.25, 1.0]);
    }
}
