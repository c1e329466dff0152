use {
    super::{
        Environment,
        Step,
    },
    crate::{
        components::PrngKey,
        error::TD3Error,
    },
    anyhow::Result,
    rand::Rng,
    serde::{
        Deserialize,
        Serialize,
    },
    std::ops::RangeInclusive,
};


/// The reward function of the [`PointEnv`].
///
/// * `Distance` - The negative euclidean distance to the goal.
/// * `Sparse` - `1.0` when the goal is reached, `0.0` otherwise.
/// * `SparseTimePenalty` - `1.0` when the goal is reached, `-1.0` otherwise.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointReward {
    Distance,
    Sparse,
    SparseTimePenalty,
}
impl PointReward {
    pub fn compute(
        &self,
        distance: f64,
        reached: bool,
    ) -> f64 {
        match self {
            PointReward::Distance => -distance,
            PointReward::Sparse => if reached {1.0} else {0.0},
            PointReward::SparseTimePenalty => if reached {1.0} else {-1.0},
        }
    }
}

/// The configuration struct for the [`PointEnv`] environment.
///
/// # Fields
/// * `width` - The width of the environment.
/// * `height` - The height of the environment.
/// * `timelimit` - The maximum number of steps before the episode is truncated.
/// * `step_radius` - The maximum distance the agent can move per dimension in one step.
/// * `term_radius` - If the agent is within this radius of the goal, the goal is reached.
/// * `terminate_at_goal` - Whether reaching the goal terminates the episode.
/// * `reward` - The reward function. For more information, see [`PointReward`].
///
/// # Example
/// ```
/// use td3_rl::envs::{
///     PointEnvConfig,
///     PointReward,
/// };
///
/// let config = PointEnvConfig::default();
/// assert_eq!(config.width, 5.0);
/// assert_eq!(config.timelimit, 30);
/// assert_eq!(config.reward, PointReward::Distance);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct PointEnvConfig {
    pub width: f64,
    pub height: f64,
    pub timelimit: usize,
    pub step_radius: f64,
    pub term_radius: f64,
    pub terminate_at_goal: bool,
    pub reward: PointReward,
}
impl Default for PointEnvConfig {
    fn default() -> Self {
        Self {
            width: 5.0,
            height: 5.0,
            timelimit: 30,
            step_radius: 1.0,
            term_radius: 0.5,
            terminate_at_goal: true,
            reward: PointReward::Distance,
        }
    }
}
impl PointEnvConfig {
    #[allow(clippy::neg_cmp_op_on_partial_ord)]
    pub fn check(&self) -> Result<(), TD3Error> {
        let invalid = |param, message: &str| Err(TD3Error::InvalidConfig {
            param,
            message: message.to_owned(),
        });

        if !(self.width > 0.0 && self.height > 0.0) {
            return invalid("width", "width and height must be positive");
        }
        if !(self.step_radius > 0.0) {
            return invalid("step_radius", "must be positive");
        }
        if !(self.term_radius > 0.0) {
            return invalid("term_radius", "must be positive");
        }
        if self.term_radius * 4.0 >= self.width.min(self.height) {
            return invalid("term_radius", "term radius * 4.0 must be less than width and height");
        }
        if self.timelimit == 0 {
            return invalid("timelimit", "must be at least 1");
        }
        Ok(())
    }
}


#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointState {
    pub x: f64,
    pub y: f64,
    pub goal_x: f64,
    pub goal_y: f64,
    pub time: usize,
}
impl PointState {
    fn observation(&self) -> Vec<f64> {
        vec![self.x, self.y, self.goal_x, self.goal_y]
    }

    fn distance_to_goal(&self) -> f64 {
        ((self.x - self.goal_x).powi(2) + (self.y - self.goal_y).powi(2)).sqrt()
    }
}


/// A point moving in an open rectangle towards a goal.
///
/// Start and goal are sampled uniformly at reset, with the goal never
/// reachable right away. The dynamics are deterministic: the action is
/// clipped to the step radius and the resulting position to the rectangle.
pub struct PointEnv {
    config: PointEnvConfig,
}
impl PointEnv {
    fn sample_point(
        &self,
        rng: &mut impl Rng,
    ) -> (f64, f64) {
        (
            rng.gen_range(0.0..=self.config.width),
            rng.gen_range(0.0..=self.config.height),
        )
    }
}

impl Environment for PointEnv {
    type Config = PointEnvConfig;
    type State = PointState;

    fn config(&self) -> &Self::Config {
        &self.config
    }

    fn new(config: Self::Config) -> Result<Box<Self>> {
        config.check()?;
        Ok(Box::new(Self { config }))
    }

    fn reset(
        &self,
        key: PrngKey,
    ) -> Result<(Vec<f64>, Self::State)> {
        let mut rng = key.rng();
        let (x, y) = self.sample_point(&mut rng);
        let state = loop {
            let (goal_x, goal_y) = self.sample_point(&mut rng);
            let state = PointState { x, y, goal_x, goal_y, time: 0 };
            if state.distance_to_goal() > self.config.term_radius {
                break state;
            }
        };
        Ok((state.observation(), state))
    }

    fn step_env(
        &self,
        _key: PrngKey,
        state: &Self::State,
        action: &[f64],
    ) -> Result<Step<Self::State>> {
        TD3Error::check_len("point env action", 2, action.len())?;
        let r = self.config.step_radius;

        let next = PointState {
            x: (state.x + action[0].clamp(-r, r)).clamp(0.0, self.config.width),
            y: (state.y + action[1].clamp(-r, r)).clamp(0.0, self.config.height),
            time: state.time + 1,
            ..*state
        };

        let distance = next.distance_to_goal();
        let reached = distance <= self.config.term_radius;
        let terminated = self.config.terminate_at_goal && reached;

        Ok(Step {
            observation: next.observation(),
            reward: self.config.reward.compute(distance, reached),
            truncated: !terminated && next.time >= self.config.timelimit,
            terminated,
            state: next,
        })
    }

    fn action_space(&self) -> Vec<usize> {
        vec![2]
    }

    fn action_domain(&self) -> Vec<RangeInclusive<f64>> {
        let r = self.config.step_radius;
        vec![-r..=r, -r..=r]
    }

    fn observation_space(&self) -> Vec<usize> {
        vec![4]
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn env(reward: PointReward) -> Box<PointEnv> {
        PointEnv::new(PointEnvConfig { reward, ..Default::default() }).unwrap()
    }

    #[test]
    fn reset_places_goal_out_of_reach() {
        let env = env(PointReward::Distance);
        for seed in 0..100 {
            let (obs, state) = env.reset(PrngKey::new(seed)).unwrap();
            assert_eq!(obs, vec![state.x, state.y, state.goal_x, state.goal_y]);
            assert!(state.distance_to_goal() > 0.5);
            assert!((0.0..=5.0).contains(&state.x) && (0.0..=5.0).contains(&state.goal_y));
        }
    }

    #[test]
    fn movement_is_clipped_to_step_radius_and_walls() {
        let env = env(PointReward::Distance);
        let state = PointState { x: 4.5, y: 2.0, goal_x: 0.0, goal_y: 0.0, time: 0 };
        let step = env.step_env(PrngKey::new(0), &state, &[3.0, -3.0]).unwrap();
        assert_eq!(step.state.x, 5.0);
        assert_eq!(step.state.y, 1.0);
        assert_eq!(step.state.goal_x, 0.0);
        assert_eq!(step.state.time, 1);
    }

    #[test]
    fn reaching_the_goal_terminates() {
        let env = env(PointReward::Sparse);
        let state = PointState { x: 1.0, y: 1.0, goal_x: 1.5, goal_y: 1.5, time: 0 };
        let step = env.step_env(PrngKey::new(0), &state, &[0.5, 0.5]).unwrap();
        assert!(step.terminated && !step.truncated);
        assert_eq!(step.reward, 1.0);

        let far = env.step_env(PrngKey::new(0), &state, &[-0.5, -0.5]).unwrap();
        assert!(!far.done());
        assert_eq!(far.reward, 0.0);
    }

    #[test]
    fn distance_reward_is_negative_distance() {
        let env = env(PointReward::Distance);
        let state = PointState { x: 0.0, y: 0.0, goal_x: 3.0, goal_y: 4.0, time: 0 };
        let step = env.step_env(PrngKey::new(0), &state, &[0.0, 0.0]).unwrap();
        assert!((step.reward + 5.0).abs() < 1e-12);
    }

    #[test]
    fn truncates_at_timelimit() {
        let env = env(PointReward::Distance);
        let state = PointState { x: 0.0, y: 0.0, goal_x: 3.0, goal_y: 4.0, time: 29 };
        let step = env.step_env(PrngKey::new(0), &state, &[0.0, 0.0]).unwrap();
        assert!(step.truncated && !step.terminated);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = PointEnvConfig { term_radius: 2.0, ..Default::default() };
        assert!(PointEnv::new(config).is_err());
        let config = PointEnvConfig { step_radius: 0.0, ..Default::default() };
        assert!(PointEnv::new(config).is_err());
    }
}
