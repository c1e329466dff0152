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
    std::{
        f64::consts::PI,
        ops::RangeInclusive,
    },
};


/// The configuration struct for the [`PendulumEnv`] environment.
///
/// # Fields
/// * `max_speed` - Angular velocities are clipped to `[-max_speed, max_speed]`.
/// * `max_torque` - The action domain is `[-max_torque, max_torque]`.
/// * `dt` - The integration time step.
/// * `g` - Gravitational acceleration.
/// * `m` - Mass of the pendulum.
/// * `l` - Length of the pendulum.
/// * `timelimit` - The number of steps after which the episode is truncated.
///
/// # Example
/// ```
/// use td3_rl::envs::PendulumConfig;
///
/// let config = PendulumConfig::default();
/// assert_eq!(config.max_torque, 2.0);
/// assert_eq!(config.timelimit, 200);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct PendulumConfig {
    pub max_speed: f64,
    pub max_torque: f64,
    pub dt: f64,
    pub g: f64,
    pub m: f64,
    pub l: f64,
    pub timelimit: usize,
}
impl Default for PendulumConfig {
    fn default() -> Self {
        Self {
            max_speed: 8.0,
            max_torque: 2.0,
            dt: 0.05,
            g: 10.0,
            m: 1.0,
            l: 1.0,
            timelimit: 200,
        }
    }
}

impl PendulumConfig {
    #[allow(clippy::neg_cmp_op_on_partial_ord)]
    pub fn check(&self) -> Result<(), TD3Error> {
        let invalid = |param, message: &str| Err(TD3Error::InvalidConfig {
            param,
            message: message.to_owned(),
        });

        for (param, value) in [
            ("max_speed", self.max_speed),
            ("max_torque", self.max_torque),
            ("dt", self.dt),
            ("m", self.m),
            ("l", self.l),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                return invalid(param, "must be positive and finite");
            }
        }
        if !self.g.is_finite() {
            return invalid("g", "must be finite");
        }
        if self.timelimit == 0 {
            return invalid("timelimit", "must be at least 1");
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PendulumState {
    pub theta: f64,
    pub theta_dot: f64,
    pub time: usize,
}
impl PendulumState {
    fn observation(&self) -> Vec<f64> {
        vec![self.theta.cos(), self.theta.sin(), self.theta_dot]
    }
}

/// Map an angle to `[-pi, pi)`.
fn angle_normalize(x: f64) -> f64 {
    (x + PI).rem_euclid(2.0 * PI) - PI
}


/// The classic inverted pendulum swing-up task.
///
/// The pendulum starts in a random position and has to be swung up and
/// balanced upright. There is no terminal state, episodes end by truncation.
pub struct PendulumEnv {
    config: PendulumConfig,
}

impl Environment for PendulumEnv {
    type Config = PendulumConfig;
    type State = PendulumState;

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
        let state = PendulumState {
            theta: rng.gen_range(-PI..=PI),
            theta_dot: rng.gen_range(-1.0..=1.0),
            time: 0,
        };
        Ok((state.observation(), state))
    }

    fn step_env(
        &self,
        _key: PrngKey,
        state: &Self::State,
        action: &[f64],
    ) -> Result<Step<Self::State>> {
        TD3Error::check_len("pendulum action", 1, action.len())?;
        let PendulumConfig { max_speed, max_torque, dt, g, m, l, timelimit } = self.config;

        let u = action[0].clamp(-max_torque, max_torque);
        let theta = state.theta;
        let theta_dot = state.theta_dot;

        let cost = angle_normalize(theta).powi(2)
            + 0.1 * theta_dot.powi(2)
            + 0.001 * u.powi(2);

        let theta_dot = (theta_dot + (3.0 * g / (2.0 * l) * theta.sin() + 3.0 / (m * l * l) * u) * dt)
            .clamp(-max_speed, max_speed);
        let next = PendulumState {
            theta: theta + theta_dot * dt,
            theta_dot,
            time: state.time + 1,
        };

        Ok(Step {
            observation: next.observation(),
            truncated: next.time >= timelimit,
            state: next,
            reward: -cost,
            terminated: false,
        })
    }

    fn action_space(&self) -> Vec<usize> {
        vec![1]
    }

    fn action_domain(&self) -> Vec<RangeInclusive<f64>> {
        vec![-self.config.max_torque..=self.config.max_torque]
    }

    fn observation_space(&self) -> Vec<usize> {
        vec![3]
    }
}
