use {
    super::AlgorithmConfig,
    crate::error::TD3Error,
    serde::{
        Deserialize,
        Serialize,
    },
};


/// Hyperparameters of a TD3 training run.
///
/// Deserializing rejects unknown keys and fills missing keys from
/// [`TD3_Config::default`].
///
/// # Example
/// ```
/// use td3_rl::configs::TD3_Config;
///
/// let config: TD3_Config = ron::from_str("(policy_delay: 3, batch_size: 32)").unwrap();
/// assert_eq!(config.policy_delay, 3);
/// assert_eq!(config.gamma, TD3_Config::default().gamma);
/// assert!(config.validate().is_ok());
///
/// assert!(ron::from_str::<TD3_Config>("(learning_rat: 0.1)").is_err());
/// ```
#[allow(non_camel_case_types)]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct TD3_Config {
    // The discount factor of future rewards.
    pub gamma: f64,
    // The weight of the old target parameters in the target network update.
    pub tau: f64,
    // Gradients are rescaled to at most this global norm before each step.
    pub max_grad_norm: f64,
    // The learning rate for both the Actor and Critic optimizers.
    pub learning_rate: f64,
    // Standard deviation of the Gaussian noise added to the policy actions.
    pub exploration_noise: f64,
    // Standard deviation and clip bound of the target policy smoothing noise.
    pub target_noise: f64,
    pub target_noise_clip: f64,
    // The Actor and the target networks are updated once every `policy_delay` critic updates.
    pub policy_delay: usize,
    // The total number of environment steps, and the number of steps between evaluations.
    pub total_timesteps: usize,
    pub eval_freq: usize,
    // The capacity of the replay buffer, and the number of random steps before learning starts.
    pub buffer_size: usize,
    pub fill_buffer: usize,
    // The training batch size for each update.
    pub batch_size: usize,
    pub normalize_observations: bool,
    pub skip_initial_evaluation: bool,
    // The number of neurons in the hidden layers of the Actor and Critic networks.
    pub hidden_1_size: usize,
    pub hidden_2_size: usize,
    // Each evaluation runs `eval_episodes` episodes of at most `eval_max_steps` steps.
    pub eval_episodes: usize,
    pub eval_max_steps: usize,
}
impl Default for TD3_Config {
    fn default() -> Self {
        Self {
            gamma: 0.99,
            tau: 0.995,
            max_grad_norm: 10.0,
            learning_rate: 0.0003,
            exploration_noise: 0.1,
            target_noise: 0.2,
            target_noise_clip: 0.5,
            policy_delay: 2,
            total_timesteps: 50_000,
            eval_freq: 5_000,
            buffer_size: 100_000,
            fill_buffer: 1_000,
            batch_size: 100,
            normalize_observations: false,
            skip_initial_evaluation: false,
            hidden_1_size: 64,
            hidden_2_size: 64,
            eval_episodes: 10,
            eval_max_steps: 200,
        }
    }
}
impl TD3_Config {
    /// Settings that solve the pendulum swing-up in a few thousand steps.
    pub fn pendulum() -> Self {
        Self {
            learning_rate: 0.001,
            total_timesteps: 20_000,
            eval_freq: 2_000,
            buffer_size: 20_000,
            batch_size: 128,
            hidden_1_size: 256,
            hidden_2_size: 256,
            eval_episodes: 5,
            eval_max_steps: 200,
            ..Default::default()
        }
    }

    pub fn pointenv() -> Self {
        Self {
            gamma: 0.95,
            total_timesteps: 10_000,
            eval_freq: 1_000,
            buffer_size: 10_000,
            fill_buffer: 500,
            batch_size: 64,
            normalize_observations: true,
            eval_episodes: 20,
            eval_max_steps: 30,
            ..Default::default()
        }
    }

    /// Reject values that would make a run ill-defined.
    #[allow(clippy::neg_cmp_op_on_partial_ord)]
    pub fn validate(&self) -> Result<(), TD3Error> {
        let invalid = |param, message: &str| Err(TD3Error::InvalidConfig {
            param,
            message: message.to_owned(),
        });

        if !(0.0..=1.0).contains(&self.gamma) {
            return invalid("gamma", "must be in [0, 1]");
        }
        if !(0.0..=1.0).contains(&self.tau) {
            return invalid("tau", "must be in [0, 1]");
        }
        if !(self.max_grad_norm > 0.0) {
            return invalid("max_grad_norm", "must be positive");
        }
        if !(self.learning_rate > 0.0) {
            return invalid("learning_rate", "must be positive");
        }
        if !(self.exploration_noise >= 0.0) {
            return invalid("exploration_noise", "must be non-negative");
        }
        if !(self.target_noise >= 0.0) {
            return invalid("target_noise", "must be non-negative");
        }
        if !(self.target_noise_clip >= 0.0) {
            return invalid("target_noise_clip", "must be non-negative");
        }
        if self.policy_delay == 0 {
            return invalid("policy_delay", "must be at least 1");
        }
        if self.eval_freq == 0 {
            return invalid("eval_freq", "must be at least 1");
        }
        if self.buffer_size == 0 {
            return invalid("buffer_size", "must be at least 1");
        }
        if self.batch_size == 0 {
            return invalid("batch_size", "must be at least 1");
        }
        if self.hidden_1_size == 0 || self.hidden_2_size == 0 {
            return invalid("hidden_1_size", "hidden layers must have at least 1 neuron");
        }
        Ok(())
    }
}

impl AlgorithmConfig for TD3_Config {
    fn total_timesteps(&self) -> usize {
        self.total_timesteps
    }

    fn eval_freq(&self) -> usize {
        self.eval_freq
    }

    fn skip_initial_evaluation(&self) -> bool {
        self.skip_initial_evaluation
    }
}
