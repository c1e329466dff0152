use {
    super::{
        networks::{
            adam,
            clipped_backward_step,
            mlp_dims,
            Actor,
            Critic,
        },
        Algorithm,
        OffPolicyTrainState,
        RunMode,
        TrainState,
    },
    crate::{
        components::{
            noise::{
                clipped_gaussian,
                gaussian,
            },
            BatchTensors,
            PrngKey,
            ReplayBuffer,
            RunningMeanStd,
            Transition,
        },
        configs::TD3_Config,
        engines::{
            evaluate,
            Evaluation,
        },
        envs::{
            clip_action,
            sample_action,
            Environment,
        },
        error::TD3Error,
    },
    anyhow::Result,
    candle_core::{
        Device,
        Tensor,
    },
    candle_nn::AdamW,
    std::{
        fmt::{
            self,
            Debug,
        },
        ops::RangeInclusive,
    },
    tracing::{
        debug,
        info,
    },
};


/// Evaluates the current policy of a training state.
///
/// The callback must not change the training state; it gets its own key.
pub type EvalCallback<Env> = fn(
    &TD3<Env>,
    &TD3TrainState<<Env as Environment>::State>,
    PrngKey,
) -> Result<Evaluation>;


/// The two phases of a training run.
///
/// While the buffer is filling, actions are sampled uniformly and nothing is
/// learned. Afterwards actions come from the policy and every iteration
/// updates the networks.
#[doc = simple_mermaid::mermaid!("td3.mmd")]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Warmup,
    Learning,
}

impl Phase {
    /// The phase of the iteration that starts at `global_step`.
    pub fn of(
        global_step: usize,
        fill_buffer: usize,
    ) -> Self {
        if global_step > fill_buffer {
            Phase::Learning
        } else {
            Phase::Warmup
        }
    }
}


/// The complete state of a TD3 training run.
///
/// It owns the networks (online and target parameters), the optimizer
/// moments, the replay buffer, the environment state and the key from which
/// every later random draw is split.
pub struct TD3TrainState<S> {
    actor: Actor,
    actor_optim: AdamW,
    critic: Critic,
    critic_optim: AdamW,
    replay_buffer: ReplayBuffer,
    env_state: S,
    last_obs: Vec<f64>,
    global_step: usize,
    obs_stats: Option<RunningMeanStd>,
    rng: PrngKey,
}

impl<S> TD3TrainState<S> {
    /// Advance the state's key and return a fresh one.
    fn split_rng(&mut self) -> PrngKey {
        let (rng, key) = self.rng.split();
        self.rng = rng;
        key
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn critic(&self) -> &Critic {
        &self.critic
    }

    pub fn env_state(&self) -> &S {
        &self.env_state
    }

    pub fn last_obs(&self) -> &[f64] {
        &self.last_obs
    }

    pub fn obs_stats(&self) -> Option<&RunningMeanStd> {
        self.obs_stats.as_ref()
    }

    /// The observation as the networks see it.
    pub fn normalize(
        &self,
        obs: &[f64],
    ) -> Vec<f64> {
        match &self.obs_stats {
            Some(stats) => stats.normalize(obs),
            None => obs.to_vec(),
        }
    }
}

impl<S: Debug> Debug for TD3TrainState<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TD3TrainState")
            .field("global_step", &self.global_step)
            .field("rng", &self.rng)
            .field("buffered", &self.replay_buffer.len())
            .field("env_state", &self.env_state)
            .field("last_obs", &self.last_obs)
            .finish_non_exhaustive()
    }
}

impl<S> TrainState for TD3TrainState<S> {
    fn rng(&self) -> PrngKey {
        self.rng
    }

    fn global_step(&self) -> usize {
        self.global_step
    }
}

impl<S> OffPolicyTrainState for TD3TrainState<S> {
    fn replay_buffer(&self) -> &ReplayBuffer {
        &self.replay_buffer
    }
}


/// Twin Delayed Deep Deterministic policy gradient.
///
/// TD3 extends DDPG with three changes against Q-value overestimation:
///
/// * Clipped double Q-learning: two critics are learned and the smaller of
///   their target values forms the bootstrap target.
/// * Delayed policy updates: the actor is updated less often than the critic.
/// * Target policy smoothing: clipped noise is added to the target action.
///
/// The algorithm value holds only immutable things (config, environment,
/// device), so one value can drive many independent runs at once.
#[allow(clippy::upper_case_acronyms)]
pub struct TD3<Env: Environment> {
    config: TD3_Config,
    env: Box<Env>,
    device: Device,
    obs_dim: usize,
    action_dim: usize,
    action_domain: Vec<RangeInclusive<f64>>,
    action_low: Tensor,
    action_high: Tensor,
    eval_callback: EvalCallback<Env>,
}

impl<Env: Environment> TD3<Env> {
    pub fn new(
        config: TD3_Config,
        env: Box<Env>,
        device: &Device,
    ) -> Result<Self> {
        config.validate()?;

        let obs_dim = env.observation_space().iter().product::<usize>();
        let action_dim = env.action_space().iter().product::<usize>();
        let action_domain = env.action_domain();
        TD3Error::check_len("action domain", action_dim, action_domain.len())?;

        let low: Vec<f64> = action_domain.iter().map(|r| *r.start()).collect();
        let high: Vec<f64> = action_domain.iter().map(|r| *r.end()).collect();

        Ok(Self {
            action_low: Tensor::from_slice(&low, action_dim, device)?,
            action_high: Tensor::from_slice(&high, action_dim, device)?,
            config,
            env,
            device: device.clone(),
            obs_dim,
            action_dim,
            action_domain,
            eval_callback: evaluate::<Env>,
        })
    }

    /// Replace the default evaluation.
    pub fn with_eval_callback(
        mut self,
        eval_callback: EvalCallback<Env>,
    ) -> Self {
        self.eval_callback = eval_callback;
        self
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn obs_dim(&self) -> usize {
        self.obs_dim
    }

    pub fn action_dim(&self) -> usize {
        self.action_dim
    }

    pub fn action_domain(&self) -> &[RangeInclusive<f64>] {
        &self.action_domain
    }

    /// The policy action for a raw observation.
    ///
    /// In [`RunMode::Train`] Gaussian exploration noise drawn from `key` is
    /// added; the result is always clipped to the action domain.
    pub fn actions(
        &self,
        ts: &TD3TrainState<Env::State>,
        obs: &[f64],
        mode: RunMode,
        key: PrngKey,
    ) -> Result<Vec<f64>> {
        let action = ts.actor.act(&ts.normalize(obs))?;
        let action = match mode {
            RunMode::Train => action
                .iter()
                .zip(gaussian(key, self.action_dim, self.config.exploration_noise))
                .map(|(a, n)| a + n)
                .collect(),
            RunMode::Test => action,
        };
        Ok(clip_action(&action, &self.action_domain))
    }

    /// One gradient step on both critics towards the clipped double-Q target.
    /// Returns the summed loss.
    pub fn update_q(
        &self,
        ts: &mut TD3TrainState<Env::State>,
        batch: &BatchTensors,
        key: PrngKey,
    ) -> Result<f64> {
        let batch_size = batch.reward.dim(0)?;

        let noise = clipped_gaussian(
            key,
            batch_size * self.action_dim,
            self.config.target_noise,
            self.config.target_noise_clip,
        );
        let noise = Tensor::from_vec(noise, (batch_size, self.action_dim), &self.device)?;
        let target_action = (ts.actor.target_forward(&batch.next_obs)? + noise)?
            .broadcast_maximum(&self.action_low)?
            .broadcast_minimum(&self.action_high)?;

        let (target_q1, target_q2) = ts.critic.target_forward(&batch.next_obs, &target_action)?;
        let not_done = batch.done.affine(-1.0, 1.0)?;
        let target = (&batch.reward + ((not_done * self.config.gamma)? * target_q1.minimum(&target_q2)?)?)?
            .detach()?;

        let (q1, q2) = ts.critic.forward(&batch.obs, &batch.action)?;
        let loss = ((q1 - &target)?.sqr()?.mean_all()? + (q2 - &target)?.sqr()?.mean_all()?)?;

        let vars = ts.critic.vars()?;
        let norm = clipped_backward_step(&mut ts.critic_optim, &vars, &loss, self.config.max_grad_norm)?;
        let loss = loss.to_scalar::<f64>()?;
        debug!("critic loss {loss:.5}, grad norm {norm:.5}");
        Ok(loss)
    }

    /// One gradient step on the actor, maximizing the first critic's value of
    /// its own actions. Returns the loss.
    pub fn update_pi(
        &self,
        ts: &mut TD3TrainState<Env::State>,
        batch: &BatchTensors,
    ) -> Result<f64> {
        let (q1, _) = ts.critic.forward(&batch.obs, &ts.actor.forward(&batch.obs)?)?;
        let loss = q1.mean_all()?.neg()?;

        let vars = ts.actor.vars()?;
        let norm = clipped_backward_step(&mut ts.actor_optim, &vars, &loss, self.config.max_grad_norm)?;
        let loss = loss.to_scalar::<f64>()?;
        debug!("actor loss {loss:.5}, grad norm {norm:.5}");
        Ok(loss)
    }

    /// Blend the online parameters of both networks into their targets.
    pub fn sync_targets(
        &self,
        ts: &TD3TrainState<Env::State>,
    ) -> Result<()> {
        ts.actor.track(self.config.tau)?;
        ts.critic.track(self.config.tau)?;
        Ok(())
    }
}

impl<Env: Environment> Algorithm for TD3<Env> {
    type Config = TD3_Config;
    type TrainState = TD3TrainState<Env::State>;

    fn config(&self) -> &Self::Config {
        &self.config
    }

    fn initialize(
        &self,
        key: PrngKey,
    ) -> Result<Self::TrainState> {
        let [key_critic, key_actor, key_reset, rng] = key.split_n();
        let TD3_Config { hidden_1_size, hidden_2_size, .. } = self.config;

        let critic = Critic::new(
            key_critic,
            &self.device,
            &mlp_dims(self.obs_dim + self.action_dim, hidden_1_size, hidden_2_size, 1),
        )?;
        let actor = Actor::new(
            key_actor,
            &self.device,
            &mlp_dims(self.obs_dim, hidden_1_size, hidden_2_size, self.action_dim),
            &self.action_domain,
        )?;
        let actor_optim = adam(actor.vars()?, self.config.learning_rate)?;
        let critic_optim = adam(critic.vars()?, self.config.learning_rate)?;

        let (last_obs, env_state) = self.env.reset(key_reset)?;
        TD3Error::check_len("observation", self.obs_dim, last_obs.len())?;

        let obs_stats = self.config.normalize_observations.then(|| {
            let mut stats = RunningMeanStd::new(self.obs_dim);
            stats.update(&last_obs);
            stats
        });

        info!(
            "initialized TD3 with observation size {}, action size {}",
            self.obs_dim, self.action_dim,
        );

        Ok(TD3TrainState {
            actor,
            actor_optim,
            critic,
            critic_optim,
            replay_buffer: ReplayBuffer::empty(self.config.buffer_size, self.obs_dim, self.action_dim),
            env_state,
            last_obs,
            global_step: 0,
            obs_stats,
            rng,
        })
    }

    fn train_iteration(
        &self,
        mut ts: Self::TrainState,
    ) -> Result<Self::TrainState> {
        let phase = Phase::of(ts.global_step, self.config.fill_buffer);
        let [key_uniform, key_noise, key_step, key_sample, key_smoothing] = ts.split_rng().split_n();

        if phase == Phase::Learning && ts.global_step == self.config.fill_buffer + 1 {
            info!("buffer filled after {} steps, learning starts", ts.global_step);
        }

        let action = match phase {
            Phase::Warmup => sample_action(key_uniform, &self.action_domain),
            Phase::Learning => self.actions(&ts, &ts.last_obs, RunMode::Train, key_noise)?,
        };
        TD3Error::check_len("action", self.action_dim, action.len())?;

        let step = self.env.step(key_step, &ts.env_state, &action)?;
        TD3Error::check_len("observation", self.obs_dim, step.observation.len())?;
        debug!(
            "step {}: action {:?}, reward {:.4}, done {}",
            ts.global_step, action, step.reward, step.done(),
        );

        ts.replay_buffer = ts.replay_buffer.append(&Transition {
            obs: ts.last_obs,
            action,
            reward: step.reward,
            next_obs: step.observation.clone(),
            done: step.done(),
        });
        if let Some(stats) = ts.obs_stats.as_mut() {
            stats.update(&step.observation);
        }
        ts.last_obs = step.observation;
        ts.env_state = step.state;
        ts.global_step += 1;

        if phase == Phase::Learning {
            let minibatch = ts.replay_buffer.sample(self.config.batch_size, key_sample)?;
            let minibatch = match &ts.obs_stats {
                Some(stats) => minibatch.map_observations(|obs| stats.normalize(obs)),
                None => minibatch,
            };
            let batch = minibatch.tensors(&self.device)?;

            self.update_q(&mut ts, &batch, key_smoothing)?;
            if (ts.global_step + 1) % self.config.policy_delay == 0 {
                self.update_pi(&mut ts, &batch)?;
            }
        }

        self.sync_targets(&ts)?;
        Ok(ts)
    }

    fn evaluate(
        &self,
        ts: &Self::TrainState,
        key: PrngKey,
    ) -> Result<Evaluation> {
        (self.eval_callback)(self, ts, key)
    }
}
