mod networks;
mod td3;

pub use networks::{
    adam,
    clip_grad_norm,
    clipped_backward_step,
    mlp_dims,
    soft_update,
    Actor,
    Critic,
    ParamTree,
    TARGET_PREFIX,
};
pub use td3::{
    EvalCallback,
    Phase,
    TD3TrainState,
    TD3,
};

use {
    crate::{
        components::{
            PrngKey,
            ReplayBuffer,
        },
        engines::Evaluation,
    },
    anyhow::Result,
};


/// The execution mode of an agent is either training or testing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunMode {
    Train,
    Test,
}

/// A training algorithm in functional style.
///
/// The algorithm value is immutable and can be shared between runs; all the
/// state of a run lives in [`Algorithm::TrainState`], which is moved through
/// every call to [`Algorithm::train_iteration`].
pub trait Algorithm {
    type Config;
    type TrainState: TrainState;

    fn config(&self) -> &Self::Config;

    fn initialize(
        &self,
        key: PrngKey,
    ) -> Result<Self::TrainState>;

    fn train_iteration(
        &self,
        ts: Self::TrainState,
    ) -> Result<Self::TrainState>;

    fn evaluate(
        &self,
        ts: &Self::TrainState,
        key: PrngKey,
    ) -> Result<Evaluation>;
}

pub trait TrainState {
    fn rng(&self) -> PrngKey;
    fn global_step(&self) -> usize;
}

pub trait OffPolicyTrainState: TrainState {
    fn replay_buffer(&self) -> &ReplayBuffer;
}
