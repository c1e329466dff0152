//! # Components
//!
//! This module contains the components that an agent is built from.
//!
//! ## PRNG keys
//!
//! Every random decision during training draws from a [`PrngKey`] that is
//! split off explicitly, so runs are reproducible bit for bit.
//!
//! ## Noise
//!
//! The [`noise`] functions produce the Gaussian exploration noise and the
//! clipped target policy smoothing noise of [`crate::agents::TD3`].
//!
//! ## Replay Buffer
//!
//! The [`ReplayBuffer`] struct implements a fixed-capacity circular store of
//! [`Transition`]s, sampled uniformly with replacement into [`Minibatch`]es.
//!
//! ## Observation statistics
//!
//! [`RunningMeanStd`] tracks per-dimension running moments used to normalize
//! observations.

mod prng;
mod replay_buffer;
mod running_stats;

pub mod noise;
pub use prng::PrngKey;
pub use replay_buffer::{
    BatchTensors,
    Minibatch,
    ReplayBuffer,
    Transition,
};
pub use running_stats::RunningMeanStd;
