use thiserror::Error;

/// Domain failures of a training run.
///
/// Everything else (device errors, I/O, malformed config files) is passed
/// through as-is inside an [`anyhow::Error`].
#[derive(Debug, Error)]
pub enum TD3Error {
    #[error("either a training state or an rng key must be provided")]
    MissingStart,

    #[error("only one of training state and rng key may be provided")]
    AmbiguousStart,

    #[error("shape mismatch for {what}: expected {expected} values, got {actual}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("invalid config value for `{param}`: {message}")]
    InvalidConfig {
        param: &'static str,
        message: String,
    },

    #[error("cannot sample from an empty replay buffer")]
    EmptyBuffer,
}

impl TD3Error {
    pub fn check_len(
        what: &'static str,
        expected: usize,
        actual: usize,
    ) -> Result<(), Self> {
        if expected == actual {
            Ok(())
        } else {
            Err(Self::ShapeMismatch { what, expected, actual })
        }
    }
}
