mod evaluate;
mod experiment;
mod train;

pub use evaluate::{
    evaluate,
    Evaluation,
};
pub use experiment::{
    run_experiment,
    seed_keys,
    time_fit,
    train_seeds,
};
pub use train::train;
