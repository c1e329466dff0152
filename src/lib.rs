pub mod logging;
pub mod error;

pub mod components;
pub mod configs;
pub mod envs;
pub mod agents;
pub mod engines;

pub mod cli;
