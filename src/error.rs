//! Error type
use crate::checkpoint::CheckpointError;
use crate::config::ConfigError;
use crate::envs::BuildEnvError;
use crate::evaluation::{EvaluatorError, RemoteError};
use crate::logging::LogError;
use crate::optimizers::OptimizerError;
use thiserror::Error;

/// Error from an agent.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("invalid config: {0}")]
    Config(#[from] ConfigError),
    #[error("error building environment: {0}")]
    BuildEnv(#[from] BuildEnvError),
    #[error("evaluator error: {0}")]
    Evaluator(#[from] EvaluatorError),
    #[error("remote evaluator error: {0}")]
    Remote(#[from] RemoteError),
    #[error("optimizer error: {0}")]
    Optimizer(#[from] OptimizerError),
    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),
    #[error("result logger error: {0}")]
    Log(#[from] LogError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("`{0}` is not implemented by this agent")]
    NotImplemented(&'static str),
    #[error("the agent has been stopped")]
    Stopped,
    #[error("unknown algorithm `{0}`")]
    UnknownAlgorithm(String),
    /// Failure reported by an algorithm's own code.
    #[error("{0}")]
    Algorithm(String),
}
