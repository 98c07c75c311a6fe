//! Policy optimizers
//!
//! An optimizer owns the evaluators of an agent and implements one training step over them.
mod sync_samples;

pub use sync_samples::SyncSamplesOptimizer;

use crate::evaluation::{
    collect_episodes, EpisodeSummary, EvaluatorError, PolicyEvaluator, RemoteError,
    RemoteEvaluator,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;

/// The local evaluator and the remote evaluator handles of an agent.
pub struct Evaluators {
    pub local: PolicyEvaluator,
    pub remotes: Vec<RemoteEvaluator>,
}

impl Evaluators {
    pub fn new(local: PolicyEvaluator, remotes: Vec<RemoteEvaluator>) -> Self {
        Self { local, remotes }
    }

    /// Terminate the remote evaluators and wait for their threads to exit.
    pub fn terminate_remotes(&mut self) {
        for remote in &self.remotes {
            remote.terminate();
        }
        self.remotes.clear();
    }
}

/// Serializable optimizer progress.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizerState {
    pub num_steps_trained: u64,
    pub num_steps_sampled: u64,
}

/// Error performing an optimization step.
#[derive(Debug, Error)]
pub enum OptimizerError {
    #[error(transparent)]
    Evaluator(#[from] EvaluatorError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

/// Improves the policies of a set of evaluators.
pub trait PolicyOptimizer: Send {
    /// Run one round of sampling and learning.
    fn step(&mut self) -> Result<(), OptimizerError>;

    /// Total environment steps sampled.
    fn num_steps_sampled(&self) -> u64;

    /// Total environment steps learned on.
    fn num_steps_trained(&self) -> u64;

    fn evaluators(&self) -> &Evaluators;

    fn evaluators_mut(&mut self) -> &mut Evaluators;

    /// Optimizer-specific statistics for the result `info` field.
    fn stats(&self) -> Map<String, Value> {
        let mut stats = Map::new();
        stats.insert("num_steps_sampled".into(), self.num_steps_sampled().into());
        stats.insert("num_steps_trained".into(), self.num_steps_trained().into());
        stats
    }

    /// Summarize the episodes completed by every evaluator since the last call.
    ///
    /// Remote evaluators that do not reply within `timeout` are left out.
    fn collect_metrics(&mut self, timeout: Duration) -> Result<EpisodeSummary, OptimizerError> {
        let evaluators = self.evaluators_mut();
        let episodes = collect_episodes(&mut evaluators.local, &evaluators.remotes, timeout)?;
        Ok(EpisodeSummary::from_metrics(&episodes))
    }

    /// Release optimizer resources. The evaluators are terminated separately.
    fn stop(&mut self) {}

    fn save(&self) -> OptimizerState;

    fn restore(&mut self, state: &OptimizerState);
}
