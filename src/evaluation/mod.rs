//! Policy evaluators
//!
//! An evaluator hosts policies and the environments they collect experience from.
//! Each agent owns one local [`PolicyEvaluator`] and any number of [`RemoteEvaluator`] handles.
mod evaluator;
mod filter_manager;
mod metrics;
mod remote;
mod session;

pub use evaluator::{EvaluatorConfig, EvaluatorError, EvaluatorState, PolicyEvaluator, WeightsMap};
pub use filter_manager::FilterManager;
pub use metrics::{collect_episodes, EpisodeSummary};
pub use remote::{Pending, RemoteArgs, RemoteError, RemoteEvaluator};
pub use session::{session_creator, Session, SessionArgs, SessionCreator};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Variables broadcast from the driver to every evaluator once per training iteration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalVars {
    /// Total number of environment steps sampled so far.
    pub timestep: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GlobalVars {
    pub fn new(timestep: u64) -> Self {
        Self {
            timestep,
            extra: Map::new(),
        }
    }
}
