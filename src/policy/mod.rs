//! Policies
mod linear;

pub use linear::LinearPolicy;

use crate::config::Config;
use crate::envs::{Action, Observation, Space};
use crate::evaluation::{GlobalVars, Session};
use crate::sampler::SampleBatch;
use crate::Prng;
use ndarray::Array1;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Policy identifier.
pub type PolicyId = String;

/// Id of the policy used when an agent trains a single policy.
pub const DEFAULT_POLICY_ID: &str = "default";

/// Id under which the (single) environment agent is mapped to a policy.
pub const DEFAULT_AGENT_ID: &str = "agent0";

/// Flat policy parameter vector.
pub type Weights = Array1<f64>;

/// Named scalar statistics from a learning step.
pub type LearnerStats = BTreeMap<String, f64>;

/// Recurrent policy state.
pub type RnnState = Vec<Array1<f64>>;

/// Output of [`Policy::compute_single_action`].
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyOutput {
    pub action: Action,
    /// Recurrent state for the next step.
    pub state: RnnState,
    /// Additional named outputs, e.g. `logits`.
    pub extra: BTreeMap<String, Array1<f64>>,
}

/// A decision-making policy and its learning rule.
pub trait Policy: Send {
    /// Select an action for one observation.
    ///
    /// # Args
    /// * `observation` - Preprocessed and filtered observation.
    /// * `state` - Recurrent state from the previous step, or [`Policy::initial_state`].
    /// * `rng` - Random number generator for stochastic action selection.
    fn compute_single_action(
        &mut self,
        observation: &Observation,
        state: &[Array1<f64>],
        rng: &mut Prng,
    ) -> PolicyOutput;

    /// Recurrent state at the start of an episode. Empty for non-recurrent policies.
    fn initial_state(&self) -> RnnState {
        Vec::new()
    }

    /// Add learning targets to a single-episode trajectory fragment.
    fn postprocess_trajectory(&self, _batch: &mut SampleBatch) {}

    /// Update the policy parameters from a postprocessed batch.
    fn learn_on_batch(&mut self, batch: &SampleBatch) -> Result<LearnerStats, PolicyError>;

    fn get_weights(&self) -> Weights;

    fn set_weights(&mut self, weights: &Weights) -> Result<(), PolicyError>;

    /// State saved in checkpoints. Defaults to the weights.
    fn get_state(&self) -> Weights {
        self.get_weights()
    }

    fn set_state(&mut self, state: &Weights) -> Result<(), PolicyError> {
        self.set_weights(state)
    }

    /// Called when the driver pushes new global variables.
    fn on_global_var_update(&mut self, _global_vars: &GlobalVars) {}
}

/// Arguments for constructing a policy.
#[derive(Debug, Clone)]
pub struct PolicySpec<'a> {
    /// Length of preprocessed observations.
    pub observation_dim: usize,
    pub action_space: &'a Space,
    /// Agent configuration merged with any policy-specific overrides.
    pub config: &'a Config,
    /// Compute session of the owning evaluator, if any.
    pub session: Option<Session>,
}

/// Thread-safe policy constructor.
pub type PolicyFactory =
    Arc<dyn Fn(PolicySpec<'_>) -> Result<Box<dyn Policy>, PolicyError> + Send + Sync>;

/// Maps environment agent ids to policy ids.
pub type PolicyMappingFn = Arc<dyn Fn(&str) -> PolicyId + Send + Sync>;

/// A policy to instantiate in every evaluator.
#[derive(Clone)]
pub struct PolicyGraph {
    pub factory: PolicyFactory,
    /// Observation space; defaults to that of the environment.
    pub observation_space: Option<Space>,
    /// Action space; defaults to that of the environment.
    pub action_space: Option<Space>,
    /// Overrides merged into the agent configuration for this policy.
    pub config: Config,
}

impl PolicyGraph {
    /// A policy using the environment spaces and the agent configuration.
    pub fn new(factory: PolicyFactory) -> Self {
        Self {
            factory,
            observation_space: None,
            action_space: None,
            config: Config::new(),
        }
    }
}

impl fmt::Debug for PolicyGraph {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("PolicyGraph")
            .field("observation_space", &self.observation_space)
            .field("action_space", &self.action_space)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Policies by id.
pub type PolicyGraphs = BTreeMap<PolicyId, PolicyGraph>;

/// Error constructing or updating a policy.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("unsupported {kind} space {space}")]
    UnsupportedSpace { kind: &'static str, space: Space },
    #[error("expected {expected} weights, got {actual}")]
    WeightShape { expected: usize, actual: usize },
    #[error("invalid sample batch: {0}")]
    InvalidBatch(String),
    #[error("invalid policy config: {0}")]
    InvalidConfig(String),
}
