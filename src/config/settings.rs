use super::{Config, ConfigError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Typed view of the common agent configuration keys.
///
/// Extracted from a merged configuration; algorithm-specific keys are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSettings {
    pub monitor: bool,
    /// Skipped when null or empty.
    pub log_level: Option<String>,
    pub seed: Option<u64>,
    pub gamma: f64,
    pub horizon: Option<usize>,
    pub env_config: Config,
    pub env: Option<String>,
    pub clip_rewards: Option<bool>,
    pub clip_actions: bool,
    pub preprocessor_pref: String,
    pub num_workers: usize,
    pub num_gpus: f64,
    pub num_cpus_per_worker: f64,
    pub num_gpus_per_worker: f64,
    pub custom_resources_per_worker: BTreeMap<String, f64>,
    pub num_cpus_for_driver: f64,
    pub num_envs_per_worker: usize,
    pub sample_batch_size: usize,
    pub train_batch_size: usize,
    pub batch_mode: BatchMode,
    pub observation_filter: FilterKind,
    pub synchronize_filters: bool,
    pub tf_session_args: Config,
    pub local_evaluator_tf_session_args: Config,
    pub collect_metrics_timeout: u64,
    pub multiagent: MultiAgentSettings,
}

impl AgentSettings {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self::deserialize(serde_json::Value::Object(config.clone()))?)
    }
}

/// Data-valued part of the `multiagent` configuration.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiAgentSettings {
    /// Policies to train, or `None` for all policies.
    #[serde(default)]
    pub policies_to_train: Option<Vec<String>>,
}

/// How sample batches are cut from environment rollouts.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchMode {
    /// Stop each batch at exactly the requested number of steps.
    TruncateEpisodes,
    /// Extend each batch until every episode in it has finished.
    CompleteEpisodes,
}

/// Element-wise observation filter type.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterKind {
    NoFilter,
    MeanStdFilter,
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::NoFilter => write!(f, "NoFilter"),
            Self::MeanStdFilter => write!(f, "MeanStdFilter"),
        }
    }
}
