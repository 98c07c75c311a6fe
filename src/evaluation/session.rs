use crate::config::{Config, ConfigError};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Compute session options, read from the `tf_session_args` configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionArgs {
    /// Threads used within a single operation. Zero lets the session choose.
    pub intra_op_parallelism_threads: usize,
    /// Threads used to run independent operations.
    pub inter_op_parallelism_threads: usize,
    pub log_device_placement: bool,
    pub allow_soft_placement: bool,
    /// Maximum number of devices of each type.
    pub device_count: BTreeMap<String, u32>,
    /// Options without a typed field, e.g. `gpu_options`.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SessionArgs {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self::deserialize(Value::Object(config.clone()))?)
    }
}

/// Compute session shared by the policies of one evaluator.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    args: SessionArgs,
}

impl Session {
    pub const fn new(args: SessionArgs) -> Self {
        Self { args }
    }

    pub const fn args(&self) -> &SessionArgs {
        &self.args
    }

    /// Number of threads policies should use for a single computation.
    pub fn num_threads(&self) -> usize {
        self.args.intra_op_parallelism_threads.max(1)
    }
}

/// Thread-safe session constructor.
pub type SessionCreator = Arc<dyn Fn() -> Session + Send + Sync>;

/// Session constructor for the given session arguments.
///
/// Empty arguments mean the evaluator runs without a session.
pub fn session_creator(session_args: &Config) -> Result<Option<SessionCreator>, ConfigError> {
    if session_args.is_empty() {
        return Ok(None);
    }
    let args = SessionArgs::from_config(session_args)?;
    Ok(Some(Arc::new(move || {
        debug!("creating compute session {:?}", args);
        Session::new(args.clone())
    })))
}
