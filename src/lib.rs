//! Reinforcement learning agents with distributed rollout workers.
#![warn(clippy::cast_lossless)]
#![warn(clippy::cast_possible_truncation)]
#![warn(clippy::doc_markdown)]
#![warn(clippy::explicit_iter_loop)]
#![warn(clippy::for_kv_map)] // part of warn(clippy::all), specifically style?
#![warn(clippy::missing_const_for_fn)] // has some false positives
#![warn(clippy::needless_borrow)]
#![warn(clippy::needless_pass_by_value)]
#![warn(clippy::redundant_closure_for_method_calls)]
#![warn(clippy::use_self)] // also triggered by macro expansions
pub mod agent;
pub mod agents;
pub mod checkpoint;
pub mod config;
pub mod envs;
mod error;
pub mod evaluation;
pub mod filters;
pub mod logging;
pub mod optimizers;
pub mod policy;
pub mod preprocessors;
pub mod sampler;
pub mod trainable;
pub mod utils;

pub use agent::{Agent, AgentBuilder, AgentCore, AgentState, Algorithm, ComputedAction, Resources};
pub use agents::{get_agent_class, AlgorithmKind, MockAlgorithm, PolicyGradient};
pub use config::Config;
pub use envs::{register_env, Action, EnvSpec, Environment, Observation, Space};
pub use error::AgentError;
pub use evaluation::{GlobalVars, PolicyEvaluator, RemoteEvaluator};
pub use trainable::{Trainable, TrainResult};

/// Pseudo-random number generator used by evaluators and environments.
pub type Prng = rand_chacha::ChaCha8Rng;
