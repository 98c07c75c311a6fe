//! Reinforcement learning environments
mod cartpole;
mod registry;

pub use cartpole::{CartPole, CartPoleConfig};
pub use registry::{
    is_registered, lookup_env, register_env, register_if_needed, resolve_env_creator, EnvSpec,
    NamedEnv,
};

use crate::Prng;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Environment observation vector.
///
/// Observations of a [`Space::Discrete`] space hold the element index as their only entry.
pub type Observation = Array1<f64>;

/// Arguments passed to environment constructors.
pub type EnvConfig = Map<String, Value>;

/// An action taken in an environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Action {
    Discrete(usize),
    Continuous(Array1<f64>),
}

/// An observation or action space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Space {
    /// Integers `0 .. n`.
    Discrete(usize),
    /// Real vectors bounded element-wise by `low` and `high`.
    Box {
        low: Array1<f64>,
        high: Array1<f64>,
    },
}

impl Space {
    /// Box space where every element has the same bounds.
    pub fn uniform_box(dim: usize, low: f64, high: f64) -> Self {
        Self::Box {
            low: Array1::from_elem(dim, low),
            high: Array1::from_elem(dim, high),
        }
    }

    /// Length of a flat vector encoding of one element (one-hot for discrete spaces).
    pub fn flat_dim(&self) -> usize {
        match self {
            Self::Discrete(n) => *n,
            Self::Box { low, .. } => low.len(),
        }
    }

    /// Whether the action is an element of this space.
    pub fn contains(&self, action: &Action) -> bool {
        match (self, action) {
            (Self::Discrete(n), Action::Discrete(a)) => a < n,
            (Self::Box { low, high }, Action::Continuous(x)) => {
                x.len() == low.len()
                    && x.iter()
                        .zip(low.iter().zip(high))
                        .all(|(v, (lo, hi))| lo <= v && v <= hi)
            }
            _ => false,
        }
    }

    /// Clip a continuous action into the box bounds. Other actions are returned unchanged.
    pub fn clip(&self, action: Action) -> Action {
        match (self, action) {
            (Self::Box { low, high }, Action::Continuous(mut x)) if x.len() == low.len() => {
                x.iter_mut()
                    .zip(low.iter().zip(high))
                    .for_each(|(v, (lo, hi))| *v = v.clamp(*lo, *hi));
                Action::Continuous(x)
            }
            (_, action) => action,
        }
    }
}

impl fmt::Display for Space {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Discrete(n) => write!(f, "Discrete({})", n),
            Self::Box { low, .. } => write!(f, "Box({})", low.len()),
        }
    }
}

/// Result of one environment step.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvStep {
    pub observation: Observation,
    pub reward: f64,
    /// Whether the episode has ended.
    pub done: bool,
}

/// A reinforcement learning environment.
///
/// Each instance simulates one episode at a time.
pub trait Environment: Send {
    fn observation_space(&self) -> Space;

    fn action_space(&self) -> Space;

    /// Start a new episode and return its initial observation.
    fn reset(&mut self, rng: &mut Prng) -> Observation;

    /// Apply an action to the current episode.
    ///
    /// Must not be called again after a step with `done` until [`Environment::reset`].
    fn step(&mut self, action: &Action, rng: &mut Prng) -> Result<EnvStep, EnvError>;
}

/// Environment constructor context.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvContext {
    /// User-supplied `env_config`.
    pub config: EnvConfig,
    /// Index of the evaluator constructing the environment (0 for the local evaluator).
    pub worker_index: usize,
}

impl EnvContext {
    pub const fn new(config: EnvConfig, worker_index: usize) -> Self {
        Self {
            config,
            worker_index,
        }
    }
}

/// Thread-safe environment constructor.
pub type EnvCreator =
    Arc<dyn Fn(&EnvContext) -> Result<Box<dyn Environment>, BuildEnvError> + Send + Sync>;

/// Error building an environment
#[derive(Debug, Error)]
pub enum BuildEnvError {
    #[error("unknown environment `{0}`")]
    UnknownEnv(String),
    #[error("no environment was specified")]
    NoEnvironment,
    #[error("invalid environment config: {0}")]
    InvalidConfig(#[from] serde_json::Error),
    #[error(transparent)]
    Boxed(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Error stepping an environment.
#[derive(Debug, Error)]
pub enum EnvError {
    #[error("action {action:?} is not in the action space {space}")]
    InvalidAction { action: Action, space: Space },
    #[error("step called on a finished episode")]
    EpisodeDone,
}

/// Build an environment from the built-in environment library.
pub fn make(name: &str, ctx: &EnvContext) -> Result<Box<dyn Environment>, BuildEnvError> {
    match name {
        "CartPole-v0" => Ok(Box::new(CartPole::from_config(200, &ctx.config)?)),
        "CartPole-v1" => Ok(Box::new(CartPole::from_config(500, &ctx.config)?)),
        _ => Err(BuildEnvError::UnknownEnv(name.to_string())),
    }
}
