//! Observation preprocessors
use crate::config::ConfigError;
use crate::envs::{Observation, Space};
use ndarray::Array1;

/// Converts raw environment observations into flat policy inputs.
#[derive(Debug, Clone, PartialEq)]
pub enum Preprocessor {
    /// Box observations are passed through.
    Identity { dim: usize },
    /// Discrete observations are one-hot encoded.
    OneHot { size: usize },
}

impl Preprocessor {
    /// Preprocessor for observations from the given space.
    ///
    /// `preference` selects the preprocessor family; `deepmind` and `rllib` currently share
    /// the same flat encodings.
    pub fn for_space(space: &Space, preference: &str) -> Result<Self, ConfigError> {
        if !matches!(preference, "deepmind" | "rllib") {
            return Err(ConfigError::UnknownPreprocessorPref(preference.to_string()));
        }
        Ok(match space {
            Space::Discrete(size) => Self::OneHot { size: *size },
            Space::Box { low, .. } => Self::Identity { dim: low.len() },
        })
    }

    /// Length of the raw observation.
    pub const fn input_dim(&self) -> usize {
        match self {
            Self::Identity { dim } => *dim,
            Self::OneHot { .. } => 1,
        }
    }

    /// Length of the preprocessed observation.
    pub const fn output_dim(&self) -> usize {
        match self {
            Self::Identity { dim } => *dim,
            Self::OneHot { size } => *size,
        }
    }

    pub fn transform(&self, observation: &Observation) -> Observation {
        match self {
            Self::Identity { .. } => observation.clone(),
            Self::OneHot { size } => {
                let mut encoded = Array1::zeros(*size);
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let index = observation.first().map(|v| *v as usize);
                if let Some(index) = index {
                    if index < *size {
                        encoded[index] = 1.0;
                    }
                }
                encoded
            }
        }
    }
}
