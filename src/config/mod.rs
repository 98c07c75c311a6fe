//! Agent configuration
//!
//! A configuration is a JSON object mapping option names to values or nested option objects.
//! Algorithms declare a default configuration (usually via [`with_common_config`])
//! and user-supplied overrides are merged into it with [`deep_update`].
mod common;
mod settings;

pub use common::{common_config, with_common_config};
pub use settings::{AgentSettings, BatchMode, FilterKind, MultiAgentSettings};

use log::LevelFilter;
use serde_json::{Map, Value};
use thiserror::Error;

/// Nested option name to value mapping.
pub type Config = Map<String, Value>;

/// Sub-trees of the configuration whose keys are not checked against the defaults.
pub const DEFAULT_ALLOW_UNKNOWN_SUBKEYS: &[&str] = &[
    "tf_session_args",
    "env_config",
    "model",
    "optimizer",
    "multiagent",
];

/// Error validating or merging a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("the `{key}` config is deprecated, please use `{replacement}` instead")]
    Deprecated {
        key: &'static str,
        replacement: &'static str,
    },
    #[error("unknown config parameter `{0}`")]
    UnknownKey(String),
    #[error("invalid config: {0}")]
    Invalid(#[from] serde_json::Error),
    #[error("invalid log level `{0}`")]
    InvalidLogLevel(String),
    #[error("unknown preprocessor preference `{0}`, expected `deepmind` or `rllib`")]
    UnknownPreprocessorPref(String),
}

/// Deprecated top-level keys and the options that replace them.
const DEPRECATED_KEYS: &[(&str, &str)] = &[
    ("gpu", "num_gpus=0|1"),
    ("gpu_fraction", "num_gpus=<fraction>"),
    ("use_gpu_for_workers", "num_gpus_per_worker=1"),
];

/// Reject configurations that use deprecated keys.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    for &(key, replacement) in DEPRECATED_KEYS {
        if config.contains_key(key) {
            return Err(ConfigError::Deprecated { key, replacement });
        }
    }
    Ok(())
}

/// Recursively update `original` with the entries of `new`.
///
/// # Args
/// * `original` - The configuration to update in place.
/// * `new` - Entries to write into `original`.
/// * `new_keys_allowed` - Whether keys absent from `original` may be added.
/// * `allow_unknown_subkeys` - Top-level keys whose nested objects accept new keys
///     regardless of `new_keys_allowed`.
///
/// Nested objects are merged key by key; any other value (including an object replacing a
/// non-object or vice versa) replaces the original value.
pub fn deep_update(
    original: &mut Config,
    new: &Config,
    new_keys_allowed: bool,
    allow_unknown_subkeys: &[&str],
) -> Result<(), ConfigError> {
    deep_update_at(original, new, new_keys_allowed, allow_unknown_subkeys, "")
}

fn deep_update_at(
    original: &mut Config,
    new: &Config,
    new_keys_allowed: bool,
    allow_unknown_subkeys: &[&str],
    prefix: &str,
) -> Result<(), ConfigError> {
    for (key, value) in new {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match original.get_mut(key) {
            Some(original_value) => match (original_value, value) {
                (Value::Object(original_sub), Value::Object(new_sub)) => {
                    let sub_allowed =
                        new_keys_allowed || allow_unknown_subkeys.contains(&key.as_str());
                    // The allow list names top-level sub-trees only
                    deep_update_at(original_sub, new_sub, sub_allowed, &[], &path)?;
                }
                (original_value, _) => *original_value = value.clone(),
            },
            None if new_keys_allowed => {
                original.insert(key.clone(), value.clone());
            }
            None => return Err(ConfigError::UnknownKey(path)),
        }
    }
    Ok(())
}

/// A copy of `base` deep-updated with `overrides`, allowing new keys anywhere.
pub fn merge_dicts(base: &Config, overrides: &Config) -> Config {
    let mut merged = base.clone();
    deep_update(&mut merged, overrides, true, &[])
        .expect("deep update with new keys allowed is infallible");
    merged
}

/// Parse a config `log_level` value into a log filter.
///
/// Accepts the usual level names in any case, including `WARNING` and `CRITICAL`.
pub fn parse_log_level(level: &str) -> Result<LevelFilter, ConfigError> {
    match level.to_ascii_uppercase().as_str() {
        "OFF" => Ok(LevelFilter::Off),
        "CRITICAL" | "ERROR" => Ok(LevelFilter::Error),
        "WARNING" | "WARN" => Ok(LevelFilter::Warn),
        "INFO" => Ok(LevelFilter::Info),
        "DEBUG" => Ok(LevelFilter::Debug),
        "TRACE" => Ok(LevelFilter::Trace),
        _ => Err(ConfigError::InvalidLogLevel(level.to_string())),
    }
}

/// Convert a `json!` object literal into a [`Config`].
///
/// # Panics
/// If the value is not a JSON object.
pub fn config_from_json(value: Value) -> Config {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {}", other),
    }
}
