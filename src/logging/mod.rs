//! Training result loggers
mod json;
mod tensorboard;

pub use json::JsonLogger;
pub use tensorboard::TensorBoardLogger;

use crate::config::Config;
use crate::trainable::TrainResult;
use chrono::Local;
use log::info;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable overriding the default results directory.
pub const RESULTS_DIR_ENV: &str = "RLAGENT_RESULTS_DIR";

/// Error writing training results.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("result log io error: {0}")]
    Io(#[from] io::Error),
    #[error("result serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Records the result of each training iteration.
pub trait ResultLogger: Send {
    fn log_result(&mut self, result: &TrainResult) -> Result<(), LogError>;

    fn flush(&mut self) -> Result<(), LogError> {
        Ok(())
    }
}

/// Logger that does nothing
impl ResultLogger for () {
    fn log_result(&mut self, _: &TrainResult) -> Result<(), LogError> {
        Ok(())
    }
}

/// Creates the result logger of an agent from its merged config.
///
/// Returns the logger and its log directory.
pub type LoggerCreator =
    Box<dyn FnOnce(&Config) -> Result<(Box<dyn ResultLogger>, PathBuf), LogError> + Send>;

/// Writes results to JSON lines and tensorboard in one directory.
#[derive(Debug)]
pub struct UnifiedLogger {
    json: JsonLogger,
    tensorboard: TensorBoardLogger,
}

impl UnifiedLogger {
    /// Create loggers under `logdir`, writing the config to `params.json`.
    pub fn new<P: AsRef<Path>>(config: &Config, logdir: P) -> Result<Self, LogError> {
        let logdir = logdir.as_ref();
        Ok(Self {
            json: JsonLogger::new(config, logdir)?,
            tensorboard: TensorBoardLogger::new(logdir),
        })
    }
}

impl ResultLogger for UnifiedLogger {
    fn log_result(&mut self, result: &TrainResult) -> Result<(), LogError> {
        self.json.log_result(result)?;
        self.tensorboard.log_result(result)
    }

    fn flush(&mut self) -> Result<(), LogError> {
        self.json.flush()?;
        self.tensorboard.flush()
    }
}

/// Root directory for agent results: `$RLAGENT_RESULTS_DIR` or `~/rlagent_results`.
pub fn default_results_dir() -> PathBuf {
    match env::var_os(RESULTS_DIR_ENV) {
        Some(dir) => PathBuf::from(dir),
        None => env::var_os("HOME")
            .map_or_else(env::temp_dir, PathBuf::from)
            .join("rlagent_results"),
    }
}

/// Logger creator writing to a fresh `<agent>_<env>_<timestamp><suffix>` directory.
pub fn default_logger_creator(agent_name: &str, env_name: &str) -> LoggerCreator {
    let prefix = format!(
        "{}_{}_{}",
        agent_name,
        env_name,
        Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    Box::new(
        move |config: &Config| -> Result<(Box<dyn ResultLogger>, PathBuf), LogError> {
            let results_dir = default_results_dir();
            fs::create_dir_all(&results_dir)?;
            let logdir = tempfile::Builder::new()
                .prefix(&prefix)
                .tempdir_in(&results_dir)?
                .into_path();
            info!("logging results to {}", logdir.display());
            let logger: Box<dyn ResultLogger> =
                Box::new(UnifiedLogger::new(config, &logdir)?);
            Ok((logger, logdir))
        },
    )
}
