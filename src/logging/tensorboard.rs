//! Tensorboard logger
use super::{LogError, ResultLogger};
use crate::trainable::TrainResult;
use serde_json::Value;
use std::fmt::{self, Write};
use std::path::Path;
use tensorboard_rs::summary_writer::SummaryWriter;

/// Tag prefix of result scalars.
const TAG_PREFIX: &str = "rlagent";

/// Logger that saves the numeric result fields to a tensorboard file.
///
/// Nested fields are tagged by their path, e.g. `rlagent/info/num_steps_sampled`.
/// Scalars are indexed by `timesteps_total`.
pub struct TensorBoardLogger {
    writer: SummaryWriter,
}

impl fmt::Debug for TensorBoardLogger {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("TensorBoardLogger").finish_non_exhaustive()
    }
}

impl TensorBoardLogger {
    pub fn new<P: AsRef<Path>>(log_dir: P) -> Self {
        Self {
            writer: SummaryWriter::new(log_dir),
        }
    }

    fn write_value(&mut self, tag: &mut String, value: &Value, step: usize) {
        match value {
            Value::Number(n) => {
                if let Some(x) = n.as_f64() {
                    #[allow(clippy::cast_possible_truncation)]
                    self.writer.add_scalar(tag, x as f32, step);
                }
            }
            Value::Bool(b) => self.writer.add_scalar(tag, if *b { 1.0 } else { 0.0 }, step),
            Value::Object(map) => {
                let len = tag.len();
                for (key, value) in map {
                    // Writing to a String cannot fail
                    let _ = write!(tag, "/{}", key);
                    self.write_value(tag, value, step);
                    tag.truncate(len);
                }
            }
            Value::Null | Value::String(_) | Value::Array(_) => {}
        }
    }
}

impl ResultLogger for TensorBoardLogger {
    fn log_result(&mut self, result: &TrainResult) -> Result<(), LogError> {
        let mut value = serde_json::to_value(result)?;
        if let Value::Object(fields) = &mut value {
            // The config is recorded in params.json
            fields.remove("config");
        }
        #[allow(clippy::cast_possible_truncation)]
        let step = result.timesteps_total as usize;
        // Persistent tag buffer avoids an allocation per scalar.
        let mut tag = String::from(TAG_PREFIX);
        self.write_value(&mut tag, &value, step);
        self.writer.flush();
        Ok(())
    }

    fn flush(&mut self) -> Result<(), LogError> {
        self.writer.flush();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn writes_event_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut logger = TensorBoardLogger::new(dir.path());
        let result = TrainResult {
            timesteps_total: 10,
            timesteps_this_iter: 10,
            ..TrainResult::default()
        };
        logger.log_result(&result).unwrap();
        // The event file is written by a background thread that finishes on drop
        drop(logger);
        let has_events = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .any(|entry| entry.file_name().to_string_lossy().contains("tfevents"));
        assert!(has_events);
    }
}
