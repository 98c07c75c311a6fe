use super::{LogError, ResultLogger};
use crate::config::Config;
use crate::trainable::TrainResult;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Appends each result as one JSON line to `result.json`.
#[derive(Debug)]
pub struct JsonLogger {
    writer: BufWriter<File>,
}

impl JsonLogger {
    /// Open `result.json` in `logdir` and write the config to `params.json`.
    pub fn new(config: &Config, logdir: &Path) -> Result<Self, LogError> {
        let params = BufWriter::new(File::create(logdir.join("params.json"))?);
        serde_json::to_writer_pretty(params, config)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(logdir.join("result.json"))?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

impl ResultLogger for JsonLogger {
    fn log_result(&mut self, result: &TrainResult) -> Result<(), LogError> {
        serde_json::to_writer(&mut self.writer, result)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), LogError> {
        Ok(self.writer.flush()?)
    }
}
