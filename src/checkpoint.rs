//! Checkpoint files
use serde::{de::DeserializeOwned, Serialize};
use std::ffi::OsString;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Serialize to a checkpoint file or load from one.
pub trait SaveLoad {
    /// Serialize to a file, replacing any existing file at `path`.
    fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), CheckpointError>;

    /// Load from a file created by [`SaveLoad::save_to`].
    fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, CheckpointError>
    where
        Self: Sized;
}

/// Error reading or writing a checkpoint.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("checkpoint (de)serialization error: {0}")]
    Serialize(#[from] serde_cbor::Error),
}

impl<T: Serialize + DeserializeOwned> SaveLoad for T {
    fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), CheckpointError> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_cbor::to_writer(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, CheckpointError>
    where
        Self: Sized,
    {
        let reader = BufReader::new(File::open(path)?);
        let this = serde_cbor::from_reader(reader)?;
        Ok(this)
    }
}

/// Path of the checkpoint written at the given training iteration.
pub fn checkpoint_path<P: AsRef<Path>>(checkpoint_dir: P, iteration: u64) -> PathBuf {
    checkpoint_dir
        .as_ref()
        .join(format!("checkpoint-{}", iteration))
}

/// Path of the training-progress metadata stored next to a checkpoint.
pub fn metadata_path<P: AsRef<Path>>(checkpoint_path: P) -> PathBuf {
    let mut name: OsString = checkpoint_path.as_ref().as_os_str().to_owned();
    name.push(".meta");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::BTreeMap;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct State {
        step: u64,
        weights: BTreeMap<String, Vec<f64>>,
    }

    #[test]
    fn checkpoint_path_names_iteration() {
        let path = checkpoint_path("/tmp/run", 12);
        assert_eq!(path, PathBuf::from("/tmp/run/checkpoint-12"));
        assert_eq!(
            metadata_path(&path),
            PathBuf::from("/tmp/run/checkpoint-12.meta")
        );
    }

    #[test]
    fn save_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = checkpoint_path(dir.path(), 3);

        let mut weights = BTreeMap::new();
        weights.insert("default".to_string(), vec![0.5, -1.0]);
        let state = State { step: 3, weights };
        state.save_to(&path).unwrap();
        let loaded = State::load_from(&path).unwrap();
        assert_eq!(loaded, state);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let result = State::load_from("/nonexistent/rlagent/checkpoint-0");
        assert!(matches!(result, Err(CheckpointError::Io(_))));
    }
}
