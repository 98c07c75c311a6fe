//! Iterative training bookkeeping
use crate::checkpoint::{metadata_path, SaveLoad};
use crate::config::Config;
use crate::error::AgentError;
use crate::evaluation::EpisodeSummary;
use chrono::Local;
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Result of one training iteration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainResult {
    #[serde(flatten)]
    pub episodes: EpisodeSummary,
    /// Environment steps sampled during this iteration.
    pub timesteps_this_iter: u64,
    /// Algorithm-specific information.
    pub info: Map<String, Value>,

    pub training_iteration: u64,
    pub timesteps_total: u64,
    pub episodes_total: u64,
    pub time_this_iter_s: f64,
    pub time_total_s: f64,
    /// Unix timestamp (seconds) of the end of the iteration.
    pub timestamp: i64,
    pub date: String,
    /// Set by the algorithm when training should end.
    pub done: bool,
    pub config: Config,
}

/// Counters accumulated over training iterations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub iteration: u64,
    pub timesteps_total: u64,
    pub episodes_total: u64,
    pub time_total: Duration,
}

impl Progress {
    /// Advance by one iteration and fill the bookkeeping fields of its result.
    pub fn complete_iteration(&mut self, result: &mut TrainResult, elapsed: Duration) {
        self.iteration += 1;
        self.timesteps_total += result.timesteps_this_iter;
        self.episodes_total += result.episodes.episodes_this_iter;
        self.time_total += elapsed;

        let now = Local::now();
        result.training_iteration = self.iteration;
        result.timesteps_total = self.timesteps_total;
        result.episodes_total = self.episodes_total;
        result.time_this_iter_s = elapsed.as_secs_f64();
        result.time_total_s = self.time_total.as_secs_f64();
        result.timestamp = now.timestamp();
        result.date = now.format("%Y-%m-%d_%H-%M-%S").to_string();

        info!(
            "iteration {}: reward_mean={} len_mean={} timesteps_total={} time_total_s={:.1}",
            self.iteration,
            result
                .episodes
                .episode_reward_mean
                .map_or_else(|| "n/a".to_string(), |r| format!("{:.2}", r)),
            result
                .episodes
                .episode_len_mean
                .map_or_else(|| "n/a".to_string(), |l| format!("{:.1}", l)),
            self.timesteps_total,
            result.time_total_s,
        );
    }

    /// Write the counters next to a checkpoint.
    pub fn save_metadata(&self, checkpoint_path: &Path) -> Result<(), AgentError> {
        Ok(self.save_to(metadata_path(checkpoint_path))?)
    }

    /// Read the counters stored next to a checkpoint.
    pub fn load_metadata(checkpoint_path: &Path) -> Result<Self, AgentError> {
        Ok(Self::load_from(metadata_path(checkpoint_path))?)
    }
}

/// An object trained by repeated calls to [`Trainable::train`].
pub trait Trainable {
    /// Run one training iteration.
    fn train(&mut self) -> Result<TrainResult, AgentError>;

    /// Write a checkpoint into `checkpoint_dir` (the log directory by default).
    ///
    /// Returns the checkpoint path.
    fn save(&mut self, checkpoint_dir: Option<&Path>) -> Result<PathBuf, AgentError>;

    /// Restore from a checkpoint written by [`Trainable::save`].
    fn restore(&mut self, checkpoint_path: &Path) -> Result<(), AgentError>;

    /// Release all resources. Training cannot continue afterwards.
    fn stop(&mut self);

    /// Number of completed training iterations.
    fn iteration(&self) -> u64;

    fn logdir(&self) -> &Path;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn result() -> TrainResult {
        TrainResult {
            episodes: EpisodeSummary {
                episodes_this_iter: 2,
                ..EpisodeSummary::default()
            },
            timesteps_this_iter: 100,
            ..TrainResult::default()
        }
    }

    #[rstest]
    fn complete_iteration_accumulates(mut result: TrainResult) {
        let mut progress = Progress::default();
        progress.complete_iteration(&mut result, Duration::from_secs(1));
        let mut second = result.clone();
        progress.complete_iteration(&mut second, Duration::from_secs(2));

        assert_eq!(result.training_iteration, 1);
        assert_eq!(second.training_iteration, 2);
        assert_eq!(second.timesteps_total, 200);
        assert_eq!(second.episodes_total, 4);
        assert_eq!(second.time_this_iter_s, 2.0);
        assert_eq!(second.time_total_s, 3.0);
        assert!(!second.date.is_empty());
    }

    #[rstest]
    fn result_json_is_flat(result: TrainResult) {
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["episodes_this_iter"], 2);
        assert!(value["episode_reward_mean"].is_null());
        assert_eq!(value["timesteps_this_iter"], 100);
    }

    #[test]
    fn metadata_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoint = dir.path().join("checkpoint-3");
        let progress = Progress {
            iteration: 3,
            timesteps_total: 600,
            episodes_total: 12,
            time_total: Duration::from_millis(1500),
        };
        progress.save_metadata(&checkpoint).unwrap();
        assert!(dir.path().join("checkpoint-3.meta").is_file());
        assert_eq!(Progress::load_metadata(&checkpoint).unwrap(), progress);
    }
}
