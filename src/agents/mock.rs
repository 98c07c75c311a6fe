//! Mock algorithm for testing the agent lifecycle
use crate::agent::{AgentCore, Algorithm};
use crate::config::{config_from_json, with_common_config, Config, ConfigError};
use crate::error::AgentError;
use crate::evaluation::EpisodeSummary;
use crate::trainable::TrainResult;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Algorithm-specific keys of the mock configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct MockSettings {
    /// Fail on the second training step.
    mock_error: bool,
    /// Keep failing after a restore.
    persistent_error: bool,
    test_variable: i64,
    user_checkpoint_freq: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct MockState {
    info: Option<Value>,
    iteration: u64,
}

/// Does no learning; reports fixed results and records whether it was restored.
#[derive(Debug, Clone, PartialEq)]
pub struct MockAlgorithm {
    settings: MockSettings,
    state: MockState,
    restored: bool,
}

impl MockAlgorithm {
    /// Store an arbitrary value in the checkpointed state.
    pub fn set_info(&mut self, info: Value) {
        self.state.info = Some(info);
    }

    pub const fn info(&self) -> Option<&Value> {
        self.state.info.as_ref()
    }

    /// Whether the state was restored from a checkpoint.
    pub const fn restored(&self) -> bool {
        self.restored
    }

    pub const fn test_variable(&self) -> i64 {
        self.settings.test_variable
    }

    pub const fn user_checkpoint_freq(&self) -> u64 {
        self.settings.user_checkpoint_freq
    }
}

impl Algorithm for MockAlgorithm {
    const NAME: &'static str = "MockAgent";

    fn default_config() -> Config {
        with_common_config(config_from_json(json!({
            "mock_error": false,
            "persistent_error": false,
            "test_variable": 1,
            "num_workers": 0,
            "user_checkpoint_freq": 0,
        })))
    }

    fn init(core: &AgentCore) -> Result<Self, AgentError> {
        let settings = MockSettings::deserialize(Value::Object(core.config().clone()))
            .map_err(ConfigError::from)?;
        Ok(Self {
            settings,
            state: MockState::default(),
            restored: false,
        })
    }

    fn train_step(&mut self) -> Result<TrainResult, AgentError> {
        if self.settings.mock_error
            && self.state.iteration == 1
            && (self.settings.persistent_error || !self.restored)
        {
            return Err(AgentError::Algorithm("mock error".into()));
        }
        self.state.iteration += 1;
        Ok(TrainResult {
            episodes: EpisodeSummary {
                episode_reward_mean: Some(10.0),
                episode_len_mean: Some(10.0),
                ..EpisodeSummary::default()
            },
            timesteps_this_iter: 10,
            ..TrainResult::default()
        })
    }

    fn get_state(&self) -> Option<Value> {
        serde_json::to_value(&self.state).ok()
    }

    fn set_state(&mut self, state: Value) -> Result<(), AgentError> {
        self.state = MockState::deserialize(state).map_err(ConfigError::from)?;
        self.restored = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Agent;
    use crate::trainable::Trainable;

    #[test]
    fn fixed_results() {
        let dir = tempfile::tempdir().unwrap();
        let mut agent = Agent::<MockAlgorithm>::builder()
            .logdir(dir.path())
            .build()
            .unwrap();
        let result = agent.train().unwrap();
        assert_eq!(result.episodes.episode_reward_mean, Some(10.0));
        assert_eq!(result.timesteps_this_iter, 10);
        let result = agent.train().unwrap();
        assert_eq!(result.timesteps_total, 20);
        assert_eq!(agent.algorithm().test_variable(), 1);
    }

    #[test]
    fn mock_error_on_second_iteration() {
        let dir = tempfile::tempdir().unwrap();
        let mut agent = Agent::<MockAlgorithm>::builder()
            .config(config_from_json(json!({"mock_error": true})))
            .logdir(dir.path())
            .build()
            .unwrap();
        agent.train().unwrap();
        assert!(matches!(agent.train(), Err(AgentError::Algorithm(_))));
    }

    #[test]
    fn restore_clears_transient_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut agent = Agent::<MockAlgorithm>::builder()
            .config(config_from_json(json!({"mock_error": true})))
            .logdir(dir.path())
            .build()
            .unwrap();
        agent.train().unwrap();
        agent.algorithm_mut().set_info(json!({"a": 1}));
        let checkpoint = agent.save(None).unwrap();

        let mut restored = Agent::<MockAlgorithm>::builder()
            .config(config_from_json(json!({"mock_error": true})))
            .logdir(dir.path())
            .build()
            .unwrap();
        restored.restore(&checkpoint).unwrap();
        assert!(restored.algorithm().restored());
        assert_eq!(restored.algorithm().info(), Some(&json!({"a": 1})));
        assert_eq!(restored.iteration(), 1);
        restored.train().unwrap();
    }

    #[test]
    fn persistent_error_survives_restore() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_from_json(json!({"mock_error": true, "persistent_error": true}));
        let mut agent = Agent::<MockAlgorithm>::builder()
            .config(config)
            .logdir(dir.path())
            .build()
            .unwrap();
        agent.train().unwrap();
        let checkpoint = agent.save(None).unwrap();
        agent.restore(&checkpoint).unwrap();
        assert!(agent.train().is_err());
    }
}
