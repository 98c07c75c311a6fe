//! Policy gradient
use crate::agent::{AgentCore, Algorithm};
use crate::config::{config_from_json, with_common_config, Config};
use crate::error::AgentError;
use crate::optimizers::{Evaluators, PolicyOptimizer, SyncSamplesOptimizer};
use crate::policy::{LinearPolicy, PolicyGraph, PolicyGraphs, DEFAULT_POLICY_ID};
use crate::trainable::TrainResult;
use serde_json::json;
use std::time::Duration;

/// Vanilla policy gradient with a linear softmax policy.
///
/// Samples synchronously from the evaluators and learns on the local evaluator.
pub struct PolicyGradient {
    optimizer: SyncSamplesOptimizer,
    metrics_timeout: Duration,
}

impl PolicyGradient {
    pub const fn sync_optimizer(&self) -> &SyncSamplesOptimizer {
        &self.optimizer
    }
}

impl Algorithm for PolicyGradient {
    const NAME: &'static str = "PG";

    fn default_config() -> Config {
        with_common_config(config_from_json(json!({
            // No remote workers by default
            "num_workers": 0,
            // Learning rate
            "lr": 0.01,
        })))
    }

    fn init(core: &AgentCore) -> Result<Self, AgentError> {
        let mut policy_graphs = PolicyGraphs::new();
        policy_graphs.insert(
            DEFAULT_POLICY_ID.into(),
            PolicyGraph::new(LinearPolicy::factory()),
        );
        let settings = core.settings();
        let local = core.make_local_evaluator(policy_graphs.clone())?;
        let remotes = core.make_remote_evaluators(&policy_graphs, settings.num_workers)?;
        Ok(Self {
            optimizer: SyncSamplesOptimizer::new(
                Evaluators::new(local, remotes),
                settings.train_batch_size,
            ),
            metrics_timeout: Duration::from_secs(settings.collect_metrics_timeout),
        })
    }

    fn train_step(&mut self) -> Result<TrainResult, AgentError> {
        let prev_steps = self.optimizer.num_steps_sampled();
        self.optimizer.step()?;
        let episodes = self.optimizer.collect_metrics(self.metrics_timeout)?;
        Ok(TrainResult {
            episodes,
            timesteps_this_iter: self.optimizer.num_steps_sampled() - prev_steps,
            info: self.optimizer.stats(),
            ..TrainResult::default()
        })
    }

    fn optimizer(&self) -> Option<&dyn PolicyOptimizer> {
        Some(&self.optimizer)
    }

    fn optimizer_mut(&mut self) -> Option<&mut dyn PolicyOptimizer> {
        Some(&mut self.optimizer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Agent;
    use crate::trainable::Trainable;

    #[test]
    fn default_config_is_complete() {
        let config = PolicyGradient::default_config();
        let settings = crate::config::AgentSettings::from_config(&config).unwrap();
        assert_eq!(settings.num_workers, 0);
        assert_eq!(config["lr"], json!(0.01));
    }

    #[test]
    fn train_step_reports_samples() {
        let logdir = tempfile::tempdir().unwrap();
        let mut agent = Agent::<PolicyGradient>::builder()
            .config(config_from_json(json!({
                "sample_batch_size": 50,
                "train_batch_size": 100,
                "seed": 1,
            })))
            .env("CartPole-v0")
            .logdir(logdir.path())
            .build()
            .unwrap();
        let result = agent.train().unwrap();
        assert_eq!(result.timesteps_this_iter, 100);
        assert_eq!(result.info["num_steps_sampled"], json!(100));
        assert!(result.info["learner"][DEFAULT_POLICY_ID]
            .get("policy_loss")
            .is_some());
        assert_eq!(agent.algorithm().sync_optimizer().num_steps_trained(), 100);
        agent.stop();
    }
}
