use super::{PolicyEvaluator, RemoteError, RemoteEvaluator};
use crate::sampler::RolloutMetrics;
use crate::utils::stats::OnlineMeanVariance;
use log::warn;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Summary statistics of the episodes completed during one training iteration.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EpisodeSummary {
    /// `None` when no episode completed.
    pub episode_reward_max: Option<f64>,
    pub episode_reward_min: Option<f64>,
    pub episode_reward_mean: Option<f64>,
    pub episode_len_mean: Option<f64>,
    pub episodes_this_iter: u64,
}

impl EpisodeSummary {
    pub fn from_metrics(metrics: &[RolloutMetrics]) -> Self {
        let rewards: OnlineMeanVariance<f64> =
            metrics.iter().map(|m| m.episode_reward).collect();
        #[allow(clippy::cast_precision_loss)]
        let lengths: OnlineMeanVariance<f64> =
            metrics.iter().map(|m| m.episode_length as f64).collect();
        let rewards_iter = || metrics.iter().map(|m| m.episode_reward);
        Self {
            episode_reward_max: rewards_iter().reduce(f64::max),
            episode_reward_min: rewards_iter().reduce(f64::min),
            episode_reward_mean: rewards.mean(),
            episode_len_mean: lengths.mean(),
            episodes_this_iter: rewards.count(),
        }
    }
}

/// Gather the episode metrics of the local and remote evaluators.
///
/// Remotes that do not reply within `timeout` (measured from the first request) are skipped
/// with a warning.
pub fn collect_episodes(
    local: &mut PolicyEvaluator,
    remotes: &[RemoteEvaluator],
    timeout: Duration,
) -> Result<Vec<RolloutMetrics>, RemoteError> {
    let deadline = Instant::now() + timeout;
    let pending = remotes
        .iter()
        .map(RemoteEvaluator::get_metrics)
        .collect::<Result<Vec<_>, _>>()?;
    let mut episodes = local.get_metrics();
    for reply in pending {
        match reply.get_timeout(deadline.saturating_duration_since(Instant::now())) {
            Ok(metrics) => episodes.extend(metrics),
            Err(RemoteError::Timeout { worker_index }) => {
                warn!(
                    "remote evaluator {} did not report metrics within {:?}",
                    worker_index, timeout
                );
            }
            Err(e) => return Err(e),
        }
    }
    Ok(episodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn episode(length: usize, reward: f64) -> RolloutMetrics {
        RolloutMetrics {
            episode_length: length,
            episode_reward: reward,
        }
    }

    #[test]
    fn empty_summary() {
        let summary = EpisodeSummary::from_metrics(&[]);
        assert_eq!(summary, EpisodeSummary::default());
    }

    #[rstest]
    fn summary_statistics() {
        let summary =
            EpisodeSummary::from_metrics(&[episode(10, 1.0), episode(20, 3.0), episode(30, 5.0)]);
        assert_eq!(summary.episode_reward_max, Some(5.0));
        assert_eq!(summary.episode_reward_min, Some(1.0));
        assert_eq!(summary.episode_reward_mean, Some(3.0));
        assert_eq!(summary.episode_len_mean, Some(20.0));
        assert_eq!(summary.episodes_this_iter, 3);
    }
}
