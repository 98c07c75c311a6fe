use super::{Evaluators, OptimizerError, OptimizerState, PolicyOptimizer};
use crate::evaluation::Pending;
use crate::policy::{LearnerStats, PolicyId};
use crate::sampler::SampleBatch;
use log::debug;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Synchronous sampling then learning on the local evaluator.
///
/// Each step broadcasts the local weights to the remotes, gathers at least
/// `train_batch_size` steps from the remotes (or from the local evaluator when there are
/// none), and learns on the concatenated batch.
pub struct SyncSamplesOptimizer {
    evaluators: Evaluators,
    pub train_batch_size: usize,
    num_steps_sampled: u64,
    num_steps_trained: u64,
    sample_time: Duration,
    learn_time: Duration,
    learner_stats: BTreeMap<PolicyId, LearnerStats>,
}

impl SyncSamplesOptimizer {
    pub fn new(evaluators: Evaluators, train_batch_size: usize) -> Self {
        Self {
            evaluators,
            train_batch_size,
            num_steps_sampled: 0,
            num_steps_trained: 0,
            sample_time: Duration::ZERO,
            learn_time: Duration::ZERO,
            learner_stats: BTreeMap::new(),
        }
    }

    /// Learner statistics of the most recent step.
    pub const fn learner_stats(&self) -> &BTreeMap<PolicyId, LearnerStats> {
        &self.learner_stats
    }

    fn collect_samples(&mut self) -> Result<SampleBatch, OptimizerError> {
        let Evaluators { local, remotes } = &mut self.evaluators;
        let mut batches = Vec::new();
        let mut num_steps = 0;
        while num_steps < self.train_batch_size {
            let round = if remotes.is_empty() {
                vec![local.sample()?]
            } else {
                let pending = remotes
                    .iter()
                    .map(|remote| remote.sample())
                    .collect::<Result<Vec<_>, _>>()?;
                pending
                    .into_iter()
                    .map(Pending::get)
                    .collect::<Result<Vec<_>, _>>()?
            };
            let round_steps: usize = round.iter().map(SampleBatch::len).sum();
            if round_steps == 0 {
                debug!("evaluators returned empty sample batches");
                break;
            }
            num_steps += round_steps;
            batches.extend(round);
        }
        Ok(SampleBatch::concat(batches))
    }
}

impl PolicyOptimizer for SyncSamplesOptimizer {
    fn step(&mut self) -> Result<(), OptimizerError> {
        let sample_start = Instant::now();
        if !self.evaluators.remotes.is_empty() {
            let weights = Arc::new(self.evaluators.local.get_weights(None)?);
            for remote in &self.evaluators.remotes {
                remote.set_weights(Arc::clone(&weights))?;
            }
        }
        let batch = self.collect_samples()?;
        self.sample_time = sample_start.elapsed();

        let learn_start = Instant::now();
        self.learner_stats = self.evaluators.local.learn_on_batch(&batch)?;
        self.learn_time = learn_start.elapsed();

        self.num_steps_sampled += batch.len() as u64;
        self.num_steps_trained += batch.len() as u64;
        Ok(())
    }

    fn num_steps_sampled(&self) -> u64 {
        self.num_steps_sampled
    }

    fn num_steps_trained(&self) -> u64 {
        self.num_steps_trained
    }

    fn evaluators(&self) -> &Evaluators {
        &self.evaluators
    }

    fn evaluators_mut(&mut self) -> &mut Evaluators {
        &mut self.evaluators
    }

    fn stats(&self) -> Map<String, Value> {
        let mut stats = Map::new();
        stats.insert("num_steps_sampled".into(), self.num_steps_sampled.into());
        stats.insert("num_steps_trained".into(), self.num_steps_trained.into());
        stats.insert(
            "sample_time_ms".into(),
            (self.sample_time.as_secs_f64() * 1000.0).into(),
        );
        stats.insert(
            "learn_time_ms".into(),
            (self.learn_time.as_secs_f64() * 1000.0).into(),
        );
        let learner = serde_json::to_value(&self.learner_stats).unwrap_or(Value::Null);
        stats.insert("learner".into(), learner);
        stats
    }

    fn save(&self) -> OptimizerState {
        OptimizerState {
            num_steps_trained: self.num_steps_trained,
            num_steps_sampled: self.num_steps_sampled,
        }
    }

    fn restore(&mut self, state: &OptimizerState) {
        self.num_steps_trained = state.num_steps_trained;
        self.num_steps_sampled = state.num_steps_sampled;
    }
}
