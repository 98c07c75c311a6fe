//! Environment rollouts
use crate::config::BatchMode;
use crate::envs::{Action, EnvError, Environment, Observation, Space};
use crate::filters::Filter;
use crate::policy::{Policy, RnnState};
use crate::preprocessors::Preprocessor;
use crate::Prng;
use serde::{Deserialize, Serialize};
use std::mem;

/// Column-oriented batch of environment steps.
///
/// All columns have one entry per step except `advantages`, which is empty until the batch
/// has been postprocessed by a policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleBatch {
    pub obs: Vec<Observation>,
    pub actions: Vec<Action>,
    pub rewards: Vec<f64>,
    pub dones: Vec<bool>,
    pub new_obs: Vec<Observation>,
    /// Id of the episode each step belongs to.
    pub eps_id: Vec<u64>,
    pub advantages: Vec<f64>,
}

impl SampleBatch {
    /// Number of steps in the batch.
    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }

    fn push(&mut self, step: Transition) {
        self.obs.push(step.obs);
        self.actions.push(step.action);
        self.rewards.push(step.reward);
        self.dones.push(step.done);
        self.new_obs.push(step.new_obs);
        self.eps_id.push(step.eps_id);
    }

    /// Append the steps of another batch.
    pub fn extend(&mut self, other: Self) {
        self.obs.extend(other.obs);
        self.actions.extend(other.actions);
        self.rewards.extend(other.rewards);
        self.dones.extend(other.dones);
        self.new_obs.extend(other.new_obs);
        self.eps_id.extend(other.eps_id);
        self.advantages.extend(other.advantages);
    }

    /// Concatenate batches in order.
    pub fn concat<I: IntoIterator<Item = Self>>(batches: I) -> Self {
        let mut batches = batches.into_iter();
        let mut out = batches.next().unwrap_or_default();
        for batch in batches {
            out.extend(batch);
        }
        out
    }
}

/// A single environment step.
struct Transition {
    obs: Observation,
    action: Action,
    reward: f64,
    done: bool,
    new_obs: Observation,
    eps_id: u64,
}

/// Statistics of one completed episode.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct RolloutMetrics {
    pub episode_length: usize,
    /// Total unclipped reward.
    pub episode_reward: f64,
}

/// Sampler configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplerConfig {
    /// Number of steps per batch, summed over all environments.
    pub batch_steps: usize,
    pub batch_mode: BatchMode,
    /// Episodes are terminated after this many steps.
    pub horizon: Option<usize>,
    /// Clip rewards to their sign.
    pub clip_rewards: bool,
    /// Clip continuous actions to the action space bounds before stepping.
    pub clip_actions: bool,
}

struct Episode {
    id: u64,
    length: usize,
    reward: f64,
    /// Preprocessed and filtered current observation.
    observation: Observation,
    state: RnnState,
    fragment: SampleBatch,
}

struct EnvSlot {
    env: Box<dyn Environment>,
    episode: Option<Episode>,
}

/// Collects sample batches from a set of environment copies, stepping them round-robin.
///
/// Episodes in progress carry over from one batch to the next in `truncate_episodes` mode.
pub struct Sampler {
    config: SamplerConfig,
    slots: Vec<EnvSlot>,
    action_space: Space,
    worker_index: usize,
    next_episode: u64,
}

impl Sampler {
    /// Create a sampler over at least one environment.
    ///
    /// # Panics
    /// If `envs` is empty.
    pub fn new(
        envs: Vec<Box<dyn Environment>>,
        config: SamplerConfig,
        worker_index: usize,
    ) -> Self {
        assert!(!envs.is_empty(), "sampler requires at least one environment");
        let action_space = envs[0].action_space();
        Self {
            config,
            slots: envs
                .into_iter()
                .map(|env| EnvSlot { env, episode: None })
                .collect(),
            action_space,
            worker_index,
            next_episode: 0,
        }
    }

    pub const fn config(&self) -> &SamplerConfig {
        &self.config
    }

    pub fn num_envs(&self) -> usize {
        self.slots.len()
    }

    /// Collect one batch of postprocessed trajectory fragments.
    ///
    /// Observations are preprocessed then filtered with statistics updates.
    /// Returns the batch and the metrics of the episodes completed while sampling.
    pub fn sample(
        &mut self,
        policy: &mut dyn Policy,
        preprocessor: &Preprocessor,
        filter: &mut Filter,
        rng: &mut Prng,
    ) -> Result<(SampleBatch, Vec<RolloutMetrics>), EnvError> {
        let batch_steps = self.config.batch_steps;
        let complete = self.config.batch_mode == BatchMode::CompleteEpisodes;
        let mut fragments = Vec::new();
        let mut metrics = Vec::new();
        let mut steps = 0;
        let mut index = 0;
        loop {
            if steps >= batch_steps
                && (!complete || self.slots.iter().all(|slot| slot.episode.is_none()))
            {
                break;
            }
            let slot_index = index % self.slots.len();
            index += 1;
            if self.slots[slot_index].episode.is_none() {
                if steps >= batch_steps {
                    continue;
                }
                let episode = self.start_episode(slot_index, policy, preprocessor, filter, rng);
                self.slots[slot_index].episode = Some(episode);
            }

            let EnvSlot { env, episode } = &mut self.slots[slot_index];
            let ep = match episode.as_mut() {
                Some(ep) => ep,
                None => continue,
            };
            let output = policy.compute_single_action(&ep.observation, &ep.state, rng);
            let step = if self.config.clip_actions {
                env.step(&self.action_space.clip(output.action.clone()), rng)?
            } else {
                env.step(&output.action, rng)?
            };
            ep.length += 1;
            ep.reward += step.reward;
            steps += 1;

            let reward = if self.config.clip_rewards {
                clip_to_sign(step.reward)
            } else {
                step.reward
            };
            let done = step.done || self.config.horizon.map_or(false, |h| ep.length >= h);
            let new_obs = filter.apply(&preprocessor.transform(&step.observation), true);
            ep.fragment.push(Transition {
                obs: mem::replace(&mut ep.observation, new_obs.clone()),
                action: output.action,
                reward,
                done,
                new_obs,
                eps_id: ep.id,
            });
            ep.state = output.state;

            if done {
                if let Some(mut ep) = episode.take() {
                    policy.postprocess_trajectory(&mut ep.fragment);
                    metrics.push(RolloutMetrics {
                        episode_length: ep.length,
                        episode_reward: ep.reward,
                    });
                    fragments.push(ep.fragment);
                }
            }
        }

        for ep in self.slots.iter_mut().filter_map(|slot| slot.episode.as_mut()) {
            if !ep.fragment.is_empty() {
                let mut fragment = mem::take(&mut ep.fragment);
                policy.postprocess_trajectory(&mut fragment);
                fragments.push(fragment);
            }
        }
        Ok((SampleBatch::concat(fragments), metrics))
    }

    fn start_episode(
        &mut self,
        slot_index: usize,
        policy: &dyn Policy,
        preprocessor: &Preprocessor,
        filter: &mut Filter,
        rng: &mut Prng,
    ) -> Episode {
        let raw = self.slots[slot_index].env.reset(rng);
        let id = ((self.worker_index as u64) << 32) | self.next_episode;
        self.next_episode += 1;
        Episode {
            id,
            length: 0,
            reward: 0.0,
            observation: filter.apply(&preprocessor.transform(&raw), true),
            state: policy.initial_state(),
            fragment: SampleBatch::default(),
        }
    }
}

fn clip_to_sign(reward: f64) -> f64 {
    if reward > 0.0 {
        1.0
    } else if reward < 0.0 {
        -1.0
    } else {
        0.0
    }
}
