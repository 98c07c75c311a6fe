//! Local policy evaluator
use super::{GlobalVars, Session, SessionCreator};
use crate::config::{merge_dicts, BatchMode, Config, ConfigError, FilterKind};
use crate::envs::{BuildEnvError, EnvConfig, EnvContext, EnvCreator, EnvError, Observation};
use crate::filters::{Filter, FilterKindMismatch, FilterMap};
use crate::policy::{
    LearnerStats, Policy, PolicyError, PolicyGraphs, PolicyId, PolicyMappingFn, PolicyOutput,
    PolicySpec, Weights, DEFAULT_AGENT_ID, DEFAULT_POLICY_ID,
};
use crate::preprocessors::Preprocessor;
use crate::sampler::{RolloutMetrics, SampleBatch, Sampler, SamplerConfig};
use crate::Prng;
use log::{debug, info};
use ndarray::Array1;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::mem;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Policy weights by policy id.
pub type WeightsMap = BTreeMap<PolicyId, Weights>;

/// Error constructing or running an evaluator.
#[derive(Debug, Error)]
pub enum EvaluatorError {
    #[error(transparent)]
    BuildEnv(#[from] BuildEnvError),
    #[error(transparent)]
    Env(#[from] EnvError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("policy `{id}`: {source}")]
    Policy {
        id: PolicyId,
        #[source]
        source: PolicyError,
    },
    #[error("unknown policy `{0}`")]
    UnknownPolicy(PolicyId),
    #[error("filter of policy `{id}`: {source}")]
    Filter {
        id: PolicyId,
        #[source]
        source: FilterKindMismatch,
    },
    #[error("expected an observation of length {expected}, got {actual}")]
    ObservationShape { expected: usize, actual: usize },
    #[error("no policies were configured")]
    NoPolicies,
    #[error("episode monitor error: {0}")]
    Monitor(#[from] io::Error),
}

/// Construction arguments of a [`PolicyEvaluator`].
#[derive(Clone)]
pub struct EvaluatorConfig {
    pub env_creator: EnvCreator,
    pub policy_graphs: PolicyGraphs,
    /// Selects the policy that acts in the environment. Defaults to [`DEFAULT_POLICY_ID`].
    pub policy_mapping_fn: Option<PolicyMappingFn>,
    /// Policies updated by `learn_on_batch`, or `None` for all.
    pub policies_to_train: Option<Vec<PolicyId>>,
    pub session_creator: Option<SessionCreator>,
    /// Steps per sample batch.
    pub batch_steps: usize,
    pub batch_mode: BatchMode,
    pub episode_horizon: Option<usize>,
    pub preprocessor_pref: String,
    pub num_envs: usize,
    pub observation_filter: FilterKind,
    pub clip_rewards: Option<bool>,
    pub clip_actions: bool,
    pub env_config: EnvConfig,
    /// Agent configuration passed to the policies.
    pub policy_config: Config,
    pub worker_index: usize,
    /// Directory receiving per-episode statistics.
    pub monitor_path: Option<PathBuf>,
    /// Random seed; offset by the worker index.
    pub seed: Option<u64>,
}

impl EvaluatorConfig {
    /// Configuration with the common defaults.
    pub fn new(env_creator: EnvCreator, policy_graphs: PolicyGraphs) -> Self {
        Self {
            env_creator,
            policy_graphs,
            policy_mapping_fn: None,
            policies_to_train: None,
            session_creator: None,
            batch_steps: 100,
            batch_mode: BatchMode::TruncateEpisodes,
            episode_horizon: None,
            preprocessor_pref: "deepmind".into(),
            num_envs: 1,
            observation_filter: FilterKind::NoFilter,
            clip_rewards: None,
            clip_actions: true,
            env_config: EnvConfig::new(),
            policy_config: Config::new(),
            worker_index: 0,
            monitor_path: None,
            seed: None,
        }
    }
}

/// Serializable evaluator state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluatorState {
    pub filters: FilterMap,
    /// Policy states by policy id.
    pub policies: WeightsMap,
}

struct PolicyEntry {
    policy: Box<dyn Policy>,
    preprocessor: Preprocessor,
}

/// Collects experience from an environment and hosts the policies that act in it.
///
/// Runs either in the driver (the local evaluator, worker index 0) or inside a
/// [`super::RemoteEvaluator`] thread.
pub struct PolicyEvaluator {
    worker_index: usize,
    policies: BTreeMap<PolicyId, PolicyEntry>,
    filters: FilterMap,
    sampling_policy: PolicyId,
    policies_to_train: Option<Vec<PolicyId>>,
    sampler: Sampler,
    metrics: Vec<RolloutMetrics>,
    global_vars: GlobalVars,
    session: Option<Session>,
    monitor: Option<EpisodeMonitor>,
    rng: Prng,
}

impl PolicyEvaluator {
    pub fn new(config: EvaluatorConfig) -> Result<Self, EvaluatorError> {
        if config.policy_graphs.is_empty() {
            return Err(EvaluatorError::NoPolicies);
        }
        let ctx = EnvContext::new(config.env_config.clone(), config.worker_index);
        let envs = (0..config.num_envs.max(1))
            .map(|_| (config.env_creator)(&ctx))
            .collect::<Result<Vec<_>, _>>()?;
        let observation_space = envs[0].observation_space();
        let action_space = envs[0].action_space();
        let session = config.session_creator.as_ref().map(|create| create());

        let mut policies = BTreeMap::new();
        let mut filters = FilterMap::new();
        for (id, graph) in &config.policy_graphs {
            let preprocessor = Preprocessor::for_space(
                graph.observation_space.as_ref().unwrap_or(&observation_space),
                &config.preprocessor_pref,
            )?;
            let policy_config = merge_dicts(&config.policy_config, &graph.config);
            let policy = (graph.factory)(PolicySpec {
                observation_dim: preprocessor.output_dim(),
                action_space: graph.action_space.as_ref().unwrap_or(&action_space),
                config: &policy_config,
                session: session.clone(),
            })
            .map_err(|source| EvaluatorError::Policy {
                id: id.clone(),
                source,
            })?;
            filters.insert(
                id.clone(),
                Filter::new(config.observation_filter, preprocessor.output_dim()),
            );
            policies.insert(
                id.clone(),
                PolicyEntry {
                    policy,
                    preprocessor,
                },
            );
        }

        let sampling_policy = match &config.policy_mapping_fn {
            Some(mapping_fn) => mapping_fn(DEFAULT_AGENT_ID),
            None if policies.contains_key(DEFAULT_POLICY_ID) => DEFAULT_POLICY_ID.to_string(),
            None => policies
                .keys()
                .next()
                .cloned()
                .ok_or(EvaluatorError::NoPolicies)?,
        };
        if !policies.contains_key(&sampling_policy) {
            return Err(EvaluatorError::UnknownPolicy(sampling_policy));
        }

        let monitor = config
            .monitor_path
            .as_ref()
            .map(|dir| EpisodeMonitor::create(dir, config.worker_index))
            .transpose()?;
        let rng = match config.seed {
            Some(seed) => Prng::seed_from_u64(seed.wrapping_add(config.worker_index as u64)),
            None => Prng::from_entropy(),
        };
        let sampler = Sampler::new(
            envs,
            SamplerConfig {
                batch_steps: config.batch_steps,
                batch_mode: config.batch_mode,
                horizon: config.episode_horizon,
                clip_rewards: config.clip_rewards.unwrap_or(false),
                clip_actions: config.clip_actions,
            },
            config.worker_index,
        );
        debug!(
            "evaluator {} built with policies {:?}",
            config.worker_index,
            policies.keys().collect::<Vec<_>>()
        );

        Ok(Self {
            worker_index: config.worker_index,
            policies,
            filters,
            sampling_policy,
            policies_to_train: config.policies_to_train,
            sampler,
            metrics: Vec::new(),
            global_vars: GlobalVars::default(),
            session,
            monitor,
            rng,
        })
    }

    pub const fn worker_index(&self) -> usize {
        self.worker_index
    }

    /// Id of the policy acting in the environment.
    pub fn sampling_policy(&self) -> &str {
        &self.sampling_policy
    }

    pub fn policy_ids(&self) -> impl Iterator<Item = &PolicyId> {
        self.policies.keys()
    }

    pub const fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Collect a batch of experience with the sampling policy.
    pub fn sample(&mut self) -> Result<SampleBatch, EvaluatorError> {
        let id = &self.sampling_policy;
        let entry = self
            .policies
            .get_mut(id)
            .ok_or_else(|| EvaluatorError::UnknownPolicy(id.clone()))?;
        let filter = self
            .filters
            .get_mut(id)
            .ok_or_else(|| EvaluatorError::UnknownPolicy(id.clone()))?;
        let (batch, metrics) = self.sampler.sample(
            entry.policy.as_mut(),
            &entry.preprocessor,
            filter,
            &mut self.rng,
        )?;
        if let Some(monitor) = self.monitor.as_mut() {
            monitor.record(&metrics)?;
        }
        self.metrics.extend(metrics);
        Ok(batch)
    }

    /// Whether `learn_on_batch` updates the policy.
    pub fn is_trainable(&self, id: &str) -> bool {
        self.policies_to_train
            .as_ref()
            .map_or(true, |ids| ids.iter().any(|p| p == id))
    }

    /// Update the sampling policy from a batch it collected, unless it is not trainable.
    pub fn learn_on_batch(
        &mut self,
        batch: &SampleBatch,
    ) -> Result<BTreeMap<PolicyId, LearnerStats>, EvaluatorError> {
        let mut stats = BTreeMap::new();
        let id = self.sampling_policy.clone();
        if self.is_trainable(&id) {
            let policy_stats = self.for_policy(&id, |policy| policy.learn_on_batch(batch))?;
            let policy_stats =
                policy_stats.map_err(|source| EvaluatorError::Policy { id: id.clone(), source })?;
            stats.insert(id, policy_stats);
        }
        Ok(stats)
    }

    /// Weights of the given policies, or of all policies.
    pub fn get_weights(&self, policies: Option<&[PolicyId]>) -> Result<WeightsMap, EvaluatorError> {
        match policies {
            None => Ok(self
                .policies
                .iter()
                .map(|(id, entry)| (id.clone(), entry.policy.get_weights()))
                .collect()),
            Some(ids) => ids
                .iter()
                .map(|id| {
                    self.policies
                        .get(id)
                        .map(|entry| (id.clone(), entry.policy.get_weights()))
                        .ok_or_else(|| EvaluatorError::UnknownPolicy(id.clone()))
                })
                .collect(),
        }
    }

    pub fn set_weights(&mut self, weights: &WeightsMap) -> Result<(), EvaluatorError> {
        for (id, w) in weights {
            self.for_policy(id, |policy| policy.set_weights(w))?
                .map_err(|source| EvaluatorError::Policy {
                    id: id.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Store new global variables and forward them to every policy.
    pub fn set_global_vars(&mut self, global_vars: GlobalVars) {
        for entry in self.policies.values_mut() {
            entry.policy.on_global_var_update(&global_vars);
        }
        self.global_vars = global_vars;
    }

    pub const fn get_global_vars(&self) -> &GlobalVars {
        &self.global_vars
    }

    /// Copies of the observation filters, optionally clearing their buffers afterwards.
    pub fn get_filters(&mut self, flush_after: bool) -> FilterMap {
        let filters = self.filters.clone();
        if flush_after {
            self.filters.values_mut().for_each(Filter::clear_buffer);
        }
        filters
    }

    pub const fn filters(&self) -> &FilterMap {
        &self.filters
    }

    pub fn filters_mut(&mut self) -> &mut FilterMap {
        &mut self.filters
    }

    /// Replace the local filters with the given ones.
    ///
    /// Nothing is changed unless every filter matches a local filter of the same kind.
    pub fn sync_filters(&mut self, new_filters: &FilterMap) -> Result<(), EvaluatorError> {
        for (id, filter) in new_filters {
            let local = self
                .filters
                .get(id)
                .ok_or_else(|| EvaluatorError::UnknownPolicy(id.clone()))?;
            if local.kind() != filter.kind() {
                return Err(EvaluatorError::Filter {
                    id: id.clone(),
                    source: FilterKindMismatch {
                        expected: local.kind(),
                        found: filter.kind(),
                    },
                });
            }
        }
        for (id, filter) in new_filters {
            if let Some(local) = self.filters.get_mut(id) {
                local.sync(filter).map_err(|source| EvaluatorError::Filter {
                    id: id.clone(),
                    source,
                })?;
            }
        }
        Ok(())
    }

    /// Snapshot the filters and policy weights. Flushes the filter buffers.
    pub fn save(&mut self) -> EvaluatorState {
        EvaluatorState {
            filters: self.get_filters(true),
            policies: self
                .policies
                .iter()
                .map(|(id, entry)| (id.clone(), entry.policy.get_state()))
                .collect(),
        }
    }

    pub fn restore(&mut self, state: &EvaluatorState) -> Result<(), EvaluatorError> {
        if let Some(id) = state
            .policies
            .keys()
            .find(|id| !self.policies.contains_key(id.as_str()))
        {
            return Err(EvaluatorError::UnknownPolicy(id.clone()));
        }
        self.sync_filters(&state.filters)?;
        for (id, policy_state) in &state.policies {
            self.for_policy(id, |policy| policy.set_state(policy_state))?
                .map_err(|source| EvaluatorError::Policy {
                    id: id.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Apply a function to the given policy.
    pub fn for_policy<F, R>(&mut self, id: &str, f: F) -> Result<R, EvaluatorError>
    where
        F: FnOnce(&mut dyn Policy) -> R,
    {
        let entry = self
            .policies
            .get_mut(id)
            .ok_or_else(|| EvaluatorError::UnknownPolicy(id.to_string()))?;
        Ok(f(entry.policy.as_mut()))
    }

    /// Compute an action for a raw environment observation.
    ///
    /// The observation is preprocessed and filtered without updating the filter statistics.
    pub fn compute_action(
        &mut self,
        observation: &Observation,
        state: &[Array1<f64>],
        policy_id: &str,
    ) -> Result<PolicyOutput, EvaluatorError> {
        let unknown = || EvaluatorError::UnknownPolicy(policy_id.to_string());
        let entry = self.policies.get_mut(policy_id).ok_or_else(unknown)?;
        let expected = entry.preprocessor.input_dim();
        if observation.len() != expected {
            return Err(EvaluatorError::ObservationShape {
                expected,
                actual: observation.len(),
            });
        }
        let filter = self.filters.get_mut(policy_id).ok_or_else(unknown)?;
        let observation = filter.apply(&entry.preprocessor.transform(observation), false);
        Ok(entry
            .policy
            .compute_single_action(&observation, state, &mut self.rng))
    }

    /// Take the metrics of the episodes completed since the last call.
    pub fn get_metrics(&mut self) -> Vec<RolloutMetrics> {
        mem::take(&mut self.metrics)
    }
}

/// Writes completed-episode statistics as JSON lines.
struct EpisodeMonitor {
    writer: BufWriter<File>,
}

impl EpisodeMonitor {
    fn create(dir: &Path, worker_index: usize) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("episodes-worker{}.json", worker_index));
        info!("writing episode statistics to {}", path.display());
        Ok(Self {
            writer: BufWriter::new(File::create(path)?),
        })
    }

    fn record(&mut self, metrics: &[RolloutMetrics]) -> io::Result<()> {
        for m in metrics {
            serde_json::to_writer(&mut self.writer, m)?;
            self.writer.write_all(b"\n")?;
        }
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::config_from_json;
    use crate::envs::resolve_env_creator;
    use crate::policy::{LinearPolicy, PolicyGraph};
    use ndarray::array;
    use rstest::{fixture, rstest};
    use serde_json::json;
    use std::sync::Arc;

    #[fixture]
    fn config() -> EvaluatorConfig {
        let mut graphs = PolicyGraphs::new();
        graphs.insert(
            DEFAULT_POLICY_ID.into(),
            PolicyGraph::new(LinearPolicy::factory()),
        );
        let mut config = EvaluatorConfig::new(resolve_env_creator(Some("CartPole-v0")), graphs);
        config.batch_steps = 20;
        config.seed = Some(0);
        config
    }

    #[rstest]
    fn sample_collects_batch(config: EvaluatorConfig) {
        let mut evaluator = PolicyEvaluator::new(config).unwrap();
        let batch = evaluator.sample().unwrap();
        assert_eq!(batch.len(), 20);
        assert_eq!(batch.obs[0].len(), 4);
    }

    #[rstest]
    fn unknown_env_fails(mut config: EvaluatorConfig) {
        config.env_creator = resolve_env_creator(Some("Pong-v0"));
        assert!(matches!(
            PolicyEvaluator::new(config),
            Err(EvaluatorError::BuildEnv(BuildEnvError::UnknownEnv(_)))
        ));
    }

    #[rstest]
    fn no_policies_fails(mut config: EvaluatorConfig) {
        config.policy_graphs.clear();
        assert!(matches!(
            PolicyEvaluator::new(config),
            Err(EvaluatorError::NoPolicies)
        ));
    }

    #[rstest]
    fn mapping_to_unknown_policy_fails(mut config: EvaluatorConfig) {
        config.policy_mapping_fn = Some(Arc::new(|_: &str| "missing".to_string()));
        assert!(matches!(
            PolicyEvaluator::new(config),
            Err(EvaluatorError::UnknownPolicy(id)) if id == "missing"
        ));
    }

    #[rstest]
    fn learn_updates_weights(config: EvaluatorConfig) {
        let mut evaluator = PolicyEvaluator::new(config).unwrap();
        let before = evaluator.get_weights(None).unwrap();
        let batch = evaluator.sample().unwrap();
        let stats = evaluator.learn_on_batch(&batch).unwrap();
        assert!(stats[DEFAULT_POLICY_ID].contains_key("policy_loss"));
        assert_ne!(evaluator.get_weights(None).unwrap(), before);
    }

    #[rstest]
    fn untrainable_policy_is_not_updated(mut config: EvaluatorConfig) {
        config.policies_to_train = Some(vec!["other".into()]);
        let mut evaluator = PolicyEvaluator::new(config).unwrap();
        let before = evaluator.get_weights(None).unwrap();
        let batch = evaluator.sample().unwrap();
        assert!(evaluator.learn_on_batch(&batch).unwrap().is_empty());
        assert_eq!(evaluator.get_weights(None).unwrap(), before);
    }

    #[rstest]
    fn set_weights_unknown_policy(config: EvaluatorConfig) {
        let mut evaluator = PolicyEvaluator::new(config).unwrap();
        let mut weights = WeightsMap::new();
        weights.insert("missing".into(), array![1.0]);
        assert!(matches!(
            evaluator.set_weights(&weights),
            Err(EvaluatorError::UnknownPolicy(_))
        ));
        let missing = vec!["missing".to_string()];
        assert!(evaluator.get_weights(Some(missing.as_slice())).is_err());
    }

    #[rstest]
    fn global_vars_reach_policies(config: EvaluatorConfig) {
        let mut evaluator = PolicyEvaluator::new(config).unwrap();
        evaluator.set_global_vars(GlobalVars::new(7));
        assert_eq!(evaluator.get_global_vars().timestep, 7);
    }

    #[rstest]
    fn get_filters_flushes(mut config: EvaluatorConfig) {
        config.observation_filter = FilterKind::MeanStdFilter;
        let mut evaluator = PolicyEvaluator::new(config).unwrap();
        evaluator.sample().unwrap();
        let filters = evaluator.get_filters(true);
        match (&filters[DEFAULT_POLICY_ID], &evaluator.filters()[DEFAULT_POLICY_ID]) {
            (Filter::MeanStd(taken), Filter::MeanStd(local)) => {
                assert!(taken.buffer().count() > 0);
                assert_eq!(local.buffer().count(), 0);
                assert_eq!(local.running_stat(), taken.running_stat());
            }
            _ => panic!("expected mean-std filters"),
        }
    }

    #[rstest]
    fn save_restore(mut config: EvaluatorConfig) {
        config.observation_filter = FilterKind::MeanStdFilter;
        let mut trained = PolicyEvaluator::new(config.clone()).unwrap();
        let batch = trained.sample().unwrap();
        trained.learn_on_batch(&batch).unwrap();
        let state = trained.save();

        let mut fresh = PolicyEvaluator::new(config).unwrap();
        fresh.restore(&state).unwrap();
        assert_eq!(fresh.get_weights(None).unwrap(), state.policies);
        assert_eq!(fresh.filters(), &state.filters);
    }

    #[rstest]
    fn restore_unknown_policy_keeps_filters(mut config: EvaluatorConfig) {
        config.observation_filter = FilterKind::MeanStdFilter;
        let mut trained = PolicyEvaluator::new(config.clone()).unwrap();
        trained.sample().unwrap();
        let mut state = trained.save();
        let weights = state.policies[DEFAULT_POLICY_ID].clone();
        state.policies.insert("missing".into(), weights);

        let mut fresh = PolicyEvaluator::new(config).unwrap();
        let before = fresh.filters().clone();
        assert!(matches!(
            fresh.restore(&state),
            Err(EvaluatorError::UnknownPolicy(id)) if id == "missing"
        ));
        assert_eq!(fresh.filters(), &before);
    }

    #[rstest]
    fn restore_mismatched_filter_kind_fails(mut config: EvaluatorConfig) {
        config.observation_filter = FilterKind::MeanStdFilter;
        let mut trained = PolicyEvaluator::new(config.clone()).unwrap();
        trained.sample().unwrap();
        let state = trained.save();

        config.observation_filter = FilterKind::NoFilter;
        let mut unfiltered = PolicyEvaluator::new(config).unwrap();
        let weights = unfiltered.get_weights(None).unwrap();
        assert!(matches!(
            unfiltered.restore(&state),
            Err(EvaluatorError::Filter { .. })
        ));
        assert_eq!(unfiltered.get_weights(None).unwrap(), weights);
        assert!(matches!(
            unfiltered.filters()[DEFAULT_POLICY_ID],
            Filter::NoFilter
        ));
    }

    #[rstest]
    #[case::short(array![0.0, 0.0, 0.0])]
    #[case::long(array![0.0, 0.0, 0.0, 0.0, 0.0])]
    fn compute_action_checks_observation_length(
        config: EvaluatorConfig,
        #[case] observation: Observation,
    ) {
        let mut evaluator = PolicyEvaluator::new(config).unwrap();
        let len = observation.len();
        let result = evaluator.compute_action(&observation, &[], DEFAULT_POLICY_ID);
        assert!(matches!(
            result,
            Err(EvaluatorError::ObservationShape { expected: 4, actual }) if actual == len
        ));
    }

    #[rstest]
    fn compute_action_does_not_update_filter(mut config: EvaluatorConfig) {
        config.observation_filter = FilterKind::MeanStdFilter;
        let mut evaluator = PolicyEvaluator::new(config).unwrap();
        let before = evaluator.filters().clone();
        let out = evaluator
            .compute_action(&array![0.0, 0.0, 0.0, 0.0], &[], DEFAULT_POLICY_ID)
            .unwrap();
        assert!(matches!(out.action, crate::envs::Action::Discrete(a) if a < 2));
        assert_eq!(evaluator.filters(), &before);
        assert!(evaluator
            .compute_action(&array![0.0], &[], "missing")
            .is_err());
    }

    #[rstest]
    fn policy_config_overrides(mut config: EvaluatorConfig) {
        config.policy_config = config_from_json(json!({"lr": 0.5}));
        let graph = config.policy_graphs.get_mut(DEFAULT_POLICY_ID).unwrap();
        graph.config = config_from_json(json!({"lr": 0.25}));
        let mut evaluator = PolicyEvaluator::new(config).unwrap();
        let batch = evaluator.sample().unwrap();
        let stats = evaluator.learn_on_batch(&batch).unwrap();
        assert_eq!(stats[DEFAULT_POLICY_ID]["cur_lr"], 0.25);
    }

    #[rstest]
    fn monitor_writes_episodes(mut config: EvaluatorConfig) {
        let dir = tempfile::tempdir().unwrap();
        config.monitor_path = Some(dir.path().join("monitor"));
        config.batch_steps = 400;
        let mut evaluator = PolicyEvaluator::new(config).unwrap();
        evaluator.sample().unwrap();
        let metrics = evaluator.get_metrics();
        assert!(!metrics.is_empty());
        let path = dir.path().join("monitor").join("episodes-worker0.json");
        let contents = fs::read_to_string(path).unwrap();
        assert_eq!(contents.lines().count(), metrics.len());
        assert!(evaluator.get_metrics().is_empty());
    }
}
