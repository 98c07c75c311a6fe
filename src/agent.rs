//! Agent lifecycle
//!
//! An [`Agent`] wraps an [`Algorithm`] with the machinery shared by all algorithms:
//! configuration merging, environment resolution, evaluator construction,
//! per-iteration synchronization of global variables and observation filters,
//! result logging and checkpointing.
use crate::checkpoint::{checkpoint_path, SaveLoad};
use crate::config::{
    deep_update, merge_dicts, parse_log_level, validate_config, AgentSettings, Config,
    FilterKind, DEFAULT_ALLOW_UNKNOWN_SUBKEYS,
};
use crate::envs::{
    register_if_needed, resolve_env_creator, Action, EnvCreator, EnvSpec, Observation,
};
use crate::error::AgentError;
use crate::evaluation::{
    session_creator, EvaluatorConfig, EvaluatorState, FilterManager, GlobalVars,
    PolicyEvaluator, RemoteArgs, RemoteEvaluator, WeightsMap,
};
use crate::logging::{
    default_logger_creator, LogError, LoggerCreator, ResultLogger, UnifiedLogger,
};
use crate::optimizers::{OptimizerState, PolicyOptimizer};
use crate::policy::{PolicyGraph, PolicyGraphs, PolicyId, PolicyMappingFn, PolicyOutput};
use crate::trainable::{Progress, Trainable, TrainResult};
use log::{debug, info, warn};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// A training algorithm run by an [`Agent`].
pub trait Algorithm: Sized + Send + 'static {
    /// Name of the algorithm, used in log directory names.
    const NAME: &'static str;

    /// Whether user configs may contain top-level keys absent from [`Algorithm::default_config`].
    const ALLOW_UNKNOWN_CONFIGS: bool = false;

    /// Top-level config sub-trees that accept unknown keys.
    const ALLOW_UNKNOWN_SUBKEYS: &'static [&'static str] = DEFAULT_ALLOW_UNKNOWN_SUBKEYS;

    /// The complete default configuration of the algorithm.
    fn default_config() -> Config;

    /// Initialize the algorithm from the merged configuration.
    fn init(core: &AgentCore) -> Result<Self, AgentError>;

    /// Run one training step.
    ///
    /// Only the algorithm-specific result fields need to be filled;
    /// the bookkeeping fields are set by the agent.
    fn train_step(&mut self) -> Result<TrainResult, AgentError>;

    /// The optimizer owning the evaluators, if the algorithm uses one.
    fn optimizer(&self) -> Option<&dyn PolicyOptimizer> {
        None
    }

    fn optimizer_mut(&mut self) -> Option<&mut dyn PolicyOptimizer> {
        None
    }

    /// Algorithm-specific checkpoint data.
    fn get_state(&self) -> Option<Value> {
        None
    }

    fn set_state(&mut self, _state: Value) -> Result<(), AgentError> {
        Ok(())
    }
}

/// Resources requested by an agent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Resources {
    /// CPUs used by the driver.
    pub cpu: f64,
    /// GPUs used by the driver.
    pub gpu: f64,
    /// CPUs used by all remote evaluators together.
    pub extra_cpu: f64,
    pub extra_gpu: f64,
}

/// Serialized agent checkpoint contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    pub evaluator: Option<EvaluatorState>,
    pub optimizer: Option<OptimizerState>,
    /// Algorithm-specific data.
    pub algorithm: Option<Value>,
}

/// Action computed by [`Agent::compute_action`].
#[derive(Debug, Clone, PartialEq)]
pub enum ComputedAction {
    /// The action alone; returned when no recurrent state was given.
    Action(Action),
    /// The action together with the next recurrent state and extra policy outputs.
    Full(PolicyOutput),
}

impl ComputedAction {
    pub fn action(&self) -> &Action {
        match self {
            Self::Action(action) => action,
            Self::Full(output) => &output.action,
        }
    }
}

/// Callback invoked with the agent and the result at the end of each training iteration.
pub type TrainResultCallback<A> = Box<dyn FnMut(&mut Agent<A>, &TrainResult) + Send>;

/// Agent state shared with the algorithm during initialization.
///
/// Provides the merged configuration and constructs evaluators.
pub struct AgentCore {
    config: Config,
    settings: AgentSettings,
    env_name: Option<String>,
    env_creator: EnvCreator,
    policy_graphs: PolicyGraphs,
    policy_mapping_fn: Option<PolicyMappingFn>,
    logdir: PathBuf,
}

impl fmt::Debug for AgentCore {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("AgentCore")
            .field("env_name", &self.env_name)
            .field("policy_graphs", &self.policy_graphs)
            .field("logdir", &self.logdir)
            .finish_non_exhaustive()
    }
}

impl AgentCore {
    /// The merged configuration.
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Typed view of the common configuration keys.
    pub const fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    pub fn env_name(&self) -> Option<&str> {
        self.env_name.as_deref()
    }

    pub const fn env_creator(&self) -> &EnvCreator {
        &self.env_creator
    }

    pub fn logdir(&self) -> &Path {
        &self.logdir
    }

    /// Build the in-process evaluator (worker index 0).
    ///
    /// Uses `tf_session_args` with `local_evaluator_tf_session_args` merged over it.
    pub fn make_local_evaluator(
        &self,
        policy_graphs: PolicyGraphs,
    ) -> Result<PolicyEvaluator, AgentError> {
        let session_args = merge_dicts(
            &self.settings.tf_session_args,
            &self.settings.local_evaluator_tf_session_args,
        );
        let config = self.evaluator_config(policy_graphs, 0, &session_args)?;
        Ok(PolicyEvaluator::new(config)?)
    }

    /// Spawn `count` remote evaluators with worker indices `1..=count`.
    pub fn make_remote_evaluators(
        &self,
        policy_graphs: &PolicyGraphs,
        count: usize,
    ) -> Result<Vec<RemoteEvaluator>, AgentError> {
        let remote_args = RemoteArgs {
            num_cpus: self.settings.num_cpus_per_worker,
            num_gpus: self.settings.num_gpus_per_worker,
            resources: self.settings.custom_resources_per_worker.clone(),
        };
        (1..=count)
            .map(|worker_index| {
                let config = self.evaluator_config(
                    policy_graphs.clone(),
                    worker_index,
                    &self.settings.tf_session_args,
                )?;
                Ok(RemoteEvaluator::spawn(config, remote_args.clone())?)
            })
            .collect()
    }

    fn evaluator_config(
        &self,
        policy_graphs: PolicyGraphs,
        worker_index: usize,
        session_args: &Config,
    ) -> Result<EvaluatorConfig, AgentError> {
        let settings = &self.settings;
        // Multi-agent graphs from the builder replace the algorithm's default policy
        let policy_graphs = if self.policy_graphs.is_empty() {
            policy_graphs
        } else {
            self.policy_graphs.clone()
        };
        let mut config = EvaluatorConfig::new(Arc::clone(&self.env_creator), policy_graphs);
        config.policy_mapping_fn = self.policy_mapping_fn.clone();
        config.policies_to_train = settings.multiagent.policies_to_train.clone();
        config.session_creator = session_creator(session_args)?;
        config.batch_steps = settings.sample_batch_size;
        config.batch_mode = settings.batch_mode;
        config.episode_horizon = settings.horizon;
        config.preprocessor_pref = settings.preprocessor_pref.clone();
        config.num_envs = settings.num_envs_per_worker;
        config.observation_filter = settings.observation_filter;
        config.clip_rewards = settings.clip_rewards;
        config.clip_actions = settings.clip_actions;
        config.env_config = settings.env_config.clone();
        config.policy_config = self.config.clone();
        config.worker_index = worker_index;
        config.monitor_path = if settings.monitor {
            Some(self.logdir.join("monitor"))
        } else {
            None
        };
        config.seed = settings.seed;
        Ok(config)
    }
}

/// A reinforcement learning agent running algorithm `A`.
///
/// Agents keep model state between calls to [`Trainable::train`];
/// create a new agent for each training session.
pub struct Agent<A: Algorithm> {
    core: AgentCore,
    algorithm: A,
    progress: Progress,
    global_vars: GlobalVars,
    logger: Box<dyn ResultLogger>,
    on_train_result: Option<TrainResultCallback<A>>,
    stopped: bool,
}

impl<A: Algorithm> fmt::Debug for Agent<A> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Agent")
            .field("name", &A::NAME)
            .field("core", &self.core)
            .field("progress", &self.progress)
            .field("global_vars", &self.global_vars)
            .field("stopped", &self.stopped)
            .finish_non_exhaustive()
    }
}

impl<A: Algorithm> Agent<A> {
    /// Start building an agent.
    pub fn builder() -> AgentBuilder<A> {
        AgentBuilder::new()
    }

    /// Resources needed to run an agent with the given config.
    ///
    /// The config entries replace the algorithm defaults without a deep merge.
    pub fn default_resource_request(config: &Config) -> Result<Resources, AgentError> {
        let mut config_full = A::default_config();
        config_full.extend(config.clone());
        validate_config(&config_full)?;
        let settings = AgentSettings::from_config(&config_full)?;
        #[allow(clippy::cast_precision_loss)]
        let num_workers = settings.num_workers as f64;
        Ok(Resources {
            cpu: settings.num_cpus_for_driver,
            gpu: settings.num_gpus,
            extra_cpu: settings.num_cpus_per_worker * num_workers,
            extra_gpu: settings.num_gpus_per_worker * num_workers,
        })
    }

    /// Hint shown when the resources of an agent cannot be satisfied.
    pub fn resource_help(config: &Config) -> String {
        format!(
            "\n\nYou can adjust the resource requests of {} agents by setting `num_workers` \
             and other configs. See the default config of each agent for more info.\n\n\
             The config of this agent is: {}",
            A::NAME,
            Value::Object(config.clone())
        )
    }

    pub const fn config(&self) -> &Config {
        &self.core.config
    }

    pub const fn settings(&self) -> &AgentSettings {
        &self.core.settings
    }

    pub fn env_name(&self) -> Option<&str> {
        self.core.env_name()
    }

    pub const fn algorithm(&self) -> &A {
        &self.algorithm
    }

    pub fn algorithm_mut(&mut self) -> &mut A {
        &mut self.algorithm
    }

    /// Global variables sent to the evaluators at the start of the last iteration.
    pub const fn global_vars(&self) -> &GlobalVars {
        &self.global_vars
    }

    pub const fn progress(&self) -> &Progress {
        &self.progress
    }

    pub const fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// The local evaluator, if the algorithm built one.
    pub fn local_evaluator(&self) -> Option<&PolicyEvaluator> {
        self.algorithm
            .optimizer()
            .map(|optimizer| &optimizer.evaluators().local)
    }

    fn local_evaluator_mut(
        &mut self,
        operation: &'static str,
    ) -> Result<&mut PolicyEvaluator, AgentError> {
        self.algorithm
            .optimizer_mut()
            .map(|optimizer| &mut optimizer.evaluators_mut().local)
            .ok_or(AgentError::NotImplemented(operation))
    }

    /// Compute an action for a raw observation with the given policy.
    ///
    /// The observation is preprocessed and filtered without updating the filter statistics.
    /// Returns only the action when `state` is empty and the full policy output otherwise.
    pub fn compute_action(
        &mut self,
        observation: &Observation,
        state: &[Array1<f64>],
        policy_id: &str,
    ) -> Result<ComputedAction, AgentError> {
        let output = self
            .local_evaluator_mut("compute_action")?
            .compute_action(observation, state, policy_id)?;
        Ok(if state.is_empty() {
            ComputedAction::Action(output.action)
        } else {
            ComputedAction::Full(output)
        })
    }

    /// Policy weights by policy id, for the given policies or all of them.
    pub fn get_weights(&self, policies: Option<&[PolicyId]>) -> Result<WeightsMap, AgentError> {
        let local = self
            .local_evaluator()
            .ok_or(AgentError::NotImplemented("get_weights"))?;
        Ok(local.get_weights(policies)?)
    }

    /// Set policy weights by policy id on the local evaluator.
    pub fn set_weights(&mut self, weights: &WeightsMap) -> Result<(), AgentError> {
        Ok(self.local_evaluator_mut("set_weights")?.set_weights(weights)?)
    }

    fn sync_global_vars(&mut self) -> Result<(), AgentError> {
        if let Some(optimizer) = self.algorithm.optimizer_mut() {
            self.global_vars.timestep = optimizer.num_steps_sampled();
            let evaluators = optimizer.evaluators_mut();
            evaluators.local.set_global_vars(self.global_vars.clone());
            for remote in &evaluators.remotes {
                remote.set_global_vars(self.global_vars.clone())?;
            }
            debug!("updated global vars: {:?}", self.global_vars);
        }
        Ok(())
    }

    fn sync_filters(&mut self) -> Result<(), AgentError> {
        if self.core.settings.observation_filter == FilterKind::NoFilter {
            return Ok(());
        }
        let update_remote = self.core.settings.synchronize_filters;
        if let Some(optimizer) = self.algorithm.optimizer_mut() {
            let evaluators = optimizer.evaluators_mut();
            FilterManager::synchronize(
                evaluators.local.filters_mut(),
                &evaluators.remotes,
                update_remote,
            )?;
            debug!("synchronized filters: {:?}", evaluators.local.filters());
        }
        Ok(())
    }

    /// Snapshot of the evaluator, optimizer and algorithm state.
    ///
    /// Flushes the local filter buffers.
    pub fn get_state(&mut self) -> AgentState {
        let (evaluator, optimizer) = match self.algorithm.optimizer_mut() {
            Some(optimizer) => (
                Some(optimizer.evaluators_mut().local.save()),
                Some(optimizer.save()),
            ),
            None => (None, None),
        };
        AgentState {
            evaluator,
            optimizer,
            algorithm: self.algorithm.get_state(),
        }
    }

    /// Restore a snapshot taken by [`Agent::get_state`].
    ///
    /// The evaluator state is applied locally and then sent to every remote evaluator.
    pub fn set_state(&mut self, state: AgentState) -> Result<(), AgentError> {
        if let Some(evaluator_state) = state.evaluator {
            let optimizer = self
                .algorithm
                .optimizer_mut()
                .ok_or(AgentError::NotImplemented("restoring evaluator state"))?;
            let evaluators = optimizer.evaluators_mut();
            evaluators.local.restore(&evaluator_state)?;
            let shared = Arc::new(evaluator_state);
            for remote in &evaluators.remotes {
                remote.restore(Arc::clone(&shared))?;
            }
        }
        if let Some(optimizer_state) = state.optimizer {
            self.algorithm
                .optimizer_mut()
                .ok_or(AgentError::NotImplemented("restoring optimizer state"))?
                .restore(&optimizer_state);
        }
        if let Some(algorithm_state) = state.algorithm {
            self.algorithm.set_state(algorithm_state)?;
        }
        Ok(())
    }
}

impl<A: Algorithm> Trainable for Agent<A> {
    /// Synchronize global vars and filters, run one algorithm step, then log the result.
    fn train(&mut self) -> Result<TrainResult, AgentError> {
        if self.stopped {
            return Err(AgentError::Stopped);
        }
        self.sync_global_vars()?;
        self.sync_filters()?;

        let start = Instant::now();
        let mut result = self.algorithm.train_step()?;
        result.config = self.core.config.clone();
        self.progress.complete_iteration(&mut result, start.elapsed());
        self.logger.log_result(&result)?;

        if let Some(mut callback) = self.on_train_result.take() {
            callback(self, &result);
            self.on_train_result = Some(callback);
        }
        Ok(result)
    }

    fn save(&mut self, checkpoint_dir: Option<&Path>) -> Result<PathBuf, AgentError> {
        let dir = checkpoint_dir.map_or_else(|| self.core.logdir.clone(), Path::to_path_buf);
        fs::create_dir_all(&dir)?;
        let path = checkpoint_path(&dir, self.progress.iteration);
        self.get_state().save_to(&path)?;
        self.progress.save_metadata(&path)?;
        info!("saved checkpoint {}", path.display());
        Ok(path)
    }

    fn restore(&mut self, checkpoint_path: &Path) -> Result<(), AgentError> {
        let state = AgentState::load_from(checkpoint_path)?;
        let progress = Progress::load_metadata(checkpoint_path)?;
        self.set_state(state)?;
        self.progress = progress;
        info!(
            "restored checkpoint {} at iteration {}",
            checkpoint_path.display(),
            self.progress.iteration
        );
        Ok(())
    }

    /// Terminate the remote evaluators and stop the optimizer.
    fn stop(&mut self) {
        if self.stopped {
            return;
        }
        if let Some(optimizer) = self.algorithm.optimizer_mut() {
            optimizer.evaluators_mut().terminate_remotes();
            optimizer.stop();
        }
        if let Err(e) = self.logger.flush() {
            warn!("failed to flush result logger: {}", e);
        }
        self.stopped = true;
        debug!("{} agent stopped", A::NAME);
    }

    fn iteration(&self) -> u64 {
        self.progress.iteration
    }

    fn logdir(&self) -> &Path {
        &self.core.logdir
    }
}

/// Builds an [`Agent`].
pub struct AgentBuilder<A: Algorithm> {
    config: Config,
    env: Option<EnvSpec>,
    logger_creator: Option<LoggerCreator>,
    on_train_result: Option<TrainResultCallback<A>>,
    policy_graphs: PolicyGraphs,
    policy_mapping_fn: Option<PolicyMappingFn>,
    algorithm: PhantomData<fn() -> A>,
}

impl<A: Algorithm> Default for AgentBuilder<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Algorithm> fmt::Debug for AgentBuilder<A> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("AgentBuilder")
            .field("name", &A::NAME)
            .field("config", &self.config)
            .field("env", &self.env)
            .field("policy_graphs", &self.policy_graphs)
            .finish_non_exhaustive()
    }
}

impl<A: Algorithm> AgentBuilder<A> {
    pub fn new() -> Self {
        Self {
            config: Config::new(),
            env: None,
            logger_creator: None,
            on_train_result: None,
            policy_graphs: PolicyGraphs::new(),
            policy_mapping_fn: None,
            algorithm: PhantomData,
        }
    }

    /// User configuration, merged over the algorithm defaults at build time.
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Environment to train on. Takes precedence over the `env` config key.
    #[must_use]
    pub fn env<E: Into<EnvSpec>>(mut self, env: E) -> Self {
        self.env = Some(env.into());
        self
    }

    /// Create the result logger with a custom function.
    #[must_use]
    pub fn logger_creator(mut self, logger_creator: LoggerCreator) -> Self {
        self.logger_creator = Some(logger_creator);
        self
    }

    /// Log results to the given directory instead of a fresh results directory.
    #[must_use]
    pub fn logdir<P: Into<PathBuf>>(self, logdir: P) -> Self {
        let logdir = logdir.into();
        self.logger_creator(Box::new(
            move |config: &Config| -> Result<(Box<dyn ResultLogger>, PathBuf), LogError> {
                fs::create_dir_all(&logdir)?;
                let logger: Box<dyn ResultLogger> =
                    Box::new(UnifiedLogger::new(config, &logdir)?);
                Ok((logger, logdir))
            },
        ))
    }

    /// Call a function with the agent and result after each training iteration.
    #[must_use]
    pub fn on_train_result<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&mut Agent<A>, &TrainResult) + Send + 'static,
    {
        self.on_train_result = Some(Box::new(callback));
        self
    }

    /// Add a policy; the evaluators host these policies instead of the algorithm default.
    #[must_use]
    pub fn policy_graph<S: Into<PolicyId>>(mut self, id: S, graph: PolicyGraph) -> Self {
        self.policy_graphs.insert(id.into(), graph);
        self
    }

    /// Select the acting policy by agent id.
    #[must_use]
    pub fn policy_mapping_fn<F>(mut self, mapping_fn: F) -> Self
    where
        F: Fn(&str) -> PolicyId + Send + Sync + 'static,
    {
        self.policy_mapping_fn = Some(Arc::new(mapping_fn));
        self
    }

    /// Validate and merge the config, resolve the environment and initialize the algorithm.
    pub fn build(self) -> Result<Agent<A>, AgentError> {
        let Self {
            mut config,
            env,
            logger_creator,
            on_train_result,
            policy_graphs,
            policy_mapping_fn,
            ..
        } = self;
        validate_config(&config)?;

        let env_spec = env.or_else(|| config.get("env").and_then(Value::as_str).map(EnvSpec::from));
        let env_name = env_spec.map(register_if_needed);

        let logger_creator = logger_creator.unwrap_or_else(|| {
            default_logger_creator(A::NAME, env_name.as_deref().unwrap_or("None"))
        });
        let (logger, logdir) = logger_creator(&config)?;

        if let Some(name) = &env_name {
            config.insert("env".into(), Value::String(name.clone()));
        }
        let env_creator = resolve_env_creator(env_name.as_deref());

        let mut merged = A::default_config();
        deep_update(
            &mut merged,
            &config,
            A::ALLOW_UNKNOWN_CONFIGS,
            A::ALLOW_UNKNOWN_SUBKEYS,
        )?;
        let settings = AgentSettings::from_config(&merged)?;
        if let Some(level) = settings.log_level.as_deref().filter(|l| !l.is_empty()) {
            log::set_max_level(parse_log_level(level)?);
        }

        let core = AgentCore {
            config: merged,
            settings,
            env_name,
            env_creator,
            policy_graphs,
            policy_mapping_fn,
            logdir,
        };
        let algorithm = A::init(&core)?;
        info!(
            "built {} agent for environment {}",
            A::NAME,
            core.env_name().unwrap_or("None")
        );

        Ok(Agent {
            core,
            algorithm,
            progress: Progress::default(),
            global_vars: GlobalVars::new(0),
            logger,
            on_train_result,
            stopped: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{MockAlgorithm, PolicyGradient};
    use crate::config::{config_from_json, ConfigError};
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn resource_request_scales_with_workers() {
        let config = config_from_json(json!({
            "num_workers": 3,
            "num_cpus_per_worker": 2,
            "num_gpus_per_worker": 0.5,
            "num_gpus": 1,
        }));
        let resources = Agent::<PolicyGradient>::default_resource_request(&config).unwrap();
        assert_eq!(
            resources,
            Resources {
                cpu: 1.0,
                gpu: 1.0,
                extra_cpu: 6.0,
                extra_gpu: 1.5,
            }
        );
    }

    #[test]
    fn resource_request_rejects_deprecated() {
        let config = config_from_json(json!({"gpu": true}));
        assert!(matches!(
            Agent::<PolicyGradient>::default_resource_request(&config),
            Err(AgentError::Config(ConfigError::Deprecated { key: "gpu", .. }))
        ));
    }

    #[test]
    fn resource_help_shows_config() {
        let help =
            Agent::<PolicyGradient>::resource_help(&config_from_json(json!({"num_workers": 4})));
        assert!(help.contains("`num_workers`"));
        assert!(help.contains("\"num_workers\":4"));
    }

    #[rstest]
    #[case::deprecated(json!({"gpu_fraction": 0.5}))]
    #[case::unknown_key(json!({"not_a_key": 1}))]
    #[case::unknown_nested(json!({"tf_session_args": {"x": 1}, "callbacks": {"on_end": 1}}))]
    fn build_rejects_bad_config(#[case] config: Value) {
        let logdir = tempfile::tempdir().unwrap();
        let result = Agent::<PolicyGradient>::builder()
            .config(config_from_json(config))
            .env("CartPole-v0")
            .logdir(logdir.path())
            .build();
        assert!(matches!(result, Err(AgentError::Config(_))));
    }

    #[test]
    fn build_merges_defaults() {
        let logdir = tempfile::tempdir().unwrap();
        let agent = Agent::<PolicyGradient>::builder()
            .config(config_from_json(json!({
                "sample_batch_size": 50,
                "env_config": {"custom": true},
            })))
            .env("CartPole-v0")
            .logdir(logdir.path())
            .build()
            .unwrap();
        assert_eq!(agent.settings().sample_batch_size, 50);
        assert_eq!(agent.settings().num_workers, 0);
        assert_eq!(agent.config()["env"], json!("CartPole-v0"));
        assert_eq!(agent.config()["env_config"], json!({"custom": true}));
        assert_eq!(agent.env_name(), Some("CartPole-v0"));
    }

    #[rstest]
    #[case::null(json!(null))]
    #[case::empty(json!(""))]
    fn unset_log_level_is_skipped(#[case] log_level: Value) {
        let logdir = tempfile::tempdir().unwrap();
        let agent = Agent::<MockAlgorithm>::builder()
            .config(config_from_json(json!({ "log_level": log_level })))
            .logdir(logdir.path())
            .build()
            .unwrap();
        assert!(agent.settings().log_level.as_deref().map_or(true, str::is_empty));
    }

    #[test]
    fn env_from_config() {
        let logdir = tempfile::tempdir().unwrap();
        let agent = Agent::<PolicyGradient>::builder()
            .config(config_from_json(json!({"env": "CartPole-v1"})))
            .logdir(logdir.path())
            .build()
            .unwrap();
        assert_eq!(agent.env_name(), Some("CartPole-v1"));
    }

    #[test]
    fn unknown_env_fails_on_init() {
        let logdir = tempfile::tempdir().unwrap();
        let result = Agent::<PolicyGradient>::builder()
            .env("NoSuchEnv-v0")
            .logdir(logdir.path())
            .build();
        assert!(matches!(result, Err(AgentError::Evaluator(_))));
    }

    #[test]
    fn without_evaluator_not_implemented() {
        let logdir = tempfile::tempdir().unwrap();
        let mut agent = Agent::<MockAlgorithm>::builder()
            .logdir(logdir.path())
            .build()
            .unwrap();
        assert!(agent.local_evaluator().is_none());
        assert!(matches!(
            agent.get_weights(None),
            Err(AgentError::NotImplemented(_))
        ));
        assert!(matches!(
            agent.compute_action(&Array1::zeros(4), &[], crate::policy::DEFAULT_POLICY_ID),
            Err(AgentError::NotImplemented(_))
        ));
    }

    #[test]
    fn train_after_stop_fails() {
        let logdir = tempfile::tempdir().unwrap();
        let mut agent = Agent::<MockAlgorithm>::builder()
            .logdir(logdir.path())
            .build()
            .unwrap();
        agent.train().unwrap();
        agent.stop();
        agent.stop();
        assert!(agent.is_stopped());
        assert!(matches!(agent.train(), Err(AgentError::Stopped)));
    }
}
