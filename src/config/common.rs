use super::{config_from_json, Config};
use once_cell::sync::Lazy;
use serde_json::json;

static COMMON_CONFIG: Lazy<Config> = Lazy::new(|| {
    let mut config = config_from_json(json!({
        // === Debugging ===
        // Whether to write episode stats to the agent log dir
        "monitor": false,
        // Maximum log level of the process
        "log_level": "INFO",
        // Callbacks are registered on the agent builder; kept for schema compatibility.
        "callbacks": {},
        // Seed for the evaluator random number generators; null seeds from entropy.
        "seed": null,

        // === Policy ===
        // Arguments passed to the policy model.
        "model": {},
        // Arguments to pass to the policy optimizer. These vary by optimizer.
        "optimizer": {},

        // === Environment ===
        // Discount factor of the MDP
        "gamma": 0.99,
        // Number of steps after which the episode is forced to terminate
        "horizon": null,
        // Arguments to pass to the env creator
        "env_config": {},
        // Environment name can also be passed via config
        "env": null,
        // Whether to clip rewards to their sign. Unset means no clipping.
        "clip_rewards": null,
        // Whether to clip continuous actions to the action space bounds.
        "clip_actions": true,
        // Whether to use rllib or deepmind preprocessors by default
        "preprocessor_pref": "deepmind",
    }));

    // Split across literals to stay within the `json!` recursion limit
    config.extend(config_from_json(json!({
        // === Resources ===
        // Number of remote evaluators used for parallel sampling
        "num_workers": 2,
        // Number of GPUs to allocate to the driver. May be fractional.
        "num_gpus": 0,
        // Number of CPUs to allocate per worker.
        "num_cpus_per_worker": 1,
        // Number of GPUs to allocate per worker. May be fractional.
        "num_gpus_per_worker": 0,
        // Any custom resources to allocate per worker.
        "custom_resources_per_worker": {},
        // Number of CPUs to allocate for the driver.
        "num_cpus_for_driver": 1,
    })));

    config.extend(config_from_json(json!({
        // === Execution ===
        // Number of environments to evaluate vectorwise per worker.
        "num_envs_per_worker": 1,
        // Default sample batch size
        "sample_batch_size": 200,
        // Training batch size, if applicable. Should be >= sample_batch_size.
        "train_batch_size": 200,
        // Whether to rollout "complete_episodes" or "truncate_episodes"
        "batch_mode": "truncate_episodes",
        // Whether to sample in a background thread (slightly off-policy)
        "sample_async": false,
        // Element-wise observation filter, either "NoFilter" or "MeanStdFilter"
        "observation_filter": "NoFilter",
        // Whether to synchronize the statistics of remote filters.
        "synchronize_filters": true,
    })));

    config.extend(config_from_json(json!({
        // Compute session configuration for the remote evaluators
        "tf_session_args": {
            // note: overriden by `local_evaluator_tf_session_args`
            "intra_op_parallelism_threads": 2,
            "inter_op_parallelism_threads": 2,
            "gpu_options": {
                "allow_growth": true,
            },
            "log_device_placement": false,
            "device_count": {
                "CPU": 1,
            },
            "allow_soft_placement": true,
        },
        // Override the following session args on the local evaluator
        "local_evaluator_tf_session_args": {
            "intra_op_parallelism_threads": 8,
            "inter_op_parallelism_threads": 8,
        },
        // Whether to compress observations in sample batches
        "compress_observations": false,
        // Drop metric batches from unresponsive workers after this many seconds
        "collect_metrics_timeout": 180,

        // === Multiagent ===
        "multiagent": {
            // Policy constructors are registered on the agent builder.
            "policy_graphs": {},
            // Mapping functions are registered on the agent builder.
            "policy_mapping_fn": null,
            // Optional whitelist of policies to train, or null for all policies.
            "policies_to_train": null,
        },
    })));
    config
});

/// Configuration options shared by all agents, with their default values.
pub fn common_config() -> Config {
    COMMON_CONFIG.clone()
}

/// The common agent configuration with `extra_config` entries added or replaced.
///
/// Entries are replaced wholesale, not merged; used to declare algorithm defaults.
pub fn with_common_config(extra_config: Config) -> Config {
    let mut config = common_config();
    config.extend(extra_config);
    config
}

#[cfg(test)]
mod tests {
    use super::super::{validate_config, AgentSettings};
    use super::*;

    #[test]
    fn common_config_is_valid() {
        let config = common_config();
        validate_config(&config).unwrap();
        let settings = AgentSettings::from_config(&config).unwrap();
        assert_eq!(settings.num_workers, 2);
        assert_eq!(settings.sample_batch_size, 200);
    }

    #[test]
    fn extra_config_replaces_entries() {
        let config = with_common_config(config_from_json(json!({
            "num_workers": 0,
            "lr": 0.01,
            "model": {"custom": 1},
        })));
        assert_eq!(config["num_workers"], json!(0));
        assert_eq!(config["lr"], json!(0.01));
        assert_eq!(config["model"], json!({"custom": 1}));
        assert_eq!(config["gamma"], json!(0.99));
    }
}
