use ndarray::Array1;
use rlagent::config::config_from_json;
use rlagent::evaluation::EvaluatorError;
use rlagent::filters::{Filter, FilterMap};
use rlagent::optimizers::PolicyOptimizer;
use rlagent::policy::{LinearPolicy, PolicyGraph, DEFAULT_POLICY_ID};
use rlagent::{Action, Agent, AgentError, ComputedAction, PolicyGradient, Trainable};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tempfile::tempdir;

fn pg_agent(logdir: &Path, config: Value) -> Agent<PolicyGradient> {
    Agent::<PolicyGradient>::builder()
        .config(config_from_json(config))
        .env("CartPole-v0")
        .logdir(logdir)
        .build()
        .unwrap()
}

fn filter_count(filters: &FilterMap) -> u64 {
    match &filters[DEFAULT_POLICY_ID] {
        Filter::MeanStd(f) => f.running_stat().count(),
        Filter::NoFilter => 0,
    }
}

fn buffer_count(filters: &FilterMap) -> u64 {
    match &filters[DEFAULT_POLICY_ID] {
        Filter::MeanStd(f) => f.buffer().count(),
        Filter::NoFilter => 0,
    }
}

#[test]
fn train_fills_bookkeeping_and_logs() {
    let dir = tempdir().unwrap();
    let mut agent = pg_agent(
        dir.path(),
        json!({"sample_batch_size": 25, "train_batch_size": 50, "seed": 0}),
    );
    let first = agent.train().unwrap();
    let second = agent.train().unwrap();
    assert_eq!(first.training_iteration, 1);
    assert_eq!(second.training_iteration, 2);
    assert_eq!(second.timesteps_total, 100);
    assert_eq!(second.config["sample_batch_size"], json!(25));
    assert_eq!(agent.iteration(), 2);

    let results = fs::read_to_string(agent.logdir().join("result.json")).unwrap();
    assert_eq!(results.lines().count(), 2);
    assert!(agent.logdir().join("params.json").is_file());
    agent.stop();
}

#[test]
fn global_vars_reach_remotes() {
    let dir = tempdir().unwrap();
    let mut agent = pg_agent(
        dir.path(),
        json!({"num_workers": 2, "sample_batch_size": 20, "train_batch_size": 40}),
    );
    agent.train().unwrap();
    assert_eq!(agent.global_vars().timestep, 0);
    agent.train().unwrap();
    assert_eq!(agent.global_vars().timestep, 40);

    let evaluators = agent.algorithm().sync_optimizer().evaluators();
    assert_eq!(evaluators.local.get_global_vars().timestep, 40);
    for remote in &evaluators.remotes {
        let global_vars = remote.get_global_vars().unwrap().get().unwrap();
        assert_eq!(global_vars.timestep, 40);
    }
    agent.stop();
}

#[test]
fn filters_synchronized_across_workers() {
    let dir = tempdir().unwrap();
    let mut agent = pg_agent(
        dir.path(),
        json!({
            "num_workers": 2,
            "sample_batch_size": 20,
            "train_batch_size": 40,
            "observation_filter": "MeanStdFilter",
        }),
    );
    agent.train().unwrap();
    let local = agent.local_evaluator().unwrap();
    assert_eq!(filter_count(local.filters()), 0);

    agent.train().unwrap();
    let local_count = filter_count(agent.local_evaluator().unwrap().filters());
    assert!(local_count > 0);
    for remote in &agent.algorithm().sync_optimizer().evaluators().remotes {
        let remote_filters = remote.get_filters(false).unwrap().get().unwrap();
        // Synced totals plus the samples of the second iteration
        assert!(filter_count(&remote_filters) > local_count);
    }
    agent.stop();
}

#[test]
fn unsynchronized_filters_stay_local() {
    let dir = tempdir().unwrap();
    let mut agent = pg_agent(
        dir.path(),
        json!({
            "num_workers": 2,
            "sample_batch_size": 20,
            "train_batch_size": 40,
            "observation_filter": "MeanStdFilter",
            "synchronize_filters": false,
        }),
    );
    agent.train().unwrap();
    let first_counts: Vec<u64> = agent
        .algorithm()
        .sync_optimizer()
        .evaluators()
        .remotes
        .iter()
        .map(|remote| filter_count(&remote.get_filters(false).unwrap().get().unwrap()))
        .collect();

    agent.train().unwrap();
    let local_count = filter_count(agent.local_evaluator().unwrap().filters());
    assert_eq!(local_count, first_counts.iter().sum::<u64>());
    let remotes = &agent.algorithm().sync_optimizer().evaluators().remotes;
    for (remote, first_count) in remotes.iter().zip(first_counts) {
        let filters = remote.get_filters(false).unwrap().get().unwrap();
        // Only the remote's own history precedes the unflushed second-iteration samples
        assert_eq!(filter_count(&filters) - buffer_count(&filters), first_count);
    }
    agent.stop();
}

#[test]
fn checkpoint_round_trip() {
    let config = json!({
        "num_workers": 1,
        "sample_batch_size": 20,
        "train_batch_size": 20,
        "observation_filter": "MeanStdFilter",
    });
    let dir = tempdir().unwrap();
    let mut agent = pg_agent(dir.path(), config.clone());
    agent.train().unwrap();
    agent.train().unwrap();
    let filters = agent.local_evaluator().unwrap().filters().clone();
    let checkpoint_dir = dir.path().join("checkpoints");
    let path = agent.save(Some(&checkpoint_dir)).unwrap();
    assert_eq!(path, checkpoint_dir.join("checkpoint-2"));
    let weights = agent.get_weights(None).unwrap();
    agent.stop();

    let restored_dir = tempdir().unwrap();
    let mut restored = pg_agent(restored_dir.path(), config);
    restored.restore(&path).unwrap();
    assert_eq!(restored.iteration(), 2);
    assert_eq!(restored.progress().timesteps_total, 40);
    assert_eq!(restored.get_weights(None).unwrap(), weights);
    assert_eq!(restored.local_evaluator().unwrap().filters(), &filters);
    let optimizer = restored.algorithm().sync_optimizer();
    assert_eq!(optimizer.num_steps_sampled(), 40);

    let remote = &optimizer.evaluators().remotes[0];
    assert_eq!(remote.get_weights(None).unwrap().get().unwrap(), weights);
    assert_eq!(remote.get_filters(false).unwrap().get().unwrap(), filters);

    let result = restored.train().unwrap();
    assert_eq!(result.training_iteration, 3);
    assert_eq!(result.timesteps_total, 60);
    restored.stop();
}

#[test]
fn callback_sees_agent_and_result() {
    let calls = Arc::new(AtomicU64::new(0));
    let seen = Arc::clone(&calls);
    let dir = tempdir().unwrap();
    let mut agent = Agent::<PolicyGradient>::builder()
        .config(config_from_json(
            json!({"sample_batch_size": 10, "train_batch_size": 10}),
        ))
        .env("CartPole-v0")
        .logdir(dir.path())
        .on_train_result(move |agent, result| {
            assert_eq!(agent.iteration(), result.training_iteration);
            seen.fetch_add(1, Ordering::SeqCst);
        })
        .build()
        .unwrap();
    agent.train().unwrap();
    agent.train().unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn compute_action_with_and_without_state() {
    let dir = tempdir().unwrap();
    let mut agent = pg_agent(dir.path(), json!({}));
    let observation = Array1::zeros(4);
    match agent
        .compute_action(&observation, &[], DEFAULT_POLICY_ID)
        .unwrap()
    {
        ComputedAction::Action(Action::Discrete(a)) => assert!(a < 2),
        other => panic!("unexpected output {:?}", other),
    }

    let state = vec![Array1::zeros(3)];
    match agent
        .compute_action(&observation, &state, DEFAULT_POLICY_ID)
        .unwrap()
    {
        ComputedAction::Full(output) => {
            assert_eq!(output.state, state);
            assert!(output.extra.contains_key("logits"));
        }
        other => panic!("unexpected output {:?}", other),
    }
    assert!(agent
        .compute_action(&observation, &[], "missing")
        .is_err());
    assert!(matches!(
        agent.compute_action(&Array1::zeros(3), &[], DEFAULT_POLICY_ID),
        Err(AgentError::Evaluator(EvaluatorError::ObservationShape {
            expected: 4,
            actual: 3
        }))
    ));
}

#[test]
fn set_weights_round_trip() {
    let dir = tempdir().unwrap();
    let mut agent = pg_agent(dir.path(), json!({}));
    let mut weights = agent.get_weights(None).unwrap();
    for w in weights.values_mut() {
        w.fill(0.5);
    }
    agent.set_weights(&weights).unwrap();
    assert_eq!(agent.get_weights(None).unwrap(), weights);
}

#[test]
fn multiagent_policy_graphs_replace_default() {
    let dir = tempdir().unwrap();
    let mut agent = Agent::<PolicyGradient>::builder()
        .config(config_from_json(json!({
            "sample_batch_size": 30,
            "train_batch_size": 30,
            "multiagent": {"policies_to_train": ["b"]},
        })))
        .env("CartPole-v0")
        .logdir(dir.path())
        .policy_graph("a", PolicyGraph::new(LinearPolicy::factory()))
        .policy_graph("b", PolicyGraph::new(LinearPolicy::factory()))
        .policy_mapping_fn(|_| "b".to_string())
        .build()
        .unwrap();
    let local = agent.local_evaluator().unwrap();
    assert_eq!(local.policy_ids().collect::<Vec<_>>(), vec!["a", "b"]);
    assert_eq!(local.sampling_policy(), "b");

    agent.train().unwrap();
    let weights = agent.get_weights(None).unwrap();
    assert!(weights["a"].iter().all(|w| *w == 0.0));
    assert!(weights["b"].iter().any(|w| *w != 0.0));
}

#[test]
fn monitor_writes_to_logdir() {
    let dir = tempdir().unwrap();
    let mut agent = pg_agent(
        dir.path(),
        json!({"monitor": true, "sample_batch_size": 50, "train_batch_size": 50}),
    );
    agent.train().unwrap();
    assert!(agent
        .logdir()
        .join("monitor")
        .join("episodes-worker0.json")
        .is_file());
}

#[test]
fn default_logdir_under_results_dir() {
    let root = tempdir().unwrap();
    std::env::set_var(rlagent::logging::RESULTS_DIR_ENV, root.path());
    let agent = Agent::<PolicyGradient>::builder()
        .env("CartPole-v0")
        .build()
        .unwrap();
    assert!(agent.logdir().starts_with(root.path()));
    let name = agent.logdir().file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("PG_CartPole-v0_"));
}
