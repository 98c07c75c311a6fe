//! Linear softmax policy
use super::{LearnerStats, Policy, PolicyError, PolicyFactory, PolicyOutput, PolicySpec, Weights};
use crate::config::Config;
use crate::envs::{Action, Observation, Space};
use crate::evaluation::GlobalVars;
use crate::sampler::SampleBatch;
use crate::Prng;
use ndarray::{s, Array1, Array2, ArrayView1, Axis};
use rand::distributions::{Distribution, WeightedIndex};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::panic;
use std::sync::Arc;

/// Softmax policy over discrete actions with logits linear in the observation.
///
/// Trained with REINFORCE on the discounted return of each trajectory fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearPolicy {
    /// Row `a` holds the observation weights of action `a` followed by its bias.
    weights: Array2<f64>,
    pub gamma: f64,
    pub lr: f64,
    /// Number of threads used to compute gradients.
    pub num_threads: usize,
    timestep: u64,
}

impl LinearPolicy {
    pub fn new(observation_dim: usize, num_actions: usize, gamma: f64, lr: f64) -> Self {
        Self {
            weights: Array2::zeros((num_actions, observation_dim + 1)),
            gamma,
            lr,
            num_threads: 1,
            timestep: 0,
        }
    }

    /// Build from the evaluator-supplied spec.
    ///
    /// Reads `gamma` and `lr` from the config and the thread count from the session.
    pub fn from_spec(spec: PolicySpec) -> Result<Self, PolicyError> {
        let num_actions = match spec.action_space {
            Space::Discrete(n) => *n,
            space => {
                return Err(PolicyError::UnsupportedSpace {
                    kind: "action",
                    space: space.clone(),
                })
            }
        };
        let mut policy = Self::new(
            spec.observation_dim,
            num_actions,
            float_option(spec.config, "gamma", 0.99)?,
            float_option(spec.config, "lr", 0.01)?,
        );
        policy.num_threads = spec.session.map_or(1, |session| session.num_threads());
        Ok(policy)
    }

    /// Thread-safe constructor for use in policy graphs.
    pub fn factory() -> PolicyFactory {
        Arc::new(
            |spec: PolicySpec<'_>| -> Result<Box<dyn Policy>, PolicyError> {
                Ok(Box::new(Self::from_spec(spec)?))
            },
        )
    }

    pub fn num_actions(&self) -> usize {
        self.weights.nrows()
    }

    /// Timestep of the most recent global variable update.
    pub const fn timestep(&self) -> u64 {
        self.timestep
    }

    /// Action probabilities for an observation.
    pub fn action_probs(&self, observation: &Observation) -> Array1<f64> {
        softmax(&self.logits(observation.view()))
    }

    fn logits(&self, observation: ArrayView1<f64>) -> Array1<f64> {
        let dim = self.weights.ncols() - 1;
        self.weights.slice(s![.., ..dim]).dot(&observation) + self.weights.column(dim)
    }

    /// Sum of the return-weighted log-likelihood gradients and the summed loss.
    fn gradient(
        &self,
        observations: &[Observation],
        actions: &[usize],
        advantages: &[f64],
    ) -> (Array2<f64>, f64) {
        let dim = self.weights.ncols() - 1;
        let mut grad = Array2::zeros(self.weights.raw_dim());
        let mut loss = 0.0;
        for ((observation, &action), &advantage) in observations.iter().zip(actions).zip(advantages)
        {
            let probs = softmax(&self.logits(observation.view()));
            loss -= advantage * probs[action].max(f64::MIN_POSITIVE).ln();
            for (k, mut row) in grad.axis_iter_mut(Axis(0)).enumerate() {
                let indicator = if k == action { 1.0 } else { 0.0 };
                let coef = advantage * (indicator - probs[k]);
                row.slice_mut(s![..dim]).scaled_add(coef, observation);
                row[dim] += coef;
            }
        }
        (grad, loss)
    }
}

impl fmt::Display for LinearPolicy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "LinearPolicy({}x{}, gamma={}, lr={})",
            self.weights.nrows(),
            self.weights.ncols() - 1,
            self.gamma,
            self.lr
        )
    }
}

impl Policy for LinearPolicy {
    fn compute_single_action(
        &mut self,
        observation: &Observation,
        state: &[Array1<f64>],
        rng: &mut Prng,
    ) -> PolicyOutput {
        let logits = self.logits(observation.view());
        let probs = softmax(&logits);
        // Softmax weights are finite and positive.
        let action = WeightedIndex::new(&probs).map_or(0, |dist| dist.sample(rng));
        let mut extra = BTreeMap::new();
        extra.insert("logits".to_string(), logits);
        PolicyOutput {
            action: Action::Discrete(action),
            state: state.to_vec(),
            extra,
        }
    }

    fn postprocess_trajectory(&self, batch: &mut SampleBatch) {
        let mut advantages = vec![0.0; batch.rewards.len()];
        let mut discounted_return = 0.0;
        for (advantage, reward) in advantages.iter_mut().zip(&batch.rewards).rev() {
            discounted_return = reward + self.gamma * discounted_return;
            *advantage = discounted_return;
        }
        batch.advantages = advantages;
    }

    fn learn_on_batch(&mut self, batch: &SampleBatch) -> Result<LearnerStats, PolicyError> {
        let num_steps = batch.len();
        if batch.advantages.len() != num_steps {
            return Err(PolicyError::InvalidBatch(format!(
                "expected {} advantages, got {}",
                num_steps,
                batch.advantages.len()
            )));
        }
        let num_actions = self.num_actions();
        let actions = batch
            .actions
            .iter()
            .map(|action| match action {
                Action::Discrete(a) if *a < num_actions => Ok(*a),
                _ => Err(PolicyError::InvalidBatch(format!(
                    "action {:?} is not one of {} discrete actions",
                    action, num_actions
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut stats = LearnerStats::new();
        stats.insert("cur_lr".into(), self.lr);
        if num_steps == 0 {
            stats.insert("policy_loss".into(), 0.0);
            return Ok(stats);
        }

        let num_threads = self.num_threads.clamp(1, num_steps);
        let chunk_size = (num_steps + num_threads - 1) / num_threads;
        let this = &*self;
        let partials: Vec<(Array2<f64>, f64)> = crossbeam::scope(|scope| {
            let threads: Vec<_> = batch
                .obs
                .chunks(chunk_size)
                .zip(actions.chunks(chunk_size))
                .zip(batch.advantages.chunks(chunk_size))
                .map(|((obs, acts), advs)| scope.spawn(move |_| this.gradient(obs, acts, advs)))
                .collect();
            threads
                .into_iter()
                .map(|t| t.join().unwrap_or_else(|e| panic::resume_unwind(e)))
                .collect()
        })
        .unwrap_or_else(|e| panic::resume_unwind(e));

        let mut grad = Array2::zeros(self.weights.raw_dim());
        let mut loss = 0.0;
        for (partial_grad, partial_loss) in partials {
            grad += &partial_grad;
            loss += partial_loss;
        }
        #[allow(clippy::cast_precision_loss)]
        let scale = (num_steps as f64).recip();
        self.weights.scaled_add(self.lr * scale, &grad);
        stats.insert("policy_loss".into(), loss * scale);
        Ok(stats)
    }

    fn get_weights(&self) -> Weights {
        self.weights.iter().copied().collect()
    }

    fn set_weights(&mut self, weights: &Weights) -> Result<(), PolicyError> {
        let expected = self.weights.len();
        if weights.len() != expected {
            return Err(PolicyError::WeightShape {
                expected,
                actual: weights.len(),
            });
        }
        self.weights
            .iter_mut()
            .zip(weights)
            .for_each(|(w, v)| *w = *v);
        Ok(())
    }

    fn on_global_var_update(&mut self, global_vars: &GlobalVars) {
        self.timestep = global_vars.timestep;
    }
}

fn softmax(logits: &Array1<f64>) -> Array1<f64> {
    let max = logits.fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    let exp = logits.mapv(|v| (v - max).exp());
    let total = exp.sum();
    exp / total
}

fn float_option(config: &Config, key: &str, default: f64) -> Result<f64, PolicyError> {
    match config.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(value) => value
            .as_f64()
            .ok_or_else(|| PolicyError::InvalidConfig(format!("`{}` must be a number", key))),
    }
}
