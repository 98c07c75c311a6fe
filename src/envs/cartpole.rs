use super::{Action, BuildEnvError, EnvConfig, EnvError, EnvStep, Environment, Observation, Space};
use crate::Prng;
use ndarray::array;
use rand::distributions::{Distribution, Uniform};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Parameters of the [`CartPole`] environment.
///
/// Read from the `env_config` mapping; missing fields take their defaults.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CartPoleConfig {
    /// Downward acceleration of gravity (m/s^2)
    pub gravity: f64,
    /// Mass of the cart (kg)
    pub mass_cart: f64,
    /// Mass of the pole (kg)
    pub mass_pole: f64,
    /// Half the length of the pole (m)
    pub half_pole_length: f64,
    /// Magnitude of the force (N) applied by each action.
    pub force_mag: f64,
    /// Integration time step (s)
    pub tau: f64,
    /// Cart distance from the center (m) at which the episode fails.
    pub x_threshold: f64,
    /// Pole angle from vertical (radians) at which the episode fails.
    pub theta_threshold: f64,
}

impl Default for CartPoleConfig {
    fn default() -> Self {
        Self {
            gravity: 9.8,
            mass_cart: 1.0,
            mass_pole: 0.1,
            half_pole_length: 0.5,
            force_mag: 10.0,
            tau: 0.02,
            x_threshold: 2.4,
            theta_threshold: 12.0_f64.to_radians(),
        }
    }
}

/// Cart position, cart velocity, pole angle and pole angular velocity.
#[derive(Debug, Copy, Clone, PartialEq)]
struct CartPoleState {
    x: f64,
    x_dot: f64,
    theta: f64,
    theta_dot: f64,
}

impl CartPoleState {
    fn observe(&self) -> Observation {
        array![self.x, self.x_dot, self.theta, self.theta_dot]
    }
}

/// Classic frictionless cart-pole balancing task.
///
/// A pole is hinged on top of a cart moving along a track.
/// Action 0 pushes the cart left and action 1 pushes it right.
/// Every step yields a reward of 1 until the pole falls past `theta_threshold`,
/// the cart leaves the track or the step limit is reached.
///
/// Uses the Barto, Sutton & Anderson (1983) dynamics with explicit Euler integration,
/// matching the `CartPole-v0` and `CartPole-v1` benchmark tasks.
#[derive(Debug, Clone, PartialEq)]
pub struct CartPole {
    config: CartPoleConfig,
    max_episode_steps: usize,
    state: Option<CartPoleState>,
    elapsed_steps: usize,
}

impl CartPole {
    pub const fn new(config: CartPoleConfig, max_episode_steps: usize) -> Self {
        Self {
            config,
            max_episode_steps,
            state: None,
            elapsed_steps: 0,
        }
    }

    /// Build from an `env_config` mapping with the given episode step limit.
    pub fn from_config(
        max_episode_steps: usize,
        config: &EnvConfig,
    ) -> Result<Self, BuildEnvError> {
        let config = CartPoleConfig::deserialize(Value::Object(config.clone()))?;
        Ok(Self::new(config, max_episode_steps))
    }

    pub const fn config(&self) -> &CartPoleConfig {
        &self.config
    }

    fn dynamics(&self, s: &CartPoleState, force: f64) -> CartPoleState {
        let c = &self.config;
        let total_mass = c.mass_cart + c.mass_pole;
        let pole_mass_length = c.mass_pole * c.half_pole_length;
        let (sin_theta, cos_theta) = s.theta.sin_cos();

        let temp =
            (force + pole_mass_length * s.theta_dot * s.theta_dot * sin_theta) / total_mass;
        let theta_acc = (c.gravity * sin_theta - cos_theta * temp)
            / (c.half_pole_length
                * (4.0 / 3.0 - c.mass_pole * cos_theta * cos_theta / total_mass));
        let x_acc = temp - pole_mass_length * theta_acc * cos_theta / total_mass;

        CartPoleState {
            x: s.x + c.tau * s.x_dot,
            x_dot: s.x_dot + c.tau * x_acc,
            theta: s.theta + c.tau * s.theta_dot,
            theta_dot: s.theta_dot + c.tau * theta_acc,
        }
    }

    fn failed(&self, s: &CartPoleState) -> bool {
        s.x.abs() > self.config.x_threshold || s.theta.abs() > self.config.theta_threshold
    }
}

impl Environment for CartPole {
    fn observation_space(&self) -> Space {
        // Twice the failure thresholds so that failing observations are still in bounds
        let x = 2.0 * self.config.x_threshold;
        let theta = 2.0 * self.config.theta_threshold;
        Space::Box {
            low: array![-x, f64::MIN, -theta, f64::MIN],
            high: array![x, f64::MAX, theta, f64::MAX],
        }
    }

    fn action_space(&self) -> Space {
        Space::Discrete(2)
    }

    fn reset(&mut self, rng: &mut Prng) -> Observation {
        let dist = Uniform::new_inclusive(-0.05, 0.05);
        let state = CartPoleState {
            x: dist.sample(rng),
            x_dot: dist.sample(rng),
            theta: dist.sample(rng),
            theta_dot: dist.sample(rng),
        };
        self.state = Some(state);
        self.elapsed_steps = 0;
        state.observe()
    }

    fn step(&mut self, action: &Action, _: &mut Prng) -> Result<EnvStep, EnvError> {
        let force = match action {
            Action::Discrete(0) => -self.config.force_mag,
            Action::Discrete(1) => self.config.force_mag,
            _ => {
                return Err(EnvError::InvalidAction {
                    action: action.clone(),
                    space: self.action_space(),
                })
            }
        };
        let state = self.state.take().ok_or(EnvError::EpisodeDone)?;
        let next = self.dynamics(&state, force);
        self.elapsed_steps += 1;
        let done = self.failed(&next) || self.elapsed_steps >= self.max_episode_steps;
        if !done {
            self.state = Some(next);
        }
        Ok(EnvStep {
            observation: next.observe(),
            reward: 1.0,
            done,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rstest::rstest;

    fn cartpole(max_episode_steps: usize) -> CartPole {
        CartPole::new(CartPoleConfig::default(), max_episode_steps)
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    fn constant_push_fails_early(#[case] action: usize) {
        let mut env = cartpole(500);
        let mut rng = Prng::seed_from_u64(0);
        assert_eq!(env.reset(&mut rng).len(), 4);

        let mut steps = 0;
        loop {
            let step = env.step(&Action::Discrete(action), &mut rng).unwrap();
            steps += 1;
            assert_eq!(step.reward, 1.0);
            if step.done {
                break;
            }
        }
        assert!(steps < 100);
        assert!(matches!(
            env.step(&Action::Discrete(action), &mut rng),
            Err(EnvError::EpisodeDone)
        ));
    }

    #[test]
    fn push_right_accelerates_right() {
        let env = cartpole(10);
        let rest = CartPoleState {
            x: 0.0,
            x_dot: 0.0,
            theta: 0.0,
            theta_dot: 0.0,
        };
        let next = env.dynamics(&rest, 10.0);
        // Positions move with the previous velocities
        assert_eq!(next.x, 0.0);
        assert!(next.x_dot > 0.0);
        assert!(next.theta_dot < 0.0);
    }

    #[test]
    fn step_limit_ends_episode() {
        let mut env = cartpole(3);
        let mut rng = Prng::seed_from_u64(1);
        env.reset(&mut rng);
        let dones: Vec<bool> = (0..3)
            .map(|i| env.step(&Action::Discrete(i % 2), &mut rng).unwrap().done)
            .collect();
        assert_eq!(dones, vec![false, false, true]);
    }

    #[test]
    fn invalid_action_keeps_episode() {
        let mut env = cartpole(10);
        let mut rng = Prng::seed_from_u64(2);
        env.reset(&mut rng);
        assert!(matches!(
            env.step(&Action::Discrete(2), &mut rng),
            Err(EnvError::InvalidAction { .. })
        ));
        assert!(env.step(&Action::Discrete(0), &mut rng).is_ok());
    }

    #[test]
    fn config_overrides() {
        let config = serde_json::json!({"force_mag": 5.0});
        let env = CartPole::from_config(200, config.as_object().unwrap()).unwrap();
        assert_eq!(env.config().force_mag, 5.0);
        assert_eq!(env.config().x_threshold, 2.4);
    }
}
