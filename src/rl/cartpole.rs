//! Cart-pole balancing task.
//!
//! Classic Barto, Sutton and Anderson dynamics integrated with semi-implicit
//! Euler. Observation is `[x, x_dot, theta, theta_dot]`; the episode ends
//! when the cart leaves `±2.4` or the pole tilts past `±12°`. Every step
//! yields a reward of 1.

use rand::{Rng, RngCore};

use super::env::{Environment, StepOutcome};

const X_THRESHOLD: f32 = 2.4;
const THETA_THRESHOLD_RADIANS: f32 = 12.0 * 2.0 * std::f32::consts::PI / 360.0;
const CART_MASS: f32 = 1.0;
const POLE_MASS: f32 = 0.1;
const TOTAL_MASS: f32 = CART_MASS + POLE_MASS;
/// Half the pole's length.
const POLE_LENGTH: f32 = 0.5;
const GRAVITY: f32 = 9.8;
/// Integration step in seconds.
const TAU: f32 = 0.02;
const RESET_RANGE: f32 = 0.05;

/// Cart-pole environment.
#[derive(Debug, Clone)]
pub struct CartPole {
    force_magnitude: f32,
    continuous: bool,
    x: f32,
    x_dot: f32,
    theta: f32,
    theta_dot: f32,
    steps: usize,
}

impl Default for CartPole {
    /// Discrete actions, force magnitude 10.
    fn default() -> Self {
        Self::new(10.0, false)
    }
}

impl CartPole {
    /// Creates the environment.
    ///
    /// With `continuous`, the applied force is `action * force_magnitude`.
    /// Otherwise an action above 0.5 pushes right with `force_magnitude` and
    /// anything else pushes left.
    pub fn new(force_magnitude: f32, continuous: bool) -> Self {
        Self {
            force_magnitude,
            continuous,
            x: 0.0,
            x_dot: 0.0,
            theta: 0.0,
            theta_dot: 0.0,
            steps: 0,
        }
    }

    /// Current `[x, x_dot, theta, theta_dot]`.
    pub fn state(&self) -> [f32; 4] {
        [self.x, self.x_dot, self.theta, self.theta_dot]
    }

    /// Steps taken since the last reset.
    pub fn steps(&self) -> usize {
        self.steps
    }

    fn write_obs(&self, obs: &mut [f32]) {
        obs[..4].copy_from_slice(&self.state());
    }

    fn force(&self, action: f32) -> f32 {
        if self.continuous {
            action * self.force_magnitude
        } else if action > 0.5 {
            self.force_magnitude
        } else {
            -self.force_magnitude
        }
    }
}

impl Environment for CartPole {
    fn obs_dim(&self) -> usize {
        4
    }

    fn act_dim(&self) -> usize {
        1
    }

    fn reset(&mut self, rng: &mut dyn RngCore, obs: &mut [f32]) {
        self.x = rng.gen_range(-RESET_RANGE..RESET_RANGE);
        self.x_dot = rng.gen_range(-RESET_RANGE..RESET_RANGE);
        self.theta = rng.gen_range(-RESET_RANGE..RESET_RANGE);
        self.theta_dot = rng.gen_range(-RESET_RANGE..RESET_RANGE);
        self.steps = 0;
        self.write_obs(obs);
    }

    fn step(&mut self, action: &[f32], obs: &mut [f32]) -> StepOutcome {
        let force = self.force(action[0]);
        let (sin_theta, cos_theta) = self.theta.sin_cos();

        let temp = (force + POLE_MASS * POLE_LENGTH * self.theta_dot * self.theta_dot * sin_theta)
            / TOTAL_MASS;
        let theta_acc = (GRAVITY * sin_theta - cos_theta * temp)
            / (POLE_LENGTH * (4.0 / 3.0 - POLE_MASS * cos_theta * cos_theta / TOTAL_MASS));
        let x_acc = temp - POLE_LENGTH * POLE_MASS * theta_acc * cos_theta / TOTAL_MASS;

        // velocities first, then positions with the new velocities
        self.x_dot += TAU * x_acc;
        self.x += TAU * self.x_dot;
        self.theta_dot += TAU * theta_acc;
        self.theta += TAU * self.theta_dot;
        self.steps += 1;

        self.write_obs(obs);

        let done = self.x < -X_THRESHOLD
            || self.x > X_THRESHOLD
            || self.theta < -THETA_THRESHOLD_RADIANS
            || self.theta > THETA_THRESHOLD_RADIANS;

        StepOutcome { reward: 1.0, done }
    }
}
