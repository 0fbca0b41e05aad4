//! Environment contract for rollouts.

use rand::RngCore;

/// Result of one environment transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    /// Reward for the transition.
    pub reward: f32,
    /// True if the episode terminated.
    pub done: bool,
}

/// A simulated environment with fixed observation and action widths.
pub trait Environment {
    /// Observation width.
    fn obs_dim(&self) -> usize;

    /// Action width.
    fn act_dim(&self) -> usize;

    /// Starts a new episode and writes the first observation into `obs`.
    fn reset(&mut self, rng: &mut dyn RngCore, obs: &mut [f32]);

    /// Applies `action` and writes the next observation into `obs`.
    fn step(&mut self, action: &[f32], obs: &mut [f32]) -> StepOutcome;
}
