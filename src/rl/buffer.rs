//! Trajectory storage, rollouts and returns.

use rand::RngCore;

use super::env::Environment;
use super::policy::Policy;
use crate::cache::ForwardCache;
use crate::error::{RlnetError, RlnetResult};
use crate::network::Network;

/// Fixed-capacity record of transitions, one row per environment step.
#[derive(Debug, Clone)]
pub struct ExperienceBuffer {
    capacity: usize,
    obs_dim: usize,
    act_dim: usize,
    len: usize,
    /// `[capacity × obs_dim]`, the observation each action was taken from.
    observations: Vec<f32>,
    /// `[capacity × act_dim]`
    actions: Vec<f32>,
    rewards: Vec<f32>,
    dones: Vec<bool>,
}

impl ExperienceBuffer {
    /// Creates an empty buffer for `capacity` steps.
    pub fn new(capacity: usize, obs_dim: usize, act_dim: usize) -> Self {
        Self {
            capacity,
            obs_dim,
            act_dim,
            len: 0,
            observations: vec![0.0; capacity * obs_dim],
            actions: vec![0.0; capacity * act_dim],
            rewards: vec![0.0; capacity],
            dones: vec![false; capacity],
        }
    }

    /// Recorded steps.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if no step is recorded.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True once `len() == capacity()`.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.len == self.capacity
    }

    /// Maximum number of steps.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Observation width.
    #[inline]
    pub fn obs_dim(&self) -> usize {
        self.obs_dim
    }

    /// Action width.
    #[inline]
    pub fn act_dim(&self) -> usize {
        self.act_dim
    }

    /// Recorded observations, `[len × obs_dim]`.
    pub fn observations(&self) -> &[f32] {
        &self.observations[..self.len * self.obs_dim]
    }

    /// Recorded actions, `[len × act_dim]`.
    pub fn actions(&self) -> &[f32] {
        &self.actions[..self.len * self.act_dim]
    }

    /// Recorded rewards, one per step.
    pub fn rewards(&self) -> &[f32] {
        &self.rewards[..self.len]
    }

    /// Episode-end flags. A `true` at `t` means step `t` was the last of its
    /// episode.
    pub fn dones(&self) -> &[bool] {
        &self.dones[..self.len]
    }

    /// Appends one transition. A full buffer rejects it with `CacheOverflow`.
    pub fn push(&mut self, obs: &[f32], action: &[f32], reward: f32, done: bool) -> RlnetResult<()> {
        if obs.len() != self.obs_dim || action.len() != self.act_dim {
            return Err(RlnetError::shape_mismatch(
                &[self.obs_dim, self.act_dim],
                &[obs.len(), action.len()],
            ));
        }
        if self.is_full() {
            return Err(RlnetError::cache_overflow(1, 0));
        }

        let t = self.len;
        self.observations[t * self.obs_dim..(t + 1) * self.obs_dim].copy_from_slice(obs);
        self.actions[t * self.act_dim..(t + 1) * self.act_dim].copy_from_slice(action);
        self.rewards[t] = reward;
        self.dones[t] = done;
        self.len += 1;
        Ok(())
    }

    /// Forgets every transition.
    pub fn clear(&mut self) {
        self.len = 0;
    }
}

/// Plays `episodes` episodes of at most `max_steps` steps each, recording
/// every transition in `buffer` and every forward pass in `cache`.
///
/// The buffer is cleared first. Observations are fed through the network one
/// at a time, each forward appending a row to `cache`; starting from an empty
/// cache, it ends up holding exactly one row per recorded step, ready for a
/// single backward pass. An episode is cut short (marked done) when it
/// reaches `max_steps` or when the buffer fills up; a full buffer also ends
/// the rollout.
///
/// Returns the number of recorded steps.
///
/// # Errors
///
/// `CacheOverflow` if `cache` can't hold a full buffer, and shape errors if
/// the environment, network and buffer widths don't agree.
#[allow(clippy::too_many_arguments)]
pub fn rollout<E, P>(
    env: &mut E,
    network: &Network,
    policy: &P,
    buffer: &mut ExperienceBuffer,
    cache: &mut ForwardCache,
    max_steps: usize,
    episodes: usize,
    rng: &mut dyn RngCore,
) -> RlnetResult<usize>
where
    E: Environment + ?Sized,
    P: Policy + ?Sized,
{
    if env.obs_dim() != buffer.obs_dim() || env.act_dim() != buffer.act_dim() {
        return Err(RlnetError::shape_mismatch(
            &[buffer.obs_dim(), buffer.act_dim()],
            &[env.obs_dim(), env.act_dim()],
        ));
    }
    if cache.remaining() < buffer.capacity() {
        return Err(RlnetError::cache_overflow(
            buffer.capacity(),
            cache.remaining(),
        ));
    }

    buffer.clear();
    let mut obs = vec![0.0f32; env.obs_dim()];
    let mut next_obs = vec![0.0f32; env.obs_dim()];
    let mut action = vec![0.0f32; env.act_dim()];

    for _ in 0..episodes {
        if buffer.is_full() || max_steps == 0 {
            break;
        }
        env.reset(rng, &mut obs);

        for step in 0.. {
            let logits = network.forward(&obs, Some(&mut *cache))?;
            policy.sample(&logits, rng, &mut action)?;

            let outcome = env.step(&action, &mut next_obs);
            let done = outcome.done
                || step + 1 >= max_steps
                || buffer.len() + 1 == buffer.capacity();
            buffer.push(&obs, &action, outcome.reward, done)?;

            std::mem::swap(&mut obs, &mut next_obs);
            if done {
                break;
            }
        }
    }

    log::debug!("Rollout recorded {} steps", buffer.len());
    Ok(buffer.len())
}

/// Discounted returns `G_t = r_t + γ·G_{t+1}`, restarting at every episode
/// end.
pub fn discounted_returns(buffer: &ExperienceBuffer, gamma: f32) -> Vec<f32> {
    let mut returns = vec![0.0f32; buffer.len()];
    let mut running = 0.0f32;
    for t in (0..buffer.len()).rev() {
        if buffer.dones()[t] {
            running = 0.0;
        }
        running = buffer.rewards()[t] + gamma * running;
        returns[t] = running;
    }
    returns
}

/// Mean undiscounted return over the completed episodes in `buffer`.
///
/// If no episode finished, the partial return of the unfinished one is used.
pub fn mean_return(buffer: &ExperienceBuffer) -> f32 {
    let mut total = 0.0f32;
    let mut episodes = 0usize;
    let mut running = 0.0f32;

    for (&r, &done) in buffer.rewards().iter().zip(buffer.dones()) {
        running += r;
        if done {
            total += running;
            running = 0.0;
            episodes += 1;
        }
    }

    if episodes == 0 {
        return running;
    }
    total / episodes as f32
}
