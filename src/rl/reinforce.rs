//! REINFORCE policy gradient.

use rand::RngCore;

use super::buffer::{discounted_returns, mean_return, rollout, ExperienceBuffer};
use super::env::Environment;
use super::policy::Policy;
use crate::cache::ForwardCache;
use crate::error::{RlnetError, RlnetResult};
use crate::network::Network;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Rollout settings for [`reinforce_step`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReinforceConfig {
    /// Step limit per episode.
    pub max_steps: usize,

    /// Episodes per gradient estimate.
    pub episodes: usize,

    /// Discount factor.
    pub gamma: f32,
}

impl Default for ReinforceConfig {
    fn default() -> Self {
        Self {
            max_steps: 500,
            episodes: 1,
            gamma: 0.99,
        }
    }
}

/// Collects a fresh trajectory and accumulates the REINFORCE gradient of
/// `L = -mean_t(log π(a_t | s_t) · G_t)` into `network`.
///
/// `cache` is emptied, filled by the rollout one step at a time and then
/// consumed by a single backward pass; the logits come from its output
/// mirror, so nothing is recomputed. Gradients are accumulated, not
/// replaced: zero them before the call and run an optimizer step after it.
///
/// Returns the mean episode return of the trajectory.
pub fn reinforce_step<E, P>(
    env: &mut E,
    network: &mut Network,
    policy: &P,
    buffer: &mut ExperienceBuffer,
    cache: &mut ForwardCache,
    config: &ReinforceConfig,
    rng: &mut dyn RngCore,
) -> RlnetResult<f32>
where
    E: Environment + ?Sized,
    P: Policy + ?Sized,
{
    cache.empty();
    let steps = rollout(
        env,
        network,
        policy,
        buffer,
        cache,
        config.max_steps,
        config.episodes,
        rng,
    )?;
    if steps == 0 {
        return Err(RlnetError::EmptyCache);
    }

    let returns = discounted_returns(buffer, config.gamma);
    let act_dim = buffer.act_dim();

    let mut out_grad = vec![0.0f32; cache.output().len()];
    policy.log_prob(cache.output(), buffer.actions(), None, Some(&mut out_grad))?;

    let scale = -1.0 / steps as f32;
    for (row, &g_t) in out_grad.chunks_exact_mut(act_dim).zip(&returns) {
        for g in row {
            *g *= scale * g_t;
        }
    }

    network.backward(cache, &out_grad)?;

    let mean = mean_return(buffer);
    log::debug!("REINFORCE over {} steps, mean return {:.2}", steps, mean);
    Ok(mean)
}
