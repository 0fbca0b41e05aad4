//! Action distributions parameterized by network outputs.

use rand::{Rng, RngCore};

use crate::error::{RlnetError, RlnetResult};

/// Maps network outputs (logits) to actions and log-probabilities.
pub trait Policy {
    /// Draws one action row per logit row into `actions`.
    fn sample(
        &self,
        logits: &[f32],
        rng: &mut dyn RngCore,
        actions: &mut [f32],
    ) -> RlnetResult<()>;

    /// Computes `log π(a | z)` and, if requested, `∂ log π / ∂z`.
    ///
    /// `log_prob` has one entry per action; `grad` has the shape of `logits`.
    fn log_prob(
        &self,
        logits: &[f32],
        actions: &[f32],
        log_prob: Option<&mut [f32]>,
        grad: Option<&mut [f32]>,
    ) -> RlnetResult<()>;
}

/// Bernoulli policy over a single logit: `P(a = 1) = σ(z)`.
///
/// Actions are `0.0` or `1.0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryPolicy;

#[inline]
fn sigmoid(z: f32) -> f32 {
    1.0 / (1.0 + (-z).exp())
}

fn check_same_len(expected: &[f32], buf: &[f32]) -> RlnetResult<()> {
    if buf.len() != expected.len() {
        return Err(RlnetError::shape_mismatch(&[expected.len()], &[buf.len()]));
    }
    Ok(())
}

impl BinaryPolicy {
    /// Entropy `H(z) = ln(1 + e^-z) + (1 - σ(z))·z` and its derivative
    /// `∂H/∂z = -z·σ(z)·(1 - σ(z))`.
    pub fn entropy(
        &self,
        logits: &[f32],
        entropy: Option<&mut [f32]>,
        grad: Option<&mut [f32]>,
    ) -> RlnetResult<()> {
        if let Some(h) = entropy {
            check_same_len(logits, h)?;
            for (h, &z) in h.iter_mut().zip(logits) {
                *h = (-z).exp().ln_1p() + (1.0 - sigmoid(z)) * z;
            }
        }
        if let Some(g) = grad {
            check_same_len(logits, g)?;
            for (g, &z) in g.iter_mut().zip(logits) {
                let p = sigmoid(z);
                *g = -z * p * (1.0 - p);
            }
        }
        Ok(())
    }
}

impl Policy for BinaryPolicy {
    fn sample(
        &self,
        logits: &[f32],
        rng: &mut dyn RngCore,
        actions: &mut [f32],
    ) -> RlnetResult<()> {
        check_same_len(logits, actions)?;
        for (a, &z) in actions.iter_mut().zip(logits) {
            *a = if rng.gen::<f32>() < sigmoid(z) { 1.0 } else { 0.0 };
        }
        Ok(())
    }

    /// `log σ(z)` for `a = 1`, `log(1 - σ(z))` for `a = 0`; gradient `a - σ(z)`.
    fn log_prob(
        &self,
        logits: &[f32],
        actions: &[f32],
        log_prob: Option<&mut [f32]>,
        grad: Option<&mut [f32]>,
    ) -> RlnetResult<()> {
        check_same_len(logits, actions)?;

        if let Some(lp) = log_prob {
            check_same_len(logits, lp)?;
            for ((lp, &z), &a) in lp.iter_mut().zip(logits).zip(actions) {
                let log_one_plus = (-z).exp().ln_1p();
                *lp = if a > 0.5 { -log_one_plus } else { -z - log_one_plus };
            }
        }
        if let Some(g) = grad {
            check_same_len(logits, g)?;
            for ((g, &z), &a) in g.iter_mut().zip(logits).zip(actions) {
                let act = if a > 0.5 { 1.0 } else { 0.0 };
                *g = act - sigmoid(z);
            }
        }
        Ok(())
    }
}
