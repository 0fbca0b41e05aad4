//! Loss functions producing the `out_grad` consumed by
//! [`Network::backward`](crate::Network::backward).
//!
//! # Example
//!
//! ```rust
//! use rlnet::loss::mse;
//!
//! let predictions = vec![0.5, 1.0, 1.5];
//! let targets = vec![0.0, 1.0, 2.0];
//!
//! let (loss, grad) = mse(&predictions, &targets).unwrap();
//! assert!((loss - 1.0 / 6.0).abs() < 1e-6);
//! assert_eq!(grad.len(), 3);
//! ```

use crate::error::{RlnetError, RlnetResult};

/// Mean Squared Error over every element.
///
/// # Arguments
///
/// * `predictions` - Model output: `[batch_size * output_dim]`
/// * `targets` - Ground truth: `[batch_size * output_dim]`
///
/// # Returns
///
/// Tuple of (loss, gradient):
/// - `loss`: `mean((p - t)²)`
/// - `gradient`: `2 (p - t) / n` for each prediction
pub fn mse(predictions: &[f32], targets: &[f32]) -> RlnetResult<(f32, Vec<f32>)> {
    if predictions.len() != targets.len() {
        return Err(RlnetError::shape_mismatch(
            &[predictions.len()],
            &[targets.len()],
        ));
    }
    if predictions.is_empty() {
        return Ok((0.0, Vec::new()));
    }

    let inv_n = 1.0 / predictions.len() as f32;
    let mut loss = 0.0f32;
    let grad = predictions
        .iter()
        .zip(targets)
        .map(|(&p, &t)| {
            let diff = p - t;
            loss += diff * diff;
            2.0 * diff * inv_n
        })
        .collect();

    Ok((loss * inv_n, grad))
}
