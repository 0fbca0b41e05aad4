//! Dense (fully connected) layer.
//!
//! # Mathematical Foundation
//!
//! For a batch `X` of shape `[batch, in_dim]` each layer computes:
//!
//! ```text
//! Z = X · Wᵀ + b        (pre-activation, [batch, out_dim])
//! Y = act(Z)            (element-wise)
//! ```
//!
//! Backward, given `∂L/∂Y` for every cached row:
//!
//! ```text
//! P    = ∂L/∂Y ⊙ act'(Z)
//! ∂W  += Pᵀ · X         ([out_dim, in_dim])
//! ∂b  += Σ_rows P
//! ∂X   = P · W          (optional)
//! ```
//!
//! # Layout
//!
//! Row-major `[out_dim, in_dim]`: row `o` of the weight matrix holds every
//! input weight of output `o`, so each pre-activation is one contiguous dot
//! product. Gradient accumulators share the layout.

use rand::Rng;
use wide::f32x8;

use crate::activation::Activation;
use crate::cache::LayerCache;
use crate::config::ConfigError;
use crate::error::{RlnetError, RlnetResult};

/// A dense layer with its parameters and gradient accumulators.
#[derive(Debug, Clone)]
pub struct DenseLayer {
    in_dim: usize,
    out_dim: usize,
    activation: Activation,
    /// `[out_dim][in_dim]`
    weights: Vec<f32>,
    /// `[out_dim]`
    bias: Vec<f32>,
    /// Same shape as `weights`; only ever accumulated into.
    weight_grad: Vec<f32>,
    /// Same shape as `bias`.
    bias_grad: Vec<f32>,
}

impl DenseLayer {
    /// Creates a layer with zero weights, zero bias and zero gradients.
    pub fn zeros(in_dim: usize, out_dim: usize, activation: Activation) -> RlnetResult<Self> {
        if in_dim == 0 {
            return Err(ConfigError::InvalidDimension("in_dim must be > 0").into());
        }
        if out_dim == 0 {
            return Err(ConfigError::InvalidDimension("out_dim must be > 0").into());
        }

        Ok(Self {
            in_dim,
            out_dim,
            activation,
            weights: vec![0.0; out_dim * in_dim],
            bias: vec![0.0; out_dim],
            weight_grad: vec![0.0; out_dim * in_dim],
            bias_grad: vec![0.0; out_dim],
        })
    }

    /// Creates a layer with Kaiming-uniform weights and zero bias.
    pub fn new<R: Rng + ?Sized>(
        in_dim: usize,
        out_dim: usize,
        activation: Activation,
        rng: &mut R,
    ) -> RlnetResult<Self> {
        let mut layer = Self::zeros(in_dim, out_dim, activation)?;
        layer.kaiming_init(rng);
        Ok(layer)
    }

    /// Creates a layer from explicit parameters.
    pub fn from_parts(
        in_dim: usize,
        out_dim: usize,
        activation: Activation,
        weights: &[f32],
        bias: &[f32],
    ) -> RlnetResult<Self> {
        let mut layer = Self::zeros(in_dim, out_dim, activation)?;
        layer.set_weights(weights)?;
        layer.set_bias(bias)?;
        Ok(layer)
    }

    /// Redraws the weights from `U(-limit, limit)` with `limit = sqrt(6 /
    /// in_dim)` and zeroes the bias.
    pub fn kaiming_init<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let limit = (6.0f32 / self.in_dim as f32).sqrt();
        for w in self.weights.iter_mut() {
            *w = rng.gen_range(-limit..limit);
        }
        self.bias.fill(0.0);
    }

    /// Input dimension.
    #[inline]
    pub fn in_dim(&self) -> usize {
        self.in_dim
    }

    /// Output dimension.
    #[inline]
    pub fn out_dim(&self) -> usize {
        self.out_dim
    }

    /// Activation applied after the affine transform.
    #[inline]
    pub fn activation(&self) -> Activation {
        self.activation
    }

    /// Total number of parameters, `(in_dim + 1) · out_dim`.
    #[inline]
    pub fn param_count(&self) -> usize {
        self.weights.len() + self.bias.len()
    }

    /// Weights, row-major `[out_dim, in_dim]`.
    #[inline]
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Mutable weights. The slice can't change length.
    #[inline]
    pub fn weights_mut(&mut self) -> &mut [f32] {
        &mut self.weights
    }

    /// Bias vector.
    #[inline]
    pub fn bias(&self) -> &[f32] {
        &self.bias
    }

    /// Mutable bias vector.
    #[inline]
    pub fn bias_mut(&mut self) -> &mut [f32] {
        &mut self.bias
    }

    /// Accumulated weight gradient.
    #[inline]
    pub fn weight_grad(&self) -> &[f32] {
        &self.weight_grad
    }

    /// Mutable weight gradient.
    #[inline]
    pub fn weight_grad_mut(&mut self) -> &mut [f32] {
        &mut self.weight_grad
    }

    /// Accumulated bias gradient.
    #[inline]
    pub fn bias_grad(&self) -> &[f32] {
        &self.bias_grad
    }

    /// Mutable bias gradient.
    #[inline]
    pub fn bias_grad_mut(&mut self) -> &mut [f32] {
        &mut self.bias_grad
    }

    /// Parameters and their gradients, borrowed together for an optimizer
    /// update: `(weights, bias, weight_grad, bias_grad)`.
    #[inline]
    pub(crate) fn params_and_grads(&mut self) -> (&mut [f32], &mut [f32], &[f32], &[f32]) {
        (
            &mut self.weights,
            &mut self.bias,
            &self.weight_grad,
            &self.bias_grad,
        )
    }

    /// Overwrites the weights.
    pub fn set_weights(&mut self, weights: &[f32]) -> RlnetResult<()> {
        if weights.len() != self.weights.len() {
            return Err(RlnetError::shape_mismatch(
                &[self.out_dim, self.in_dim],
                &[weights.len()],
            ));
        }
        self.weights.copy_from_slice(weights);
        Ok(())
    }

    /// Overwrites the bias.
    pub fn set_bias(&mut self, bias: &[f32]) -> RlnetResult<()> {
        if bias.len() != self.bias.len() {
            return Err(RlnetError::shape_mismatch(&[self.out_dim], &[bias.len()]));
        }
        self.bias.copy_from_slice(bias);
        Ok(())
    }

    /// Resets both gradient accumulators to zero.
    ///
    /// Skipping this between accumulation windows keeps summing into the
    /// previous gradients, which is how gradients of several rollouts are
    /// combined before one optimizer step.
    pub fn zero_grad(&mut self) {
        self.weight_grad.fill(0.0);
        self.bias_grad.fill(0.0);
    }

    /// Forward pass allocating the output.
    pub fn forward(
        &self,
        input: &[f32],
        cache: Option<&mut LayerCache>,
    ) -> RlnetResult<Vec<f32>> {
        let batch = self.batch_of(input)?;
        let mut output = vec![0.0f32; batch * self.out_dim];
        self.forward_into(input, &mut output, cache)?;
        Ok(output)
    }

    /// Forward pass for a batch `[batch × in_dim]` into `output`
    /// `[batch × out_dim]`.
    ///
    /// With a cache, the input and the pre-activations are appended at the
    /// cache's current offset. A batch that doesn't fit is rejected before
    /// anything is computed or written.
    pub fn forward_into(
        &self,
        input: &[f32],
        output: &mut [f32],
        cache: Option<&mut LayerCache>,
    ) -> RlnetResult<()> {
        let batch = self.batch_of(input)?;
        if output.len() != batch * self.out_dim {
            return Err(RlnetError::shape_mismatch(
                &[batch, self.out_dim],
                &[output.len()],
            ));
        }
        if let Some(cache) = cache.as_deref() {
            self.check_cache(cache)?;
            if batch > cache.remaining() {
                return Err(RlnetError::cache_overflow(batch, cache.remaining()));
            }
        }

        // Pre-activations first, written straight into `output`.
        for (x_row, z_row) in input
            .chunks_exact(self.in_dim)
            .zip(output.chunks_exact_mut(self.out_dim))
        {
            for (o, z) in z_row.iter_mut().enumerate() {
                let w_row = &self.weights[o * self.in_dim..(o + 1) * self.in_dim];
                *z = self.bias[o] + dot(x_row, w_row);
            }
        }

        if let Some(cache) = cache {
            cache.append(input, output)?;
        }

        let act = self.activation;
        if act != Activation::Identity {
            for y in output.iter_mut() {
                *y = act.apply(*y);
            }
        }

        Ok(())
    }

    /// Backward pass over every row recorded in `cache`.
    ///
    /// `out_grad` is `∂L/∂Y`, `[cache.len() × out_dim]`. Weight and bias
    /// gradients are accumulated (`+=`). If `in_grad` is given it is
    /// overwritten with `∂L/∂X`, `[cache.len() × in_dim]`.
    pub fn backward(
        &mut self,
        cache: &LayerCache,
        out_grad: &[f32],
        in_grad: Option<&mut [f32]>,
    ) -> RlnetResult<()> {
        self.check_cache(cache)?;
        let rows = cache.len();
        if rows == 0 {
            return Err(RlnetError::EmptyCache);
        }
        if out_grad.len() != rows * self.out_dim {
            return Err(RlnetError::shape_mismatch(
                &[rows, self.out_dim],
                &[out_grad.len()],
            ));
        }
        if let Some(g) = in_grad.as_deref() {
            if g.len() != rows * self.in_dim {
                return Err(RlnetError::shape_mismatch(
                    &[rows, self.in_dim],
                    &[g.len()],
                ));
            }
        }

        let act = self.activation;
        let pre_grad: Vec<f32> = out_grad
            .iter()
            .zip(cache.pre_activations())
            .map(|(&g, &z)| g * act.derivative(z))
            .collect();

        // ∂W += Pᵀ · X, ∂b += Σ P
        for (p_row, x_row) in pre_grad
            .chunks_exact(self.out_dim)
            .zip(cache.inputs().chunks_exact(self.in_dim))
        {
            for (o, &p) in p_row.iter().enumerate() {
                self.bias_grad[o] += p;
                let wg_row = &mut self.weight_grad[o * self.in_dim..(o + 1) * self.in_dim];
                for (wg, &x) in wg_row.iter_mut().zip(x_row) {
                    *wg += p * x;
                }
            }
        }

        // ∂X = P · W
        if let Some(in_grad) = in_grad {
            for (p_row, g_row) in pre_grad
                .chunks_exact(self.out_dim)
                .zip(in_grad.chunks_exact_mut(self.in_dim))
            {
                g_row.fill(0.0);
                for (o, &p) in p_row.iter().enumerate() {
                    let w_row = &self.weights[o * self.in_dim..(o + 1) * self.in_dim];
                    for (g, &w) in g_row.iter_mut().zip(w_row) {
                        *g += p * w;
                    }
                }
            }
        }

        Ok(())
    }

    fn batch_of(&self, input: &[f32]) -> RlnetResult<usize> {
        let batch = input.len() / self.in_dim;
        if input.len() != batch * self.in_dim {
            return Err(RlnetError::shape_mismatch(
                &[batch, self.in_dim],
                &[input.len()],
            ));
        }
        Ok(batch)
    }

    fn check_cache(&self, cache: &LayerCache) -> RlnetResult<()> {
        if cache.in_dim() != self.in_dim || cache.out_dim() != self.out_dim {
            return Err(RlnetError::shape_mismatch(
                &[self.in_dim, self.out_dim],
                &[cache.in_dim(), cache.out_dim()],
            ));
        }
        Ok(())
    }
}

/// Dot product, 8 lanes at a time with a scalar tail.
#[inline]
fn dot(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());

    let mut acc = f32x8::splat(0.0);
    let a_chunks = a.chunks_exact(8);
    let b_chunks = b.chunks_exact(8);
    let a_tail = a_chunks.remainder();
    let b_tail = b_chunks.remainder();

    for (ca, cb) in a_chunks.zip(b_chunks) {
        let mut la = [0.0f32; 8];
        let mut lb = [0.0f32; 8];
        la.copy_from_slice(ca);
        lb.copy_from_slice(cb);
        acc += f32x8::new(la) * f32x8::new(lb);
    }

    let lanes: [f32; 8] = acc.into();
    let mut sum: f32 = lanes.iter().sum();
    for (&x, &y) in a_tail.iter().zip(b_tail) {
        sum += x * y;
    }
    sum
}
