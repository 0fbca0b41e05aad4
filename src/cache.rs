//! Append-only forward caches.
//!
//! This module provides two types:
//!
//! - [`LayerCache`]: inputs and pre-activations recorded by one layer
//! - [`ForwardCache`]: one [`LayerCache`] per layer plus a mirror of the
//!   network output
//!
//! # Append then consume-all
//!
//! Every cached forward call appends its rows at the current offset. A later
//! backward pass consumes *all* rows recorded since the last
//! [`ForwardCache::empty`], not just the last call. This is how a trajectory
//! simulated one step at a time is turned into a single gradient pass:
//!
//! ```rust
//! use rlnet::{Network, NetworkConfig};
//!
//! let mut network = Network::new(&NetworkConfig::mlp(&[3, 8, 1]).with_seed(1)).unwrap();
//! let mut cache = network.create_cache(16);
//!
//! for step in 0..4 {
//!     let obs = [step as f32, 0.5, -0.5];
//!     network.forward(&obs, Some(&mut cache)).unwrap();
//! }
//! assert_eq!(cache.len(), 4);
//!
//! let out_grad = vec![1.0f32; cache.len()];
//! network.backward(&cache, &out_grad).unwrap();
//! cache.empty();
//! ```
//!
//! Buffers are allocated once at full capacity; appends never reallocate.

use crate::error::{RlnetError, RlnetResult};

/// Per-layer record of inputs and pre-activations.
#[derive(Debug, Clone)]
pub struct LayerCache {
    in_dim: usize,
    out_dim: usize,
    capacity: usize,
    len: usize,
    /// `[capacity × in_dim]`, first `len` rows valid.
    inputs: Vec<f32>,
    /// `[capacity × out_dim]`, first `len` rows valid.
    pre_activations: Vec<f32>,
}

impl LayerCache {
    /// Creates an empty cache able to hold `capacity` rows.
    pub fn new(in_dim: usize, out_dim: usize, capacity: usize) -> Self {
        Self {
            in_dim,
            out_dim,
            capacity,
            len: 0,
            inputs: vec![0.0; capacity * in_dim],
            pre_activations: vec![0.0; capacity * out_dim],
        }
    }

    /// Rows currently recorded.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if no row is recorded.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Maximum number of rows.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Rows that can still be appended.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.capacity - self.len
    }

    /// Input width of the owning layer.
    #[inline]
    pub fn in_dim(&self) -> usize {
        self.in_dim
    }

    /// Output width of the owning layer.
    #[inline]
    pub fn out_dim(&self) -> usize {
        self.out_dim
    }

    /// Recorded inputs, `[len × in_dim]`.
    #[inline]
    pub fn inputs(&self) -> &[f32] {
        &self.inputs[..self.len * self.in_dim]
    }

    /// Recorded pre-activations, `[len × out_dim]`.
    #[inline]
    pub fn pre_activations(&self) -> &[f32] {
        &self.pre_activations[..self.len * self.out_dim]
    }

    /// Appends `batch` rows of inputs and pre-activations.
    ///
    /// Nothing is written if the rows don't fit.
    pub(crate) fn append(&mut self, input: &[f32], pre_activation: &[f32]) -> RlnetResult<()> {
        let batch = input.len() / self.in_dim;
        if input.len() != batch * self.in_dim || pre_activation.len() != batch * self.out_dim {
            return Err(RlnetError::shape_mismatch(
                &[batch, self.in_dim, self.out_dim],
                &[input.len(), pre_activation.len()],
            ));
        }
        if batch > self.remaining() {
            return Err(RlnetError::cache_overflow(batch, self.remaining()));
        }

        let in_start = self.len * self.in_dim;
        self.inputs[in_start..in_start + input.len()].copy_from_slice(input);

        let z_start = self.len * self.out_dim;
        self.pre_activations[z_start..z_start + pre_activation.len()]
            .copy_from_slice(pre_activation);

        self.len += batch;
        Ok(())
    }

    /// Forgets every recorded row. Buffers keep their allocation.
    #[inline]
    pub fn empty(&mut self) {
        self.len = 0;
    }
}

/// Network-level cache: one [`LayerCache`] per layer plus the final outputs.
#[derive(Debug, Clone)]
pub struct ForwardCache {
    layers: Vec<LayerCache>,
    out_dim: usize,
    capacity: usize,
    len: usize,
    /// `[capacity × out_dim]`, first `len` rows valid.
    output: Vec<f32>,
    /// Forward calls that skipped caching because they didn't fit.
    overflows: usize,
}

impl ForwardCache {
    /// Creates a cache for a network with widths `layer_dims =
    /// [input, hidden..., output]`.
    pub fn new(layer_dims: &[usize], capacity: usize) -> Self {
        let layers: Vec<LayerCache> = layer_dims
            .windows(2)
            .map(|w| LayerCache::new(w[0], w[1], capacity))
            .collect();
        let out_dim = layer_dims.last().copied().unwrap_or(0);

        Self {
            layers,
            out_dim,
            capacity,
            len: 0,
            output: vec![0.0; capacity * out_dim],
            overflows: 0,
        }
    }

    /// Rows currently recorded.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if no row is recorded.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Maximum number of rows.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Rows that can still be appended.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.capacity - self.len
    }

    /// Number of layer caches.
    #[inline]
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Cache of layer `idx`.
    #[inline]
    pub fn layer(&self, idx: usize) -> &LayerCache {
        &self.layers[idx]
    }

    /// All layer caches in network order.
    #[inline]
    pub fn layers(&self) -> &[LayerCache] {
        &self.layers
    }

    /// Network outputs of every recorded row, `[len × output_dim]`.
    #[inline]
    pub fn output(&self) -> &[f32] {
        &self.output[..self.len * self.out_dim]
    }

    /// How many forward calls were degraded to uncached because the batch
    /// did not fit.
    #[inline]
    pub fn overflow_count(&self) -> usize {
        self.overflows
    }

    /// Widths `[input, hidden..., output]` this cache was built for.
    pub fn layer_dims(&self) -> Vec<usize> {
        let mut dims = Vec::with_capacity(self.layers.len() + 1);
        if let Some(first) = self.layers.first() {
            dims.push(first.in_dim());
        }
        dims.extend(self.layers.iter().map(LayerCache::out_dim));
        dims
    }

    /// Forgets every recorded row in every layer.
    pub fn empty(&mut self) {
        for layer in &mut self.layers {
            layer.empty();
        }
        self.len = 0;
    }

    #[inline]
    pub(crate) fn layer_mut(&mut self, idx: usize) -> &mut LayerCache {
        &mut self.layers[idx]
    }

    pub(crate) fn record_overflow(&mut self) {
        self.overflows += 1;
    }

    /// Mirrors the final outputs of a cached forward call and commits the
    /// row count.
    pub(crate) fn push_output(&mut self, output: &[f32]) {
        let batch = output.len() / self.out_dim;
        let start = self.len * self.out_dim;
        self.output[start..start + output.len()].copy_from_slice(output);
        self.len += batch;
        debug_assert!(self.layers.iter().all(|l| l.len() == self.len));
    }
}
