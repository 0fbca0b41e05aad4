//! Dense network with multi-layer support.
//!
//! A [`Network`] is an ordered stack of [`DenseLayer`]s where every layer's
//! output width equals the next layer's input width. Training follows the
//! cycle:
//!
//! 1. `forward(..., Some(&mut cache))` once or many times, appending rows
//! 2. `backward(&cache, &out_grad)` over all recorded rows
//! 3. an optimizer step, then `cache.empty()`
//!
//! # Example
//!
//! ```rust
//! use rlnet::{GradientDescent, Network, NetworkConfig, Optimizer};
//!
//! let mut network = Network::new(&NetworkConfig::mlp(&[2, 1]).with_seed(3)).unwrap();
//! let mut cache = network.create_cache(4);
//! let mut opt = GradientDescent::new(0.01);
//!
//! let out = network.forward(&[1.0, 2.0, 3.0, 4.0], Some(&mut cache)).unwrap();
//! network.backward(&cache, &out).unwrap();
//! opt.step_and_empty(&mut network, &mut cache).unwrap();
//! assert!(cache.is_empty());
//! ```

use std::fmt;
use std::ops::Deref;
use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::cache::ForwardCache;
use crate::checkpoint;
use crate::config::{ConfigError, NetworkConfig};
use crate::error::{RlnetError, RlnetResult};
use crate::layer::DenseLayer;

/// Stack of dense layers.
#[derive(Debug, Clone)]
pub struct Network {
    layers: Vec<DenseLayer>,

    /// Cached `[input, hidden..., output]` for quick access.
    layer_dims: Vec<usize>,
}

impl Network {
    /// Creates a network from a validated configuration.
    ///
    /// Weights are Kaiming-uniform, drawn from a `StdRng` seeded with
    /// `config.init_seed` (or from entropy when unset). Biases start at zero.
    pub fn new(config: &NetworkConfig) -> RlnetResult<Self> {
        config.validate()?;

        let mut rng = match config.init_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let layers = config
            .layer_sizes
            .windows(2)
            .zip(&config.activations)
            .map(|(w, &act)| DenseLayer::new(w[0], w[1], act, &mut rng))
            .collect::<RlnetResult<Vec<_>>>()?;

        let network = Self {
            layers,
            layer_dims: config.layer_sizes.clone(),
        };
        log::info!(
            "Created network {:?} with {} parameters",
            network.layer_dims,
            network.param_count()
        );
        Ok(network)
    }

    /// Builds a network from already constructed layers.
    ///
    /// # Errors
    ///
    /// `ShapeMismatch` if a layer's input width differs from the previous
    /// layer's output width, `Config` if `layers` is empty.
    pub fn from_layers(layers: Vec<DenseLayer>) -> RlnetResult<Self> {
        let first = layers.first().ok_or(ConfigError::TooFewLayers(0))?;

        let mut layer_dims = Vec::with_capacity(layers.len() + 1);
        layer_dims.push(first.in_dim());
        for pair in layers.windows(2) {
            if pair[0].out_dim() != pair[1].in_dim() {
                return Err(RlnetError::shape_mismatch(
                    &[pair[0].out_dim()],
                    &[pair[1].in_dim()],
                ));
            }
        }
        layer_dims.extend(layers.iter().map(DenseLayer::out_dim));

        Ok(Self { layers, layer_dims })
    }

    /// Returns the number of layers.
    #[inline]
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Network input width.
    #[inline]
    pub fn input_dim(&self) -> usize {
        self.layer_dims[0]
    }

    /// Network output width.
    #[inline]
    pub fn output_dim(&self) -> usize {
        self.layer_dims[self.layer_dims.len() - 1]
    }

    /// Widths `[input, hidden..., output]`.
    #[inline]
    pub fn layer_dims(&self) -> &[usize] {
        &self.layer_dims
    }

    /// Returns total number of trainable parameters.
    pub fn param_count(&self) -> usize {
        self.layers.iter().map(DenseLayer::param_count).sum()
    }

    /// Layers in order.
    #[inline]
    pub fn layers(&self) -> &[DenseLayer] {
        &self.layers
    }

    /// Parameter and gradient access to layer `idx`.
    ///
    /// # Panics
    ///
    /// If `idx >= num_layers()`.
    #[inline]
    pub fn layer_mut(&mut self, idx: usize) -> LayerMut<'_> {
        LayerMut {
            layer: &mut self.layers[idx],
        }
    }

    /// Parameter and gradient access to every layer, in order.
    pub fn layers_mut(&mut self) -> impl Iterator<Item = LayerMut<'_>> {
        self.layers.iter_mut().map(|layer| LayerMut { layer })
    }

    /// Raw layer slice for in-crate updates that keep every shape.
    #[inline]
    pub(crate) fn layer_stack_mut(&mut self) -> &mut [DenseLayer] {
        &mut self.layers
    }

    /// Creates a forward cache sized for this network.
    pub fn create_cache(&self, capacity: usize) -> ForwardCache {
        ForwardCache::new(&self.layer_dims, capacity)
    }

    /// Forward pass allocating the output.
    ///
    /// See [`Network::forward_into`].
    pub fn forward(
        &self,
        input: &[f32],
        cache: Option<&mut ForwardCache>,
    ) -> RlnetResult<Vec<f32>> {
        let batch = self.batch_of(input)?;
        let mut output = vec![0.0f32; batch * self.output_dim()];
        self.forward_into(input, &mut output, cache)?;
        Ok(output)
    }

    /// Forward pass for a batch.
    ///
    /// # Arguments
    /// * `input` - Input batch `[batch * input_dim]`, row-major
    /// * `output` - Output buffer `[batch * output_dim]`
    /// * `cache` - If given, every layer appends its inputs and
    ///   pre-activations and the outputs are mirrored
    ///
    /// A batch larger than the cache's remaining room is computed uncached:
    /// the output is still correct, the cache is left untouched, a warning is
    /// logged and [`ForwardCache::overflow_count`] is incremented.
    pub fn forward_into(
        &self,
        input: &[f32],
        output: &mut [f32],
        cache: Option<&mut ForwardCache>,
    ) -> RlnetResult<()> {
        let batch = self.batch_of(input)?;
        if output.len() != batch * self.output_dim() {
            return Err(RlnetError::shape_mismatch(
                &[batch, self.output_dim()],
                &[output.len()],
            ));
        }

        let mut cache = match cache {
            Some(cache) => {
                self.check_cache(cache)?;
                if batch > cache.remaining() {
                    log::warn!(
                        "Forward cache full ({} of {} rows used), running batch of {} uncached",
                        cache.len(),
                        cache.capacity(),
                        batch
                    );
                    cache.record_overflow();
                    None
                } else {
                    Some(cache)
                }
            }
            None => None,
        };

        let mut current: Vec<f32> = Vec::new();
        for (k, layer) in self.layers.iter().enumerate() {
            let src: &[f32] = if k == 0 { input } else { &current };
            let layer_cache = cache.as_deref_mut().map(|c| c.layer_mut(k));
            let next = layer.forward(src, layer_cache)?;
            current = next;
        }
        output.copy_from_slice(&current);

        if let Some(cache) = cache {
            cache.push_output(output);
        }
        Ok(())
    }

    /// Backward pass over every row recorded in `cache`.
    ///
    /// `out_grad` is `∂L/∂output`, `[cache.len() * output_dim]`. Gradients are
    /// accumulated into every layer; the cache is not modified.
    pub fn backward(&mut self, cache: &ForwardCache, out_grad: &[f32]) -> RlnetResult<()> {
        self.backward_impl(cache, out_grad, false).map(|_| ())
    }

    /// Like [`Network::backward`], additionally returning `∂L/∂input`,
    /// `[cache.len() * input_dim]`.
    pub fn backward_with_input_grad(
        &mut self,
        cache: &ForwardCache,
        out_grad: &[f32],
    ) -> RlnetResult<Vec<f32>> {
        self.backward_impl(cache, out_grad, true)
    }

    fn backward_impl(
        &mut self,
        cache: &ForwardCache,
        out_grad: &[f32],
        input_grad: bool,
    ) -> RlnetResult<Vec<f32>> {
        self.check_cache(cache)?;
        let rows = cache.len();
        if rows == 0 {
            return Err(RlnetError::EmptyCache);
        }
        if out_grad.len() != rows * self.output_dim() {
            return Err(RlnetError::shape_mismatch(
                &[rows, self.output_dim()],
                &[out_grad.len()],
            ));
        }

        let mut grad = out_grad.to_vec();
        for (k, layer) in self.layers.iter_mut().enumerate().rev() {
            if k > 0 || input_grad {
                let mut in_grad = vec![0.0f32; rows * layer.in_dim()];
                layer.backward(cache.layer(k), &grad, Some(&mut in_grad))?;
                grad = in_grad;
            } else {
                layer.backward(cache.layer(k), &grad, None)?;
                grad.clear();
            }
        }
        Ok(grad)
    }

    /// Zeroes the gradient accumulators of every layer.
    pub fn zero_grad(&mut self) {
        for layer in &mut self.layers {
            layer.zero_grad();
        }
    }

    /// Writes the weights to `path` in the binary checkpoint format.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> RlnetResult<()> {
        checkpoint::save(self, path)
    }

    /// Loads weights from `path` into this network.
    ///
    /// The network is left untouched if the file doesn't match its topology.
    pub fn load_into<P: AsRef<Path>>(&mut self, path: P) -> RlnetResult<()> {
        checkpoint::load(path, self)
    }

    fn batch_of(&self, input: &[f32]) -> RlnetResult<usize> {
        let in_dim = self.input_dim();
        let batch = input.len() / in_dim;
        if input.len() != batch * in_dim {
            return Err(RlnetError::shape_mismatch(
                &[batch, in_dim],
                &[input.len()],
            ));
        }
        Ok(batch)
    }

    fn check_cache(&self, cache: &ForwardCache) -> RlnetResult<()> {
        let dims = cache.layer_dims();
        if dims != self.layer_dims {
            return Err(RlnetError::shape_mismatch(&self.layer_dims, &dims));
        }
        Ok(())
    }
}

/// Mutable view of one layer of a [`Network`].
///
/// Reads go through `Deref` to [`DenseLayer`]. Writes are limited to values,
/// so the layer can't be replaced and the network topology stays fixed:
///
/// ```compile_fail
/// use rlnet::{Activation, DenseLayer, Network, NetworkConfig};
///
/// let mut network = Network::new(&NetworkConfig::mlp(&[2, 3, 1])).unwrap();
/// *network.layer_mut(1) = DenseLayer::zeros(3, 4, Activation::Identity).unwrap();
/// ```
pub struct LayerMut<'a> {
    layer: &'a mut DenseLayer,
}

impl LayerMut<'_> {
    /// Mutable weights, `[out_dim × in_dim]`.
    #[inline]
    pub fn weights_mut(&mut self) -> &mut [f32] {
        self.layer.weights_mut()
    }

    /// Mutable bias, `[out_dim]`.
    #[inline]
    pub fn bias_mut(&mut self) -> &mut [f32] {
        self.layer.bias_mut()
    }

    /// Mutable weight gradient accumulator.
    #[inline]
    pub fn weight_grad_mut(&mut self) -> &mut [f32] {
        self.layer.weight_grad_mut()
    }

    /// Mutable bias gradient accumulator.
    #[inline]
    pub fn bias_grad_mut(&mut self) -> &mut [f32] {
        self.layer.bias_grad_mut()
    }

    /// See [`DenseLayer::set_weights`].
    pub fn set_weights(&mut self, weights: &[f32]) -> RlnetResult<()> {
        self.layer.set_weights(weights)
    }

    /// See [`DenseLayer::set_bias`].
    pub fn set_bias(&mut self, bias: &[f32]) -> RlnetResult<()> {
        self.layer.set_bias(bias)
    }

    /// See [`DenseLayer::zero_grad`].
    pub fn zero_grad(&mut self) {
        self.layer.zero_grad();
    }

    /// See [`DenseLayer::kaiming_init`].
    pub fn kaiming_init<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.layer.kaiming_init(rng);
    }
}

impl Deref for LayerMut<'_> {
    type Target = DenseLayer;

    #[inline]
    fn deref(&self) -> &DenseLayer {
        &*self.layer
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Network: {} layers, {} parameters",
            self.layers.len(),
            self.param_count()
        )?;
        for (k, layer) in self.layers.iter().enumerate() {
            writeln!(
                f,
                "  [{}] Dense {} -> {} ({})",
                k,
                layer.in_dim(),
                layer.out_dim(),
                layer.activation()
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::Activation;

    fn reference_network() -> Network {
        // 2 -> 2 (relu) -> 1 (identity)
        let l0 = DenseLayer::from_parts(
            2,
            2,
            Activation::Relu,
            &[1.0, 2.0, 3.0, 4.0],
            &[2.0, 0.5],
        )
        .unwrap();
        let l1 = DenseLayer::from_parts(2, 1, Activation::Identity, &[2.0, 1.0], &[0.0])
            .unwrap();
        Network::from_layers(vec![l0, l1]).unwrap()
    }

    #[test]
    fn test_network_creation() {
        let config = NetworkConfig::cartpole_policy().with_seed(1);
        let network = Network::new(&config).unwrap();

        assert_eq!(network.num_layers(), 2);
        assert_eq!(network.input_dim(), 4);
        assert_eq!(network.output_dim(), 1);
        assert_eq!(network.param_count(), config.param_count());
    }

    #[test]
    fn test_seeded_networks_match() {
        let config = NetworkConfig::mlp(&[3, 5, 2]).with_seed(11);
        let a = Network::new(&config).unwrap();
        let b = Network::new(&config).unwrap();
        for (la, lb) in a.layers().iter().zip(b.layers()) {
            assert_eq!(la.weights(), lb.weights());
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = NetworkConfig::mlp(&[3, 0, 1]);
        assert!(matches!(
            Network::new(&config),
            Err(RlnetError::Config(_))
        ));
    }

    #[test]
    fn test_from_layers_checks_chaining() {
        let l0 = DenseLayer::zeros(2, 3, Activation::Relu).unwrap();
        let l1 = DenseLayer::zeros(4, 1, Activation::Identity).unwrap();
        assert!(matches!(
            Network::from_layers(vec![l0, l1]),
            Err(RlnetError::ShapeMismatch { .. })
        ));
        assert!(Network::from_layers(Vec::new()).is_err());
    }

    #[test]
    fn test_forward_two_layers() {
        let network = reference_network();
        let mut cache = network.create_cache(1);

        let out = network.forward(&[1.0, -1.0], Some(&mut cache)).unwrap();

        assert_eq!(out, vec![2.0]);
        assert_eq!(cache.layer(0).pre_activations(), &[1.0, -0.5]);
        assert_eq!(cache.layer(1).pre_activations(), &[2.0]);
        assert_eq!(cache.output(), &[2.0]);
    }

    #[test]
    fn test_backward_two_layers() {
        let mut network = reference_network();
        let mut cache = network.create_cache(1);
        network.forward(&[1.0, -1.0], Some(&mut cache)).unwrap();

        let in_grad = network.backward_with_input_grad(&cache, &[1.0]).unwrap();

        assert_eq!(in_grad, vec![2.0, 4.0]);
        assert_eq!(network.layers()[1].weight_grad(), &[1.0, 0.0]);
        assert_eq!(network.layers()[1].bias_grad(), &[1.0]);
        assert_eq!(network.layers()[0].weight_grad(), &[2.0, -2.0, 0.0, 0.0]);
        assert_eq!(network.layers()[0].bias_grad(), &[2.0, 0.0]);
    }

    #[test]
    fn test_overflow_degrades_to_uncached() {
        let network = reference_network();
        let mut cache = network.create_cache(1);
        network.forward(&[1.0, -1.0], Some(&mut cache)).unwrap();

        let out = network.forward(&[1.0, -1.0], Some(&mut cache)).unwrap();

        assert_eq!(out, vec![2.0]);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.overflow_count(), 1);
    }

    #[test]
    fn test_cache_for_other_topology_rejected() {
        let network = reference_network();
        let mut cache = ForwardCache::new(&[2, 3, 1], 4);
        assert!(matches!(
            network.forward(&[1.0, 1.0], Some(&mut cache)),
            Err(RlnetError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_backward_empty_cache() {
        let mut network = reference_network();
        let cache = network.create_cache(4);
        assert!(matches!(
            network.backward(&cache, &[]),
            Err(RlnetError::EmptyCache)
        ));
    }

    #[test]
    fn test_zero_grad() {
        let mut network = reference_network();
        let mut cache = network.create_cache(1);
        network.forward(&[1.0, -1.0], Some(&mut cache)).unwrap();
        network.backward(&cache, &[1.0]).unwrap();

        network.zero_grad();
        for layer in network.layers() {
            assert!(layer.weight_grad().iter().all(|&g| g == 0.0));
            assert!(layer.bias_grad().iter().all(|&g| g == 0.0));
        }
    }

    #[test]
    fn test_display_summary() {
        let summary = reference_network().to_string();
        assert!(summary.contains("2 layers"));
        assert!(summary.contains("Dense 2 -> 2 (relu)"));
        assert!(summary.contains("Dense 2 -> 1 (identity)"));
    }

    #[test]
    fn test_layer_mut_edits_values_not_topology() {
        let mut network = Network::new(&NetworkConfig::mlp(&[2, 3, 1]).with_seed(0)).unwrap();

        network.layer_mut(1).set_weights(&[1.0, 1.0, 1.0]).unwrap();
        assert!(network.layer_mut(1).set_weights(&[0.0; 4]).is_err());
        network.layer_mut(1).bias_mut()[0] = 0.5;
        for mut layer in network.layers_mut() {
            layer.kaiming_init(&mut StdRng::seed_from_u64(1));
            layer.zero_grad();
        }

        assert_eq!(network.layer_dims(), &[2, 3, 1]);
        assert_eq!(network.layer_mut(1).out_dim(), 1);
        let out = network.forward(&[1.0, 2.0], None).unwrap();
        assert_eq!(out.len(), 1);
        assert!(network.forward(&[1.0, 2.0, 3.0], None).is_err());
    }
}
