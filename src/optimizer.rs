//! Optimizers consuming a network's accumulated gradients.
//!
//! Both optimizers read the gradient accumulators left by
//! [`Network::backward`] and update the parameters in place. Neither zeroes
//! the gradients; call [`Network::zero_grad`] before the next accumulation
//! window.
//!
//! # Example
//!
//! ```rust
//! use rlnet::{Adam, AdamConfig, Network, NetworkConfig, Optimizer};
//!
//! let mut network = Network::new(&NetworkConfig::mlp(&[4, 8, 1]).with_seed(0)).unwrap();
//! let mut cache = network.create_cache(2);
//! let mut adam = Adam::new(&network, AdamConfig::with_lr(1e-2));
//!
//! network.zero_grad();
//! network.forward(&[0.1; 8], Some(&mut cache)).unwrap();
//! network.backward(&cache, &[1.0, -1.0]).unwrap();
//! adam.step_and_empty(&mut network, &mut cache).unwrap();
//! assert_eq!(adam.timestep(), 1);
//! ```

use crate::cache::ForwardCache;
use crate::error::{RlnetError, RlnetResult};
use crate::layer::DenseLayer;
use crate::network::Network;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Update rule applied to a network's parameters.
pub trait Optimizer {
    /// Applies one update using the network's current gradients.
    fn step(&mut self, network: &mut Network) -> RlnetResult<()>;

    /// Current learning rate.
    fn learning_rate(&self) -> f32;

    /// Sets the learning rate.
    fn set_learning_rate(&mut self, lr: f32);

    /// Steps, then empties `cache` so the next window starts clean.
    fn step_and_empty(&mut self, network: &mut Network, cache: &mut ForwardCache) -> RlnetResult<()> {
        self.step(network)?;
        cache.empty();
        Ok(())
    }
}

/// Plain gradient descent: `p -= lr * g`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GradientDescent {
    /// Learning rate.
    pub lr: f32,
}

impl GradientDescent {
    /// Creates a gradient descent optimizer.
    pub fn new(lr: f32) -> Self {
        Self { lr }
    }
}

impl Optimizer for GradientDescent {
    fn step(&mut self, network: &mut Network) -> RlnetResult<()> {
        let lr = self.lr;
        for layer in network.layer_stack_mut() {
            let (weights, bias, weight_grad, bias_grad) = layer.params_and_grads();
            for (p, &g) in weights.iter_mut().zip(weight_grad) {
                *p -= lr * g;
            }
            for (p, &g) in bias.iter_mut().zip(bias_grad) {
                *p -= lr * g;
            }
        }
        Ok(())
    }

    #[inline]
    fn learning_rate(&self) -> f32 {
        self.lr
    }

    #[inline]
    fn set_learning_rate(&mut self, lr: f32) {
        self.lr = lr;
    }
}

/// Adam moments for a single parameter tensor.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AdamState {
    /// First moment (mean of gradients).
    pub m: Vec<f32>,

    /// Second moment (uncentered variance of gradients).
    pub v: Vec<f32>,
}

impl AdamState {
    /// Creates a zeroed state for a parameter tensor of given size.
    pub fn new(size: usize) -> Self {
        Self {
            m: vec![0.0; size],
            v: vec![0.0; size],
        }
    }

    /// Number of tracked parameters.
    #[inline]
    pub fn len(&self) -> usize {
        self.m.len()
    }

    /// True if the state tracks no parameter.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.m.is_empty()
    }

    /// Zeroes both moments.
    pub fn reset(&mut self) {
        self.m.fill(0.0);
        self.v.fill(0.0);
    }
}

/// Adam optimizer configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AdamConfig {
    /// Learning rate (alpha).
    pub lr: f32,

    /// First moment decay (beta1).
    pub beta1: f32,

    /// Second moment decay (beta2).
    pub beta2: f32,

    /// Added to `sqrt(v_hat)` in the denominator.
    pub epsilon: f32,
}

impl Default for AdamConfig {
    fn default() -> Self {
        Self {
            lr: 0.001,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
        }
    }
}

impl AdamConfig {
    /// Creates config with learning rate.
    pub fn with_lr(lr: f32) -> Self {
        Self {
            lr,
            ..Default::default()
        }
    }
}

/// Per-layer optimizer state.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LayerAdamState {
    /// State for weights.
    pub weights: AdamState,

    /// State for bias.
    pub bias: AdamState,
}

impl LayerAdamState {
    /// Creates state for a layer.
    pub fn new(layer: &DenseLayer) -> Self {
        Self {
            weights: AdamState::new(layer.weights().len()),
            bias: AdamState::new(layer.bias().len()),
        }
    }

    /// Resets all states.
    pub fn reset(&mut self) {
        self.weights.reset();
        self.bias.reset();
    }

    fn matches(&self, layer: &DenseLayer) -> bool {
        self.weights.len() == layer.weights().len() && self.bias.len() == layer.bias().len()
    }
}

/// Adam optimizer.
///
/// Per element, with `t` incremented once per [`Optimizer::step`]:
///
/// ```text
/// m     = β1·m + (1 − β1)·g
/// v     = β2·v + (1 − β2)·g²
/// m_hat = m / (1 − β1^t)
/// v_hat = v / (1 − β2^t)
/// p    -= lr · m_hat / (sqrt(v_hat) + ε)
/// ```
///
/// Elements are visited layer by layer, weights before biases, in storage
/// order, so two runs over identical gradients are bit-identical.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Adam {
    /// Configuration.
    pub config: AdamConfig,

    /// Steps taken since creation or the last reset.
    t: u32,

    /// Per-layer states.
    layer_states: Vec<LayerAdamState>,
}

impl Adam {
    /// Creates a new Adam optimizer sized for `network`.
    pub fn new(network: &Network, config: AdamConfig) -> Self {
        let layer_states = network.layers().iter().map(LayerAdamState::new).collect();

        Self {
            config,
            t: 0,
            layer_states,
        }
    }

    /// Creates optimizer with default config.
    pub fn default_for(network: &Network) -> Self {
        Self::new(network, AdamConfig::default())
    }

    /// Steps taken so far.
    #[inline]
    pub fn timestep(&self) -> u32 {
        self.t
    }

    /// Per-layer moment buffers.
    #[inline]
    pub fn layer_states(&self) -> &[LayerAdamState] {
        &self.layer_states
    }

    /// Resets all optimizer state, including the step counter.
    pub fn reset(&mut self) {
        for state in &mut self.layer_states {
            state.reset();
        }
        self.t = 0;
    }

    /// Updates a single parameter tensor.
    fn update_params(
        params: &mut [f32],
        grads: &[f32],
        state: &mut AdamState,
        config: &AdamConfig,
        bc1: f32,
        bc2: f32,
    ) {
        debug_assert_eq!(params.len(), grads.len());
        debug_assert_eq!(params.len(), state.len());

        let beta1 = config.beta1;
        let beta2 = config.beta2;

        for ((p, &g), (m, v)) in params
            .iter_mut()
            .zip(grads)
            .zip(state.m.iter_mut().zip(state.v.iter_mut()))
        {
            *m = beta1 * *m + (1.0 - beta1) * g;
            *v = beta2 * *v + (1.0 - beta2) * g * g;

            let m_hat = *m / bc1;
            let v_hat = *v / bc2;
            *p -= config.lr * m_hat / (v_hat.sqrt() + config.epsilon);
        }
    }
}

impl Optimizer for Adam {
    /// # Errors
    ///
    /// `ShapeMismatch` if `network` doesn't have the topology this optimizer
    /// was created for. Nothing is updated in that case.
    fn step(&mut self, network: &mut Network) -> RlnetResult<()> {
        let layers = network.layer_stack_mut();
        if layers.len() != self.layer_states.len()
            || !layers
                .iter()
                .zip(&self.layer_states)
                .all(|(layer, state)| state.matches(layer))
        {
            let expected: Vec<usize> = self
                .layer_states
                .iter()
                .map(|s| s.weights.len() + s.bias.len())
                .collect();
            let got: Vec<usize> = layers.iter().map(DenseLayer::param_count).collect();
            return Err(RlnetError::shape_mismatch(&expected, &got));
        }

        self.t += 1;
        let bc1 = 1.0 - self.config.beta1.powi(self.t as i32);
        let bc2 = 1.0 - self.config.beta2.powi(self.t as i32);

        for (layer, state) in layers.iter_mut().zip(self.layer_states.iter_mut()) {
            let (weights, bias, weight_grad, bias_grad) = layer.params_and_grads();
            Self::update_params(weights, weight_grad, &mut state.weights, &self.config, bc1, bc2);
            Self::update_params(bias, bias_grad, &mut state.bias, &self.config, bc1, bc2);
        }
        Ok(())
    }

    #[inline]
    fn learning_rate(&self) -> f32 {
        self.config.lr
    }

    #[inline]
    fn set_learning_rate(&mut self, lr: f32) {
        self.config.lr = lr;
    }
}
