//! Network configuration.
//!
//! This module provides [`NetworkConfig`] for describing a dense network:
//! the layer widths, the activation of every layer and the initialization
//! seed.
//!
//! # Example
//!
//! ```rust
//! use rlnet::{Activation, NetworkConfig};
//!
//! // Preset used by the CartPole policy
//! let config = NetworkConfig::cartpole_policy();
//! assert_eq!(config.layer_sizes, vec![4, 64, 1]);
//!
//! // Or customize
//! let config = NetworkConfig {
//!     layer_sizes: vec![8, 16, 1],
//!     activations: vec![Activation::Relu, Activation::Identity],
//!     init_seed: Some(7),
//! };
//! config.validate().expect("valid config");
//! ```

use crate::activation::Activation;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Dense network configuration.
///
/// `layer_sizes` lists every width from the input to the output, so a
/// network with `n` layers has `n + 1` sizes and `n` activations.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NetworkConfig {
    /// Widths `[input, hidden..., output]`.
    pub layer_sizes: Vec<usize>,

    /// One activation per layer.
    pub activations: Vec<Activation>,

    /// Optional seed for deterministic initialization (None => entropy).
    pub init_seed: Option<u64>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            layer_sizes: vec![4, 32, 1],
            activations: vec![Activation::Relu, Activation::Identity],
            init_seed: None,
        }
    }
}

impl NetworkConfig {
    /// Creates a configuration from widths, using ReLU on every hidden layer
    /// and identity on the output layer.
    pub fn mlp(layer_sizes: &[usize]) -> Self {
        let n = layer_sizes.len().saturating_sub(1);
        let mut activations = vec![Activation::Relu; n];
        if let Some(last) = activations.last_mut() {
            *last = Activation::Identity;
        }
        Self {
            layer_sizes: layer_sizes.to_vec(),
            activations,
            init_seed: None,
        }
    }

    /// Preset for a Bernoulli CartPole policy: `[4, 64, 1]`, ReLU then a
    /// single identity logit.
    pub fn cartpole_policy() -> Self {
        Self::mlp(&[4, 64, 1])
    }

    /// Sets the initialization seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.init_seed = Some(seed);
        self
    }

    /// Number of dense layers.
    #[inline]
    pub fn num_layers(&self) -> usize {
        self.layer_sizes.len().saturating_sub(1)
    }

    /// Network input width.
    #[inline]
    pub fn input_dim(&self) -> usize {
        self.layer_sizes.first().copied().unwrap_or(0)
    }

    /// Network output width.
    #[inline]
    pub fn output_dim(&self) -> usize {
        self.layer_sizes.last().copied().unwrap_or(0)
    }

    /// Total number of trainable parameters, `Σ (in + 1) · out`.
    pub fn param_count(&self) -> usize {
        self.layer_sizes
            .windows(2)
            .map(|w| (w[0] + 1) * w[1])
            .sum()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if:
    /// - fewer than two sizes are given
    /// - any size is zero
    /// - the number of activations differs from the number of layers
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.layer_sizes.len() < 2 {
            return Err(ConfigError::TooFewLayers(self.layer_sizes.len()));
        }
        if let Some(pos) = self.layer_sizes.iter().position(|&s| s == 0) {
            return Err(ConfigError::ZeroWidth(pos));
        }
        if self.activations.len() != self.num_layers() {
            return Err(ConfigError::ActivationCount {
                layers: self.num_layers(),
                activations: self.activations.len(),
            });
        }
        Ok(())
    }
}

/// Errors returned by [`NetworkConfig::validate`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A dimension parameter is invalid.
    #[error("Invalid dimension: {0}")]
    InvalidDimension(&'static str),

    /// At least an input and an output size are required.
    #[error("Need at least 2 layer sizes, got {0}")]
    TooFewLayers(usize),

    /// A width is zero.
    #[error("Layer size at position {0} is zero")]
    ZeroWidth(usize),

    /// Activations don't match the number of layers.
    #[error("Expected {layers} activations, got {activations}")]
    ActivationCount {
        /// Number of layers implied by `layer_sizes`.
        layers: usize,
        /// Number of activations supplied.
        activations: usize,
    },
}
