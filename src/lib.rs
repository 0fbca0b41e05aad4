//! # rlnet - Dense Network Training Engine for Policy Gradients
//!
//! A small dense-network engine used as the function approximator of a
//! reinforcement-learning pipeline.
//!
//! ## Architecture
//! - Row-major weight layout: `[Output, Input]`
//! - Append-only forward cache: many small forward calls, one backward pass
//! - Gradient accumulators that only grow until an explicit `zero_grad`
//! - Data-parallel replicas synchronized by broadcast and reduce-sum
//!
//! ## Usage
//! ```rust
//! use rlnet::loss::mse;
//! use rlnet::{GradientDescent, Network, NetworkConfig, Optimizer};
//!
//! let mut network = Network::new(&NetworkConfig::mlp(&[2, 1]).with_seed(0)).unwrap();
//! let mut cache = network.create_cache(4);
//! let mut opt = GradientDescent::new(0.01);
//!
//! let inputs = [0.0, 1.0, 1.0, 0.0];
//! let targets = [3.0, 2.0];
//!
//! network.zero_grad();
//! let outputs = network.forward(&inputs, Some(&mut cache)).unwrap();
//! let (_loss, out_grad) = mse(&outputs, &targets).unwrap();
//! network.backward(&cache, &out_grad).unwrap();
//! opt.step_and_empty(&mut network, &mut cache).unwrap();
//! ```

#![warn(missing_docs)]

pub mod activation;
pub mod cache;
pub mod checkpoint;
pub mod config;
pub mod distributed;
pub mod error;
pub mod layer;
pub mod loss;
pub mod network;
pub mod optimizer;
pub mod rl;

// Re-exports
pub use activation::Activation;
pub use cache::{ForwardCache, LayerCache};
pub use checkpoint::{FORMAT_VERSION, MAGIC};
pub use config::{ConfigError, NetworkConfig};
pub use error::{RlnetError, RlnetResult};
pub use layer::DenseLayer;
pub use network::{LayerMut, Network};
pub use optimizer::{Adam, AdamConfig, AdamState, GradientDescent, LayerAdamState, Optimizer};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
