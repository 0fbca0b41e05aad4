//! Policy-gradient collaborators built on the dense engine.
//!
//! The engine itself only sees observation batches and `out_grad` vectors.
//! This module supplies the pieces around it:
//!
//! - [`Environment`] and the [`CartPole`] reference environment
//! - [`Policy`] and the Bernoulli [`BinaryPolicy`]
//! - [`ExperienceBuffer`], [`rollout`] and return computation
//! - [`reinforce_step`], one REINFORCE gradient over a fresh trajectory
//!
//! # Example
//!
//! ```rust
//! use rand::rngs::SmallRng;
//! use rand::SeedableRng;
//! use rlnet::rl::{reinforce_step, BinaryPolicy, CartPole, ExperienceBuffer, ReinforceConfig};
//! use rlnet::{GradientDescent, Network, NetworkConfig, Optimizer};
//!
//! let mut rng = SmallRng::seed_from_u64(0);
//! let mut env = CartPole::default();
//! let mut network = Network::new(&NetworkConfig::cartpole_policy().with_seed(0)).unwrap();
//! let config = ReinforceConfig::default();
//! let mut buffer = ExperienceBuffer::new(config.max_steps, 4, 1);
//! let mut cache = network.create_cache(config.max_steps);
//! let mut opt = GradientDescent::new(1e-3);
//!
//! network.zero_grad();
//! let mean_return = reinforce_step(
//!     &mut env, &mut network, &BinaryPolicy, &mut buffer, &mut cache, &config, &mut rng,
//! )
//! .unwrap();
//! opt.step_and_empty(&mut network, &mut cache).unwrap();
//! assert!(mean_return >= 1.0);
//! ```

pub mod buffer;
pub mod cartpole;
pub mod env;
pub mod policy;
pub mod reinforce;

pub use buffer::{discounted_returns, mean_return, rollout, ExperienceBuffer};
pub use cartpole::CartPole;
pub use env::{Environment, StepOutcome};
pub use policy::{BinaryPolicy, Policy};
pub use reinforce::{reinforce_step, ReinforceConfig};
