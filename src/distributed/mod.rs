//! Data-parallel synchronization of network replicas.
//!
//! Every worker owns a full copy of the [`Network`](crate::Network) and its
//! optimizer. Workers only meet in two blocking collectives:
//!
//! - [`broadcast_weights`]: one worker's parameters overwrite everyone else's
//! - [`aggregate_gradients`]: gradients are summed onto one root worker
//!
//! Both go through a [`ProcessGroup`], which only has to provide a broadcast
//! and a reduce-sum over contiguous `f32` buffers. Every worker of the group
//! must make the same sequence of collective calls; a worker that never
//! arrives blocks the others indefinitely.
//!
//! # Example
//!
//! ```rust
//! use std::thread;
//! use rlnet::distributed::{aggregate_gradients, broadcast_weights, LocalGroup, ProcessGroup};
//! use rlnet::{Network, NetworkConfig};
//!
//! let handles: Vec<_> = LocalGroup::create(2)
//!     .into_iter()
//!     .map(|group| {
//!         thread::spawn(move || {
//!             let config = NetworkConfig::mlp(&[2, 4, 1]).with_seed(group.rank() as u64);
//!             let mut network = Network::new(&config).unwrap();
//!             broadcast_weights(&mut network, &group, 0).unwrap();
//!             aggregate_gradients(&mut network, &group, 0).unwrap();
//!         })
//!     })
//!     .collect();
//!
//! for handle in handles {
//!     handle.join().unwrap();
//! }
//! ```

pub mod group;
pub mod local;
pub mod sync;

pub use group::{ProcessGroup, SoloGroup};
pub use local::LocalGroup;
pub use sync::{
    aggregate_gradients, broadcast_weights, flatten_grads, flatten_params, unflatten_grads,
    unflatten_params,
};
