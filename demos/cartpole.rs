//! CartPole REINFORCE Example for rlnet
//!
//! Trains a Bernoulli policy on CartPole with two data-parallel workers.
//!
//! # Features Demonstrated
//!
//! - Policy network configuration and initialization
//! - Rollouts feeding a forward cache one step at a time
//! - Gradient aggregation and weight broadcast across threads
//! - Adam updates on the root worker
//! - Saving the trained weights
//!
//! # Run
//!
//! ```bash
//! cargo run --example cartpole
//! ```

use std::thread;

use rand::rngs::SmallRng;
use rand::SeedableRng;
use rlnet::distributed::{aggregate_gradients, broadcast_weights, LocalGroup, ProcessGroup};
use rlnet::rl::{reinforce_step, BinaryPolicy, CartPole, ExperienceBuffer, ReinforceConfig};
use rlnet::{Adam, AdamConfig, Network, NetworkConfig, Optimizer};

const WORKERS: usize = 2;
const ITERATIONS: usize = 200;
const ROOT: usize = 0;

fn main() {
    println!("=== rlnet CartPole Example ===\n");

    let config = NetworkConfig::cartpole_policy();
    config.validate().expect("Invalid config");
    println!("Policy: {:?}", config.layer_sizes);
    println!("Workers: {}\n", WORKERS);

    let handles: Vec<_> = LocalGroup::create(WORKERS)
        .into_iter()
        .map(|group| {
            let config = config.clone().with_seed(group.rank() as u64);
            thread::spawn(move || worker(group, config))
        })
        .collect();

    for handle in handles {
        if let Some(network) = handle.join().expect("worker panicked") {
            println!("\n{}", network);
            let path = std::env::temp_dir().join("rlnet_cartpole.bin");
            network.save(&path).expect("save failed");
            println!("Weights saved to {}", path.display());
        }
    }
}

/// Runs the training loop; the root returns its trained network.
fn worker(group: LocalGroup, config: NetworkConfig) -> Option<Network> {
    let rank = group.rank();
    let mut network = Network::new(&config).expect("network");
    broadcast_weights(&mut network, &group, ROOT).expect("broadcast");

    let mut adam = Adam::new(&network, AdamConfig::with_lr(1e-2));
    let reinforce = ReinforceConfig::default();
    let mut buffer = ExperienceBuffer::new(reinforce.max_steps, 4, 1);
    let mut cache = network.create_cache(reinforce.max_steps);
    let mut env = CartPole::default();
    let mut rng = SmallRng::seed_from_u64(1000 + rank as u64);

    for iter in 0..ITERATIONS {
        network.zero_grad();
        let mean = reinforce_step(
            &mut env,
            &mut network,
            &BinaryPolicy,
            &mut buffer,
            &mut cache,
            &reinforce,
            &mut rng,
        )
        .expect("reinforce step");

        aggregate_gradients(&mut network, &group, ROOT).expect("aggregate");
        if rank == ROOT {
            adam.step(&mut network).expect("adam step");
        }
        cache.empty();
        broadcast_weights(&mut network, &group, ROOT).expect("broadcast");

        if rank == ROOT && iter % 20 == 0 {
            println!("iter {:4}  mean return {:6.1}", iter, mean);
        }
    }

    (rank == ROOT).then_some(network)
}
