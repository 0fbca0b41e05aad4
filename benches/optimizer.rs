//! Optimizer benchmarks: Adam vs gradient descent.
//!
//! Tests:
//! - Step cost on networks of growing size
//! - Adam state allocation
//! - A full REINFORCE iteration on CartPole

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use rlnet::rl::{reinforce_step, BinaryPolicy, CartPole, ExperienceBuffer, ReinforceConfig};
use rlnet::{Adam, AdamConfig, GradientDescent, Network, NetworkConfig, Optimizer};

fn network_with_grads(hidden: usize) -> Network {
    let mut network = Network::new(&NetworkConfig::mlp(&[64, hidden, hidden, 8]).with_seed(1)).unwrap();
    for mut layer in network.layers_mut() {
        for (i, g) in layer.weight_grad_mut().iter_mut().enumerate() {
            *g = ((i % 17) as f32 - 8.0) * 1e-3;
        }
    }
    network
}

fn bench_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("optimizer_step");

    for &hidden in &[32_usize, 128, 512] {
        let mut network = network_with_grads(hidden);
        group.throughput(Throughput::Elements(network.param_count() as u64));

        let mut gd = GradientDescent::new(1e-4);
        group.bench_with_input(BenchmarkId::new("gd", hidden), &hidden, |b, _| {
            b.iter(|| gd.step(black_box(&mut network)).unwrap());
        });

        let mut adam = Adam::new(&network, AdamConfig::with_lr(1e-4));
        group.bench_with_input(BenchmarkId::new("adam", hidden), &hidden, |b, _| {
            b.iter(|| adam.step(black_box(&mut network)).unwrap());
        });
    }

    group.finish();
}

fn bench_adam_init(c: &mut Criterion) {
    let mut group = c.benchmark_group("adam_init");

    for &hidden in &[32_usize, 512] {
        let network = network_with_grads(hidden);
        group.bench_with_input(BenchmarkId::from_parameter(hidden), &hidden, |b, _| {
            b.iter(|| Adam::default_for(black_box(&network)));
        });
    }

    group.finish();
}

fn bench_reinforce_iteration(c: &mut Criterion) {
    let mut rng = SmallRng::seed_from_u64(0);
    let mut env = CartPole::default();
    let mut network = Network::new(&NetworkConfig::cartpole_policy().with_seed(0)).unwrap();
    let mut adam = Adam::default_for(&network);
    let config = ReinforceConfig::default();
    let mut buffer = ExperienceBuffer::new(config.max_steps, 4, 1);
    let mut cache = network.create_cache(config.max_steps);

    c.bench_function("reinforce_iteration", |b| {
        b.iter(|| {
            network.zero_grad();
            let mean = reinforce_step(
                &mut env,
                &mut network,
                &BinaryPolicy,
                &mut buffer,
                &mut cache,
                &config,
                &mut rng,
            )
            .unwrap();
            adam.step_and_empty(&mut network, &mut cache).unwrap();
            black_box(mean)
        });
    });
}

criterion_group!(benches, bench_step, bench_adam_init, bench_reinforce_iteration);
criterion_main!(benches);
