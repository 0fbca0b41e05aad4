//! Tests for forward pass numerical correctness.
//!
//! These tests verify:
//! - Exact outputs and pre-activations on a hand-computed network
//! - Batched affine layers
//! - SIMD dot products against a scalar reference on wide layers
//! - Cached and uncached forward parity

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rlnet::{Activation, DenseLayer, Network, NetworkConfig};

/// 2 -> 2 (relu) -> 1 (identity) with hand-picked parameters.
fn reference_network() -> Network {
    let l0 = DenseLayer::from_parts(
        2,
        2,
        Activation::Relu,
        &[1.0, 2.0, 3.0, 4.0],
        &[2.0, 0.5],
    )
    .unwrap();
    let l1 = DenseLayer::from_parts(2, 1, Activation::Identity, &[2.0, 1.0], &[0.0]).unwrap();
    Network::from_layers(vec![l0, l1]).unwrap()
}

/// Scalar forward used as ground truth.
fn scalar_forward(network: &Network, input: &[f32]) -> Vec<f32> {
    let mut current = input.to_vec();
    for layer in network.layers() {
        let batch = current.len() / layer.in_dim();
        let mut next = vec![0.0f32; batch * layer.out_dim()];
        for b in 0..batch {
            for o in 0..layer.out_dim() {
                let mut z = layer.bias()[o];
                for i in 0..layer.in_dim() {
                    z += current[b * layer.in_dim() + i] * layer.weights()[o * layer.in_dim() + i];
                }
                next[b * layer.out_dim() + o] = layer.activation().apply(z);
            }
        }
        current = next;
    }
    current
}

// =============================================================================
// Deterministic Reference
// =============================================================================

#[test]
fn test_reference_network_output() {
    let network = reference_network();
    let mut cache = network.create_cache(1);

    let out = network.forward(&[1.0, -1.0], Some(&mut cache)).unwrap();

    assert_eq!(out, vec![2.0]);
    assert_eq!(cache.layer(0).pre_activations(), &[1.0, -0.5]);
    assert_eq!(cache.layer(1).pre_activations(), &[2.0]);
    assert_eq!(cache.layer(0).inputs(), &[1.0, -1.0]);
    assert_eq!(cache.layer(1).inputs(), &[1.0, 0.0]);
    assert_eq!(cache.output(), &[2.0]);
}

#[test]
fn test_sum_layer_batch() {
    // (x, y) -> x + y over a batch of 5
    let layer = DenseLayer::from_parts(2, 1, Activation::Identity, &[1.0, 1.0], &[0.0]).unwrap();
    let network = Network::from_layers(vec![layer]).unwrap();

    let input = [0.0, 0.0, 1.0, 2.0, -3.0, 3.0, 0.25, 0.5, 100.0, -1.0];
    let out = network.forward(&input, None).unwrap();

    assert_eq!(out, vec![0.0, 3.0, 0.0, 0.75, 99.0]);
}

#[test]
fn test_every_activation_applied() {
    let acts = [
        Activation::Relu,
        Activation::Sigmoid,
        Activation::Softplus,
        Activation::LogSigmoid,
        Activation::Identity,
    ];
    for act in acts {
        let layer = DenseLayer::from_parts(1, 1, act, &[2.0], &[-0.5]).unwrap();
        let out = layer.forward(&[0.75], None).unwrap();
        let expected = act.apply(1.0);
        assert!(
            (out[0] - expected).abs() < 1e-6,
            "{}: {} vs {}",
            act,
            out[0],
            expected
        );
    }
}

// =============================================================================
// SIMD Dot Product Coverage
// =============================================================================

/// Widths around the 8-lane boundary plus a wide layer.
#[test]
fn test_simd_widths_match_scalar() {
    let mut rng = SmallRng::seed_from_u64(42);
    for &in_dim in &[1usize, 7, 8, 9, 16, 31, 1024] {
        let config = NetworkConfig::mlp(&[in_dim, 5, 3]).with_seed(in_dim as u64);
        let network = Network::new(&config).unwrap();
        let input: Vec<f32> = (0..3 * in_dim).map(|_| rng.gen_range(-1.0..1.0)).collect();

        let fast = network.forward(&input, None).unwrap();
        let slow = scalar_forward(&network, &input);

        for (i, (a, b)) in fast.iter().zip(&slow).enumerate() {
            let tol = 1e-4 * (1.0 + b.abs());
            assert!(
                (a - b).abs() < tol,
                "in_dim={} output[{}]: {} vs {}",
                in_dim,
                i,
                a,
                b
            );
        }
    }
}

// =============================================================================
// Cache Parity
// =============================================================================

#[test]
fn test_cached_and_uncached_outputs_match() {
    let network = Network::new(&NetworkConfig::mlp(&[6, 12, 12, 2]).with_seed(9)).unwrap();
    let input: Vec<f32> = (0..24).map(|i| (i as f32 * 0.37).sin()).collect();
    let mut cache = network.create_cache(4);

    let cached = network.forward(&input, Some(&mut cache)).unwrap();
    let uncached = network.forward(&input, None).unwrap();

    assert_eq!(cached, uncached);
    assert_eq!(cache.len(), 4);
    assert_eq!(cache.output(), cached.as_slice());
}

#[test]
fn test_forward_into_caller_buffer() {
    let network = reference_network();
    let mut out = vec![0.0f32; 2];
    network
        .forward_into(&[1.0, -1.0, 0.0, 0.0], &mut out, None)
        .unwrap();
    // second row: relu(2)=2, relu(0.5)=0.5 -> 2*2 + 0.5
    assert_eq!(out, vec![2.0, 4.5]);

    let mut short = vec![0.0f32; 1];
    assert!(network
        .forward_into(&[1.0, -1.0, 0.0, 0.0], &mut short, None)
        .is_err());
}

#[test]
fn test_wrong_input_width_rejected() {
    let network = reference_network();
    assert!(network.forward(&[1.0, 2.0, 3.0], None).is_err());
}
