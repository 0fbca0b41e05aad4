//! Parameter vectors and the two network-level collectives.
//!
//! The parameter vector concatenates, layer by layer, the row-major weights
//! followed by the biases. Gradients are flattened the same way, so a
//! gradient vector lines up element for element with the parameter vector.

use super::group::ProcessGroup;
use crate::error::{RlnetError, RlnetResult};
use crate::network::Network;

/// Flattens every weight and bias into one vector.
pub fn flatten_params(network: &Network) -> Vec<f32> {
    let mut flat = Vec::with_capacity(network.param_count());
    for layer in network.layers() {
        flat.extend_from_slice(layer.weights());
        flat.extend_from_slice(layer.bias());
    }
    flat
}

/// Overwrites every weight and bias from a parameter vector.
///
/// # Errors
///
/// `ShapeMismatch` if `flat.len() != network.param_count()`. The network is
/// untouched in that case.
pub fn unflatten_params(network: &mut Network, flat: &[f32]) -> RlnetResult<()> {
    check_len(network, flat)?;

    let mut offset = 0;
    for layer in network.layer_stack_mut() {
        let w_len = layer.weights().len();
        let b_len = layer.bias().len();
        layer
            .weights_mut()
            .copy_from_slice(&flat[offset..offset + w_len]);
        offset += w_len;
        layer.bias_mut().copy_from_slice(&flat[offset..offset + b_len]);
        offset += b_len;
    }
    Ok(())
}

/// Flattens every gradient accumulator, in parameter-vector order.
pub fn flatten_grads(network: &Network) -> Vec<f32> {
    let mut flat = Vec::with_capacity(network.param_count());
    for layer in network.layers() {
        flat.extend_from_slice(layer.weight_grad());
        flat.extend_from_slice(layer.bias_grad());
    }
    flat
}

/// Overwrites every gradient accumulator from a gradient vector.
pub fn unflatten_grads(network: &mut Network, flat: &[f32]) -> RlnetResult<()> {
    check_len(network, flat)?;

    let mut offset = 0;
    for layer in network.layer_stack_mut() {
        let w_len = layer.weight_grad().len();
        let b_len = layer.bias_grad().len();
        layer
            .weight_grad_mut()
            .copy_from_slice(&flat[offset..offset + w_len]);
        offset += w_len;
        layer
            .bias_grad_mut()
            .copy_from_slice(&flat[offset..offset + b_len]);
        offset += b_len;
    }
    Ok(())
}

/// Replaces every member's parameters with those of `source_rank`.
///
/// Collective: every member of `group` must call it with the same
/// `source_rank` and a network of the same topology.
pub fn broadcast_weights<G: ProcessGroup + ?Sized>(
    network: &mut Network,
    group: &G,
    source_rank: usize,
) -> RlnetResult<()> {
    group.check_rank(source_rank)?;

    let is_source = group.rank() == source_rank;
    let mut flat = if is_source {
        flatten_params(network)
    } else {
        vec![0.0f32; network.param_count()]
    };

    group.broadcast(&mut flat, source_rank)?;

    if !is_source {
        unflatten_params(network, &flat)?;
    }
    log::debug!(
        "rank {}: synchronized {} parameters from rank {}",
        group.rank(),
        flat.len(),
        source_rank
    );
    Ok(())
}

/// Sums every member's gradients onto `root_rank`.
///
/// No averaging is done; divide by [`ProcessGroup::world_size`] if a mean is
/// needed. On the root, the accumulators hold the sum afterwards. On every
/// other member their content is unspecified and must be zeroed with
/// [`Network::zero_grad`] before the next accumulation window.
pub fn aggregate_gradients<G: ProcessGroup + ?Sized>(
    network: &mut Network,
    group: &G,
    root_rank: usize,
) -> RlnetResult<()> {
    group.check_rank(root_rank)?;

    let mut flat = flatten_grads(network);
    group.reduce_sum(&mut flat, root_rank)?;

    if group.rank() == root_rank {
        unflatten_grads(network, &flat)?;
    }
    log::debug!(
        "rank {}: reduced {} gradients onto rank {}",
        group.rank(),
        flat.len(),
        root_rank
    );
    Ok(())
}

fn check_len(network: &Network, flat: &[f32]) -> RlnetResult<()> {
    if flat.len() != network.param_count() {
        return Err(RlnetError::shape_mismatch(
            &[network.param_count()],
            &[flat.len()],
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::Activation;
    use crate::config::NetworkConfig;
    use crate::distributed::SoloGroup;
    use crate::layer::DenseLayer;

    #[test]
    fn test_flatten_order() {
        let l0 = DenseLayer::from_parts(2, 2, Activation::Relu, &[1.0, 2.0, 3.0, 4.0], &[5.0, 6.0])
            .unwrap();
        let l1 = DenseLayer::from_parts(2, 1, Activation::Identity, &[7.0, 8.0], &[9.0]).unwrap();
        let network = Network::from_layers(vec![l0, l1]).unwrap();

        assert_eq!(
            flatten_params(&network),
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]
        );
    }

    #[test]
    fn test_unflatten_length_checked() {
        let mut network = Network::new(&NetworkConfig::mlp(&[3, 4, 2]).with_seed(5)).unwrap();
        let before = flatten_params(&network);

        let err = unflatten_params(&mut network, &before[1..]).unwrap_err();
        assert!(matches!(err, RlnetError::ShapeMismatch { .. }));
        assert_eq!(flatten_params(&network), before);
        assert!(unflatten_grads(&mut network, &[0.0; 3]).is_err());
    }

    #[test]
    fn test_grads_round_trip() {
        let mut network = Network::new(&NetworkConfig::mlp(&[3, 4, 2]).with_seed(5)).unwrap();
        let grads: Vec<f32> = (0..network.param_count()).map(|i| i as f32 * 0.5).collect();

        unflatten_grads(&mut network, &grads).unwrap();
        assert_eq!(flatten_grads(&network), grads);
        // parameters untouched
        assert_ne!(flatten_params(&network), grads);
    }

    #[test]
    fn test_solo_group_collectives() {
        let mut network = Network::new(&NetworkConfig::mlp(&[2, 2]).with_seed(1)).unwrap();
        let params = flatten_params(&network);
        network.layer_mut(0).bias_grad_mut()[0] = 3.0;

        broadcast_weights(&mut network, &SoloGroup, 0).unwrap();
        aggregate_gradients(&mut network, &SoloGroup, 0).unwrap();

        assert_eq!(flatten_params(&network), params);
        assert_eq!(network.layers()[0].bias_grad()[0], 3.0);
        assert!(broadcast_weights(&mut network, &SoloGroup, 1).is_err());
    }
}
