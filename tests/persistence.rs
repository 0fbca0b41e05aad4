//! Tests for weight file save/load.
//!
//! These tests verify:
//! - A saved network loads back bit-exact into a fresh network
//! - The on-disk header layout
//! - Every rejection path leaves the target network untouched

use std::fs;

use rlnet::distributed::flatten_params;
use rlnet::{Network, NetworkConfig, RlnetError, FORMAT_VERSION, MAGIC};
use tempfile::TempDir;

fn network(sizes: &[usize], seed: u64) -> Network {
    Network::new(&NetworkConfig::mlp(sizes).with_seed(seed)).unwrap()
}

fn bits(network: &Network) -> Vec<u32> {
    flatten_params(network).iter().map(|x| x.to_bits()).collect()
}

// =============================================================================
// Round Trip
// =============================================================================

#[test]
fn test_save_load_exact() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("policy.bin");

    let source = network(&[4, 64, 1], 1);
    source.save(&path).unwrap();

    let mut target = network(&[4, 64, 1], 2);
    assert_ne!(bits(&source), bits(&target));
    target.load_into(&path).unwrap();
    assert_eq!(bits(&source), bits(&target));

    let input = [0.1, -0.2, 0.3, -0.4];
    assert_eq!(
        source.forward(&input, None).unwrap(),
        target.forward(&input, None).unwrap()
    );
}

#[test]
fn test_file_layout() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("layout.bin");

    let source = network(&[3, 2], 0);
    source.save(&path).unwrap();
    let bytes = fs::read(&path).unwrap();

    let word = |i: usize| u32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);
    assert_eq!(word(0), MAGIC);
    assert_eq!(word(4), FORMAT_VERSION);
    assert_eq!(word(8), 1);
    assert_eq!(word(12), 3);
    assert_eq!(word(16), 2);
    // header + dims + 6 weights + 2 biases
    assert_eq!(bytes.len(), 20 + 8 * 4);

    let first_weight = f32::from_le_bytes([bytes[20], bytes[21], bytes[22], bytes[23]]);
    assert_eq!(first_weight, source.layers()[0].weights()[0]);
}

#[test]
fn test_gradients_not_saved() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("grads.bin");

    let mut source = network(&[2, 1], 0);
    let mut cache = source.create_cache(1);
    source.forward(&[1.0, 1.0], Some(&mut cache)).unwrap();
    source.backward(&cache, &[1.0]).unwrap();
    source.save(&path).unwrap();

    let mut target = network(&[2, 1], 5);
    target.load_into(&path).unwrap();
    assert_eq!(target.layers()[0].bias_grad(), &[0.0]);
}

// =============================================================================
// Rejections
// =============================================================================

#[test]
fn test_mismatched_layer_dims_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("wide.bin");
    network(&[4, 32, 1], 1).save(&path).unwrap();

    let mut target = network(&[4, 64, 1], 2);
    let before = bits(&target);

    assert!(matches!(
        target.load_into(&path),
        Err(RlnetError::LayerMismatch { layer: 0, .. })
    ));
    assert_eq!(bits(&target), before);
}

#[test]
fn test_mismatched_layer_count_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("deep.bin");
    network(&[4, 8, 8, 1], 1).save(&path).unwrap();

    let mut target = network(&[4, 8, 1], 2);
    let before = bits(&target);

    assert!(matches!(
        target.load_into(&path),
        Err(RlnetError::LayerCountMismatch { expected: 2, got: 3 })
    ));
    assert_eq!(bits(&target), before);
}

#[test]
fn test_bad_magic_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("magic.bin");
    let source = network(&[2, 1], 0);
    source.save(&path).unwrap();

    let mut bytes = fs::read(&path).unwrap();
    bytes[0] ^= 0xFF;
    fs::write(&path, &bytes).unwrap();

    let mut target = network(&[2, 1], 3);
    let before = bits(&target);
    assert!(matches!(
        target.load_into(&path),
        Err(RlnetError::BadMagic { .. })
    ));
    assert_eq!(bits(&target), before);
}

#[test]
fn test_future_version_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("version.bin");
    network(&[2, 1], 0).save(&path).unwrap();

    let mut bytes = fs::read(&path).unwrap();
    bytes[4..8].copy_from_slice(&(FORMAT_VERSION + 1).to_le_bytes());
    fs::write(&path, &bytes).unwrap();

    let mut target = network(&[2, 1], 3);
    assert!(matches!(
        target.load_into(&path),
        Err(RlnetError::IncompatibleVersion { .. })
    ));
}

#[test]
fn test_truncated_and_trailing_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("length.bin");
    network(&[3, 4, 1], 0).save(&path).unwrap();
    let bytes = fs::read(&path).unwrap();

    let mut target = network(&[3, 4, 1], 9);
    let before = bits(&target);

    fs::write(&path, &bytes[..bytes.len() - 2]).unwrap();
    assert!(matches!(
        target.load_into(&path),
        Err(RlnetError::Truncated { .. })
    ));

    let mut longer = bytes.clone();
    longer.extend_from_slice(&[0, 0, 0, 0]);
    fs::write(&path, &longer).unwrap();
    assert!(matches!(
        target.load_into(&path),
        Err(RlnetError::TrailingBytes(4))
    ));

    assert_eq!(bits(&target), before);
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let mut target = network(&[2, 1], 0);
    assert!(matches!(
        target.load_into(dir.path().join("nope.bin")),
        Err(RlnetError::Io(_))
    ));
}
