//! Binary weight files.
//!
//! # Format
//!
//! All values little-endian:
//!
//! ```text
//! u32 MAGIC
//! u32 FORMAT_VERSION
//! u32 layer_count
//! per layer:
//!     u32 in_dim
//!     u32 out_dim
//!     f32[out_dim * in_dim]   weights, row-major [out, in]
//!     f32[out_dim]            biases
//! ```
//!
//! Only parameters are stored. Gradients, optimizer moments and caches are
//! runtime state.
//!
//! Loading validates the whole file against the target network before any
//! parameter is written, so a failed load never leaves a half-overwritten
//! network behind.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{RlnetError, RlnetResult};
use crate::network::Network;

/// First four bytes of every weight file.
pub const MAGIC: u32 = 0x4D4C_5031;

/// Layout version written by this build.
pub const FORMAT_VERSION: u32 = 1;

/// Writes the parameters of `network` to `path`.
pub fn save<P: AsRef<Path>>(network: &Network, path: P) -> RlnetResult<()> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);

    writer.write_all(&MAGIC.to_le_bytes())?;
    writer.write_all(&FORMAT_VERSION.to_le_bytes())?;
    writer.write_all(&(network.num_layers() as u32).to_le_bytes())?;

    for layer in network.layers() {
        writer.write_all(&(layer.in_dim() as u32).to_le_bytes())?;
        writer.write_all(&(layer.out_dim() as u32).to_le_bytes())?;
        for &w in layer.weights() {
            writer.write_all(&w.to_le_bytes())?;
        }
        for &b in layer.bias() {
            writer.write_all(&b.to_le_bytes())?;
        }
    }
    writer.flush()?;

    log::debug!(
        "Saved {} layers ({} parameters) to {}",
        network.num_layers(),
        network.param_count(),
        path.display()
    );
    Ok(())
}

/// Loads parameters from `path` into `network`.
///
/// # Errors
///
/// - `Io` if the file can't be read
/// - `BadMagic` / `IncompatibleVersion` for a foreign or newer file
/// - `LayerCountMismatch` / `LayerMismatch` if the stored topology differs
/// - `Truncated` / `TrailingBytes` if the payload length is wrong
///
/// On any error `network` is unchanged.
pub fn load<P: AsRef<Path>>(path: P, network: &mut Network) -> RlnetResult<()> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    let params = decode(&bytes, network)?;

    for (layer, (weights, bias)) in network.layer_stack_mut().iter_mut().zip(params) {
        layer.set_weights(&weights)?;
        layer.set_bias(&bias)?;
    }

    log::debug!(
        "Loaded {} layers from {}",
        network.num_layers(),
        path.display()
    );
    Ok(())
}

/// Parses and validates a whole file against `network`'s topology.
fn decode(bytes: &[u8], network: &Network) -> RlnetResult<Vec<(Vec<f32>, Vec<f32>)>> {
    let mut reader = ByteReader::new(bytes);

    let magic = reader.read_u32()?;
    if magic != MAGIC {
        return Err(RlnetError::BadMagic {
            expected: MAGIC,
            got: magic,
        });
    }

    let version = reader.read_u32()?;
    if version != FORMAT_VERSION {
        return Err(RlnetError::incompatible_version(FORMAT_VERSION, version));
    }

    let layer_count = reader.read_u32()? as usize;
    if layer_count != network.num_layers() {
        return Err(RlnetError::LayerCountMismatch {
            expected: network.num_layers(),
            got: layer_count,
        });
    }

    let mut params = Vec::with_capacity(layer_count);
    for (idx, layer) in network.layers().iter().enumerate() {
        let in_dim = reader.read_u32()? as usize;
        let out_dim = reader.read_u32()? as usize;
        if (in_dim, out_dim) != (layer.in_dim(), layer.out_dim()) {
            return Err(RlnetError::LayerMismatch {
                layer: idx,
                expected: (layer.in_dim(), layer.out_dim()),
                got: (in_dim, out_dim),
            });
        }
        let weights = reader.read_f32s(out_dim * in_dim)?;
        let bias = reader.read_f32s(out_dim)?;
        params.push((weights, bias));
    }

    if reader.remaining() != 0 {
        return Err(RlnetError::TrailingBytes(reader.remaining()));
    }
    Ok(params)
}

/// Little-endian cursor over a byte slice.
struct ByteReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    fn take(&mut self, needed: usize) -> RlnetResult<&'a [u8]> {
        if needed > self.remaining() {
            return Err(RlnetError::Truncated {
                offset: self.offset,
                needed,
                available: self.remaining(),
            });
        }
        let slice = &self.bytes[self.offset..self.offset + needed];
        self.offset += needed;
        Ok(slice)
    }

    fn read_u32(&mut self) -> RlnetResult<u32> {
        let mut word = [0u8; 4];
        word.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(word))
    }

    fn read_f32s(&mut self, count: usize) -> RlnetResult<Vec<f32>> {
        let raw = self.take(count * 4)?;
        Ok(raw
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NetworkConfig;

    fn encode(network: &Network) -> Vec<u8> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("net.bin");
        save(network, &path).unwrap();
        fs::read(&path).unwrap()
    }

    #[test]
    fn test_header_layout() {
        let network = Network::new(&NetworkConfig::mlp(&[3, 2]).with_seed(1)).unwrap();
        let bytes = encode(&network);

        assert_eq!(&bytes[0..4], &MAGIC.to_le_bytes());
        assert_eq!(&bytes[4..8], &FORMAT_VERSION.to_le_bytes());
        assert_eq!(&bytes[8..12], &1u32.to_le_bytes());
        assert_eq!(&bytes[12..16], &3u32.to_le_bytes());
        assert_eq!(&bytes[16..20], &2u32.to_le_bytes());
        // 3 header words, 2 dims, 6 weights, 2 biases
        assert_eq!(bytes.len(), 4 * (3 + 2 + 6 + 2));
    }

    #[test]
    fn test_decode_truncated() {
        let network = Network::new(&NetworkConfig::mlp(&[3, 2]).with_seed(1)).unwrap();
        let bytes = encode(&network);

        let err = decode(&bytes[..bytes.len() - 2], &network).unwrap_err();
        assert!(matches!(err, RlnetError::Truncated { .. }));
    }

    #[test]
    fn test_decode_trailing_bytes() {
        let network = Network::new(&NetworkConfig::mlp(&[3, 2]).with_seed(1)).unwrap();
        let mut bytes = encode(&network);
        bytes.extend_from_slice(&[0, 0, 0]);

        assert!(matches!(
            decode(&bytes, &network),
            Err(RlnetError::TrailingBytes(3))
        ));
    }

    #[test]
    fn test_decode_wrong_version() {
        let network = Network::new(&NetworkConfig::mlp(&[3, 2]).with_seed(1)).unwrap();
        let mut bytes = encode(&network);
        bytes[4..8].copy_from_slice(&(FORMAT_VERSION + 1).to_le_bytes());

        assert!(matches!(
            decode(&bytes, &network),
            Err(RlnetError::IncompatibleVersion { .. })
        ));
    }

    #[test]
    fn test_decode_layer_count() {
        let small = Network::new(&NetworkConfig::mlp(&[3, 2]).with_seed(1)).unwrap();
        let deep = Network::new(&NetworkConfig::mlp(&[3, 2, 2]).with_seed(1)).unwrap();
        let bytes = encode(&small);

        assert!(matches!(
            decode(&bytes, &deep),
            Err(RlnetError::LayerCountMismatch {
                expected: 2,
                got: 1
            })
        ));
    }
}
