//! Unified error types for rlnet.
//!
//! This module provides [`RlnetError`], the error type returned by every
//! fallible operation of the engine. It uses the `thiserror` crate for
//! ergonomic error handling.
//!
//! # Example
//!
//! ```rust
//! use rlnet::RlnetError;
//!
//! fn validate_width(expected: usize, got: usize) -> Result<(), RlnetError> {
//!     if expected != got {
//!         return Err(RlnetError::shape_mismatch(&[expected], &[got]));
//!     }
//!     Ok(())
//! }
//! assert!(validate_width(3, 4).is_err());
//! ```

use thiserror::Error;

use crate::config::ConfigError;

/// Unified error type for rlnet operations.
#[derive(Error, Debug)]
pub enum RlnetError {
    /// Shape mismatch between expected and actual buffer shapes.
    ///
    /// Raised for wrong batch widths, mismatched layer chaining and
    /// parameter vectors of the wrong length.
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// Expected shape.
        expected: Vec<usize>,
        /// Actual shape received.
        got: Vec<usize>,
    },

    /// Appending to a layer cache would exceed its capacity.
    #[error("Cache overflow: {requested} rows requested, {remaining} remaining")]
    CacheOverflow {
        /// Rows the caller tried to append.
        requested: usize,
        /// Rows still free in the cache.
        remaining: usize,
    },

    /// Backward was called on a cache holding no rows.
    #[error("Backward pass over an empty forward cache")]
    EmptyCache,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O error during weight save/load.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Weight file does not start with the expected magic value.
    #[error("Bad magic: expected {expected:#010x}, got {got:#010x}")]
    BadMagic {
        /// Expected magic.
        expected: u32,
        /// Magic found in the file.
        got: u32,
    },

    /// Incompatible weight file version.
    #[error("Incompatible format version: expected {expected}, got {got}")]
    IncompatibleVersion {
        /// Version this build writes.
        expected: u32,
        /// Version found in the file.
        got: u32,
    },

    /// Weight file holds a different number of layers than the network.
    #[error("Layer count mismatch: network has {expected}, file has {got}")]
    LayerCountMismatch {
        /// Layers in the in-memory network.
        expected: usize,
        /// Layers declared by the file.
        got: usize,
    },

    /// A layer's `(in, out)` dimensions in the file differ from the network.
    #[error("Layer {layer} mismatch: network is {expected:?}, file is {got:?}")]
    LayerMismatch {
        /// Layer index.
        layer: usize,
        /// `(in_dim, out_dim)` of the in-memory layer.
        expected: (usize, usize),
        /// `(in_dim, out_dim)` declared by the file.
        got: (usize, usize),
    },

    /// Weight file ended before all declared data was read.
    #[error("Truncated weight file: needed {needed} bytes at offset {offset}, {available} available")]
    Truncated {
        /// Byte offset of the failed read.
        offset: usize,
        /// Bytes required.
        needed: usize,
        /// Bytes left in the file.
        available: usize,
    },

    /// Weight file has bytes after the last layer.
    #[error("Weight file has {0} trailing bytes")]
    TrailingBytes(usize),

    /// A collective was called with a rank outside the group.
    #[error("Rank {rank} out of bounds (world size {world_size})")]
    InvalidRank {
        /// Offending rank.
        rank: usize,
        /// Size of the process group.
        world_size: usize,
    },

    /// A peer of the process group went away mid-collective.
    #[error("Process group disconnected: {0}")]
    Disconnected(String),
}

/// Result type alias for rlnet operations.
pub type RlnetResult<T> = Result<T, RlnetError>;

impl RlnetError {
    /// Creates a shape mismatch error.
    pub fn shape_mismatch(expected: &[usize], got: &[usize]) -> Self {
        RlnetError::ShapeMismatch {
            expected: expected.to_vec(),
            got: got.to_vec(),
        }
    }

    /// Creates a cache overflow error.
    pub fn cache_overflow(requested: usize, remaining: usize) -> Self {
        RlnetError::CacheOverflow {
            requested,
            remaining,
        }
    }

    /// Creates an incompatible version error.
    pub fn incompatible_version(expected: u32, got: u32) -> Self {
        RlnetError::IncompatibleVersion { expected, got }
    }

    /// Creates an invalid rank error.
    pub fn invalid_rank(rank: usize, world_size: usize) -> Self {
        RlnetError::InvalidRank { rank, world_size }
    }

    /// Creates a disconnected error.
    pub fn disconnected<S: Into<String>>(msg: S) -> Self {
        RlnetError::Disconnected(msg.into())
    }
}
