//! Collective transport contract.

use crate::error::{RlnetError, RlnetResult};

/// A fixed set of workers able to run collectives over `f32` buffers.
///
/// Both collectives are blocking and must be entered by every member with
/// buffers of the same length:
/// - **broadcast**: `root`'s buffer is copied, unchanged, into every other
///   member's buffer
/// - **reduce-sum**: the element-wise sum of all buffers is written into
///   `root`'s buffer; the other buffers are left as they were
pub trait ProcessGroup: Send {
    /// Returns the rank of the current worker.
    fn rank(&self) -> usize;

    /// Returns the total number of workers.
    fn world_size(&self) -> usize;

    /// Copies `root`'s `buf` into every member's `buf`.
    fn broadcast(&self, buf: &mut [f32], root: usize) -> RlnetResult<()>;

    /// Sums every member's `buf` into `root`'s `buf`.
    fn reduce_sum(&self, buf: &mut [f32], root: usize) -> RlnetResult<()>;

    /// Fails with `InvalidRank` unless `rank` belongs to the group.
    fn check_rank(&self, rank: usize) -> RlnetResult<()> {
        if rank >= self.world_size() {
            return Err(RlnetError::invalid_rank(rank, self.world_size()));
        }
        Ok(())
    }
}

/// Group of one. Both collectives are no-ops.
#[derive(Debug, Clone, Copy, Default)]
pub struct SoloGroup;

impl ProcessGroup for SoloGroup {
    fn rank(&self) -> usize {
        0
    }

    fn world_size(&self) -> usize {
        1
    }

    fn broadcast(&self, _buf: &mut [f32], root: usize) -> RlnetResult<()> {
        self.check_rank(root)
    }

    fn reduce_sum(&self, _buf: &mut [f32], root: usize) -> RlnetResult<()> {
        self.check_rank(root)
    }
}
