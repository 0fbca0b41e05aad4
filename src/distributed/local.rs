//! In-process process group over channels.

use crossbeam::channel::{unbounded, Receiver, Sender};

use super::group::ProcessGroup;
use crate::error::{RlnetError, RlnetResult};

/// In-process group whose members talk over `crossbeam` channels.
///
/// Each ordered pair of ranks gets its own FIFO channel, so consecutive
/// collectives can't overtake each other. Reductions add contributions in
/// rank order, which makes the sum independent of thread scheduling.
///
/// A reduce with a contribution of the wrong length fails on the root and
/// still consumes every message, so the group stays usable.
///
/// Hand one member to each worker thread. Dropping a member while others are
/// still inside a collective makes them fail with `Disconnected`; the group
/// can't be used afterwards.
pub struct LocalGroup {
    rank: usize,
    world_size: usize,
    /// `to[dst]` carries messages from this rank to `dst`.
    to: Vec<Sender<Vec<f32>>>,
    /// `from[src]` carries messages from `src` to this rank.
    from: Vec<Receiver<Vec<f32>>>,
}

impl LocalGroup {
    /// Creates all `world_size` members of a group, indexed by rank.
    pub fn create(world_size: usize) -> Vec<LocalGroup> {
        let mut to: Vec<Vec<Sender<Vec<f32>>>> =
            (0..world_size).map(|_| Vec::with_capacity(world_size)).collect();
        let mut from: Vec<Vec<Receiver<Vec<f32>>>> =
            (0..world_size).map(|_| Vec::with_capacity(world_size)).collect();

        for src in 0..world_size {
            for dst in from.iter_mut() {
                let (tx, rx) = unbounded();
                to[src].push(tx);
                dst.push(rx);
            }
        }

        to.into_iter()
            .zip(from)
            .enumerate()
            .map(|(rank, (to, from))| LocalGroup {
                rank,
                world_size,
                to,
                from,
            })
            .collect()
    }

    fn send(&self, dst: usize, data: Vec<f32>) -> RlnetResult<()> {
        self.to[dst]
            .send(data)
            .map_err(|_| RlnetError::disconnected(format!("rank {} is gone", dst)))
    }

    fn recv_any(&self, src: usize) -> RlnetResult<Vec<f32>> {
        self.from[src]
            .recv()
            .map_err(|_| RlnetError::disconnected(format!("rank {} is gone", src)))
    }

    fn recv(&self, src: usize, len: usize) -> RlnetResult<Vec<f32>> {
        let data = self.recv_any(src)?;
        check_len(&data, len)?;
        Ok(data)
    }
}

fn check_len(data: &[f32], len: usize) -> RlnetResult<()> {
    if data.len() != len {
        return Err(RlnetError::shape_mismatch(&[len], &[data.len()]));
    }
    Ok(())
}

impl ProcessGroup for LocalGroup {
    fn rank(&self) -> usize {
        self.rank
    }

    fn world_size(&self) -> usize {
        self.world_size
    }

    fn broadcast(&self, buf: &mut [f32], root: usize) -> RlnetResult<()> {
        self.check_rank(root)?;

        if self.rank == root {
            for dst in (0..self.world_size).filter(|&r| r != root) {
                self.send(dst, buf.to_vec())?;
            }
        } else {
            let data = self.recv(root, buf.len())?;
            buf.copy_from_slice(&data);
        }
        Ok(())
    }

    fn reduce_sum(&self, buf: &mut [f32], root: usize) -> RlnetResult<()> {
        self.check_rank(root)?;

        if self.rank != root {
            return self.send(root, buf.to_vec());
        }

        // Drain every peer before validating: a rejected round must not
        // leave messages queued for the next collective.
        let mut contributions = Vec::with_capacity(self.world_size - 1);
        for src in (0..self.world_size).filter(|&r| r != root) {
            contributions.push(self.recv_any(src)?);
        }
        for data in &contributions {
            check_len(data, buf.len())?;
        }

        let mut sum = vec![0.0f32; buf.len()];
        let mut peers = contributions.iter();
        for src in 0..self.world_size {
            let data: &[f32] = if src == root {
                &*buf
            } else {
                match peers.next() {
                    Some(data) => data.as_slice(),
                    None => break,
                }
            };
            for (s, &x) in sum.iter_mut().zip(data) {
                *s += x;
            }
        }
        buf.copy_from_slice(&sum);
        Ok(())
    }
}
