//! Thin façade over serial, intra-process, or inter-process (MPI) collectives.
//!
//! Payloads are *contiguous byte buffers*; typed values go through
//! [`CommunicatorExt`], which encodes them with [`crate::algs::wire`].
//! Every collective blocks until all ranks of the communicator reach it.
//! There is no timeout: a rank that never arrives hangs the others, so callers
//! must keep ranks in lockstep around collective calls.

use std::cell::Cell;
use std::sync::{Arc, Barrier};

use bytes::Bytes;
use dashmap::DashMap;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::algs::wire;
use crate::dist_error::DistError;

/// Collective communication interface.
pub trait Communicator {
    /// This process's rank, `0 <= rank < size`.
    fn rank(&self) -> usize;
    /// Number of ranks in the communicator, at least 1.
    fn size(&self) -> usize;
    /// Block until every rank has called `barrier`.
    fn barrier(&self);
    /// Gather one buffer per rank onto `root`; `Some(parts)` in rank order on
    /// the root, `None` elsewhere.
    fn gather_bytes(&self, buf: &[u8], root: usize) -> Result<Option<Vec<Vec<u8>>>, DistError>;
    /// Broadcast the root's buffer; the argument is ignored on other ranks.
    fn broadcast_bytes(&self, buf: Vec<u8>, root: usize) -> Result<Vec<u8>, DistError>;

    /// True for the serial stand-in.
    fn is_no_comm(&self) -> bool {
        false
    }
}

/// Typed collectives layered over the byte-level [`Communicator`].
pub trait CommunicatorExt: Communicator {
    /// Gather `value` from every rank onto `root`.
    fn gather<T>(&self, value: &T, root: usize) -> Result<Option<Vec<T>>, DistError>
    where
        T: Serialize + DeserializeOwned,
    {
        check_root(root, self.size())?;
        let buf = wire::encode(value)?;
        match self.gather_bytes(&buf, root)? {
            Some(parts) => parts
                .iter()
                .map(|p| wire::decode(p))
                .collect::<Result<Vec<T>, _>>()
                .map(Some),
            None => Ok(None),
        }
    }

    /// Broadcast the root's `value` to every rank. Non-root ranks pass `None`.
    fn broadcast<T>(&self, value: Option<&T>, root: usize) -> Result<T, DistError>
    where
        T: Serialize + DeserializeOwned,
    {
        check_root(root, self.size())?;
        let buf = if self.rank() == root {
            let v = value.ok_or_else(|| {
                DistError::Comm(format!("broadcast root {root} supplied no value"))
            })?;
            wire::encode(v)?
        } else {
            Vec::new()
        };
        wire::decode(&self.broadcast_bytes(buf, root)?)
    }
}

impl<C: Communicator + ?Sized> CommunicatorExt for C {}

pub(crate) fn check_root(root: usize, size: usize) -> Result<(), DistError> {
    if root >= size {
        Err(DistError::InvalidRoot { root, size })
    } else {
        Ok(())
    }
}

/// Single-process stand-in: rank 0 of 1, every collective is the identity.
#[derive(Clone, Debug, Default)]
pub struct NoComm;

impl Communicator for NoComm {
    fn rank(&self) -> usize {
        0
    }
    fn size(&self) -> usize {
        1
    }
    fn barrier(&self) {}
    fn gather_bytes(&self, buf: &[u8], root: usize) -> Result<Option<Vec<Vec<u8>>>, DistError> {
        check_root(root, 1)?;
        Ok(Some(vec![buf.to_vec()]))
    }
    fn broadcast_bytes(&self, buf: Vec<u8>, root: usize) -> Result<Vec<u8>, DistError> {
        check_root(root, 1)?;
        Ok(buf)
    }
    fn is_no_comm(&self) -> bool {
        true
    }
}

// --- LocalComm: intra-process ranks, one thread each ---
type Key = (usize, usize, u64); // (src, dst, collective sequence number)

struct LocalWorld {
    size: usize,
    mailbox: DashMap<Key, Bytes>,
    barrier: Barrier,
}

/// One rank of an in-process world. Each rank must live on its own thread.
///
/// Ranks number their collectives independently; as long as every rank issues
/// the same sequence of collectives, messages pair up without tags.
pub struct LocalComm {
    rank: usize,
    world: Arc<LocalWorld>,
    seq: Cell<u64>,
}

impl LocalComm {
    /// Create the `size` ranks of a fresh world, in rank order.
    pub fn world(size: usize) -> Vec<LocalComm> {
        let size = size.max(1);
        let world = Arc::new(LocalWorld {
            size,
            mailbox: DashMap::new(),
            barrier: Barrier::new(size),
        });
        (0..size)
            .map(|rank| LocalComm {
                rank,
                world: Arc::clone(&world),
                seq: Cell::new(0),
            })
            .collect()
    }

    fn next_seq(&self) -> u64 {
        let s = self.seq.get();
        self.seq.set(s + 1);
        s
    }

    fn post(&self, dst: usize, seq: u64, buf: Bytes) {
        self.world.mailbox.insert((self.rank, dst, seq), buf);
    }

    fn take(&self, src: usize, seq: u64) -> Bytes {
        let key = (src, self.rank, seq);
        loop {
            if let Some((_, bytes)) = self.world.mailbox.remove(&key) {
                return bytes;
            }
            std::thread::yield_now();
        }
    }
}

impl Communicator for LocalComm {
    fn rank(&self) -> usize {
        self.rank
    }
    fn size(&self) -> usize {
        self.world.size
    }
    fn barrier(&self) {
        self.world.barrier.wait();
    }
    fn gather_bytes(&self, buf: &[u8], root: usize) -> Result<Option<Vec<Vec<u8>>>, DistError> {
        check_root(root, self.world.size)?;
        let seq = self.next_seq();
        if self.rank != root {
            self.post(root, seq, Bytes::copy_from_slice(buf));
            return Ok(None);
        }
        let parts = (0..self.world.size)
            .map(|src| {
                if src == root {
                    buf.to_vec()
                } else {
                    self.take(src, seq).to_vec()
                }
            })
            .collect();
        Ok(Some(parts))
    }
    fn broadcast_bytes(&self, buf: Vec<u8>, root: usize) -> Result<Vec<u8>, DistError> {
        check_root(root, self.world.size)?;
        let seq = self.next_seq();
        if self.rank == root {
            let shared = Bytes::from(buf);
            for dst in (0..self.world.size).filter(|&d| d != root) {
                self.post(dst, seq, shared.clone());
            }
            Ok(shared.to_vec())
        } else {
            Ok(self.take(root, seq).to_vec())
        }
    }
}

/// Run `f` once per rank of a fresh [`LocalComm`] world, each on its own
/// thread, and return the results in rank order.
pub fn spawn_world<F, R>(size: usize, f: F) -> Vec<R>
where
    F: Fn(LocalComm) -> R + Sync,
    R: Send,
{
    let comms = LocalComm::world(size);
    std::thread::scope(|scope| {
        let handles: Vec<_> = comms
            .into_iter()
            .map(|comm| {
                let f = &f;
                scope.spawn(move || f(comm))
            })
            .collect();
        handles
            .into_iter()
            .map(|h| match h.join() {
                Ok(r) => r,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    })
}

// --- MPI backend (feature = "mpi-support") ---
#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::{Communicator, check_root};
    use crate::dist_error::DistError;
    use mpi::Count;
    use mpi::datatype::PartitionMut;
    use mpi::environment::Universe;
    use mpi::topology::{Communicator as MpiCommunicator, SimpleCommunicator};
    use mpi::traits::{CommunicatorCollectives, Root};

    /// World communicator of a real MPI job. Finalizes MPI on drop.
    pub struct MpiComm {
        // Field order matters: the communicator must drop before the universe.
        world: SimpleCommunicator,
        _universe: Universe,
        rank: usize,
        size: usize,
    }

    impl MpiComm {
        pub fn new() -> Result<Self, DistError> {
            let universe = mpi::initialize()
                .ok_or_else(|| DistError::Comm("MPI already initialized".into()))?;
            let world = universe.world();
            let rank = world.rank() as usize;
            let size = world.size() as usize;
            log::debug!("MPI world initialized: rank {rank} of {size}");
            Ok(Self {
                world,
                _universe: universe,
                rank,
                size,
            })
        }
    }

    impl Communicator for MpiComm {
        fn rank(&self) -> usize {
            self.rank
        }
        fn size(&self) -> usize {
            self.size
        }
        fn barrier(&self) {
            self.world.barrier();
        }
        fn gather_bytes(
            &self,
            buf: &[u8],
            root: usize,
        ) -> Result<Option<Vec<Vec<u8>>>, DistError> {
            check_root(root, self.size)?;
            let root_proc = self.world.process_at_rank(root as i32);
            let count = Count::try_from(buf.len())
                .map_err(|_| DistError::Comm(format!("payload of {} bytes too large", buf.len())))?;
            if self.rank != root {
                root_proc.gather_into(&count);
                root_proc.gather_varcount_into(buf);
                return Ok(None);
            }
            let mut counts: Vec<Count> = vec![0; self.size];
            root_proc.gather_into_root(&count, &mut counts[..]);
            let displs: Vec<Count> = counts
                .iter()
                .scan(0, |acc, &c| {
                    let d = *acc;
                    *acc += c;
                    Some(d)
                })
                .collect();
            let total: usize = counts.iter().map(|&c| c as usize).sum();
            let mut recv = vec![0u8; total];
            {
                let mut partition = PartitionMut::new(&mut recv[..], &counts[..], &displs[..]);
                root_proc.gather_varcount_into_root(buf, &mut partition);
            }
            let parts = counts
                .iter()
                .zip(&displs)
                .map(|(&c, &d)| recv[d as usize..(d + c) as usize].to_vec())
                .collect();
            Ok(Some(parts))
        }
        fn broadcast_bytes(&self, buf: Vec<u8>, root: usize) -> Result<Vec<u8>, DistError> {
            check_root(root, self.size)?;
            let root_proc = self.world.process_at_rank(root as i32);
            let mut len = buf.len() as u64;
            root_proc.broadcast_into(&mut len);
            let mut out = if self.rank == root {
                buf
            } else {
                vec![0u8; len as usize]
            };
            root_proc.broadcast_into(&mut out[..]);
            Ok(out)
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::MpiComm;
