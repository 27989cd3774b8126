//! Checkpoint discipline over the simulated world.
//!
//! Every speculative action runs between a `snapshot()` and a matching `restore()`. Handles are
//! consumed by value, so a checkpoint cannot be restored twice from safe code; ordering is
//! enforced at runtime by [`SnapshotJournal`] (strict LIFO, last taken first restored).

mod journal;

pub use journal::SnapshotJournal;

use crate::error::Result;

/// Opaque "restore to this exact state later" handle.
///
/// Neither `Clone` nor `Copy`: each handle is restored or committed exactly once.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a checkpoint that is never restored leaks a journal frame"]
pub struct Checkpoint {
    id: u64,
    depth: usize,
}

impl Checkpoint {
    pub(crate) fn new(id: u64, depth: usize) -> Self {
        Self { id, depth }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Number of checkpoints that were live when this one was taken.
    pub fn depth(&self) -> usize {
        self.depth
    }
}

/// Snapshot/restore capability over the complete mutable world.
///
/// `restore` of a stale, unknown or out-of-order handle is a fatal engine error and must never
/// be ignored by callers.
pub trait SandboxState {
    fn snapshot(&mut self) -> Checkpoint;
    fn restore(&mut self, checkpoint: Checkpoint) -> Result<()>;
    /// Drop `checkpoint` while keeping every mutation made since it was taken. Same ordering
    /// rules as `restore`.
    fn commit(&mut self, checkpoint: Checkpoint) -> Result<()>;
    fn checkpoint_depth(&self) -> usize;
}
