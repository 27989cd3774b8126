use super::Checkpoint;
use crate::error::{CheckpointMisuse, EngineError, Result};

#[derive(Debug, Clone)]
struct JournalFrame<S> {
    id: u64,
    state: S,
}

/// Stack of captured world states backing a [`super::SandboxState`] implementation.
///
/// Capture clones the whole state; rewind pops it back. Only the most recent live frame may be
/// rewound.
#[derive(Debug, Clone)]
pub struct SnapshotJournal<S> {
    frames: Vec<JournalFrame<S>>,
    next_id: u64,
}

impl<S> Default for SnapshotJournal<S> {
    fn default() -> Self {
        Self {
            frames: Vec::new(),
            next_id: 1,
        }
    }
}

impl<S: Clone> SnapshotJournal<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capture(&mut self, state: &S) -> Checkpoint {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        let depth = self.frames.len();
        self.frames.push(JournalFrame {
            id,
            state: state.clone(),
        });
        Checkpoint::new(id, depth)
    }

    /// Pop the frame for `checkpoint` and hand back the captured state.
    pub fn rewind(&mut self, checkpoint: Checkpoint) -> Result<S> {
        let depth = self.frames.len();
        let Some(top) = self.frames.last() else {
            return Err(EngineError::CheckpointMisuse {
                kind: CheckpointMisuse::Empty,
                id: checkpoint.id(),
                depth,
            });
        };

        if top.id != checkpoint.id() {
            let kind = if self.frames.iter().any(|frame| frame.id == checkpoint.id()) {
                CheckpointMisuse::OutOfOrder
            } else {
                CheckpointMisuse::Stale
            };
            return Err(EngineError::CheckpointMisuse {
                kind,
                id: checkpoint.id(),
                depth,
            });
        }

        if checkpoint.depth() != depth - 1 {
            return Err(EngineError::CheckpointMisuse {
                kind: CheckpointMisuse::Stale,
                id: checkpoint.id(),
                depth,
            });
        }

        match self.frames.pop() {
            Some(frame) => Ok(frame.state),
            None => Err(EngineError::CheckpointMisuse {
                kind: CheckpointMisuse::Empty,
                id: checkpoint.id(),
                depth,
            }),
        }
    }

    /// Pop the frame for `checkpoint` without handing the state back.
    pub fn discard(&mut self, checkpoint: Checkpoint) -> Result<()> {
        self.rewind(checkpoint).map(|_| ())
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}
