/// Operation groups: the atomic unit of undo/redo.
use std::fmt;

use crate::error::{HistoryError, Result};
use crate::operation::{Direction, ReversibleOperation};

/// Aggregate result of replaying one group.
///
/// Only records whether *any* operation failed; the individual causes are
/// logged when they happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum ReplayOutcome {
    Succeeded,
    Failed,
}

impl ReplayOutcome {
    pub fn is_failure(self) -> bool {
        self == Self::Failed
    }
}

/// An ordered batch of operations that undo and redo together.
///
/// Operations are redone in insertion order and undone in reverse order.
/// Once sealed, no further operations can be appended.
pub struct OperationGroup {
    /// Operations in this group, in chronological order.
    operations: Vec<Box<dyn ReversibleOperation>>,
    /// Explicit label; takes priority over the first operation's label.
    description: Option<String>,
    /// Monotonic sequence number assigned by the `UndoManager`.
    seq: u64,
    sealed: bool,
}

impl fmt::Debug for OperationGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels: Vec<String> = self.operations.iter().map(|op| op.description()).collect();
        f.debug_struct("OperationGroup")
            .field("seq", &self.seq)
            .field("description", &self.description)
            .field("operations", &labels)
            .field("sealed", &self.sealed)
            .finish()
    }
}

impl OperationGroup {
    /// Creates an empty, open group.
    pub fn new(seq: u64) -> Self {
        Self {
            operations: Vec::new(),
            description: None,
            seq,
            sealed: false,
        }
    }

    /// Sequence number identifying this group.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Closes the group. Subsequent `append` calls are rejected.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    /// Appends an operation to an open group.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::SealedGroup` if the group has been closed; the
    /// operation is dropped.
    pub fn append(&mut self, op: Box<dyn ReversibleOperation>) -> Result<()> {
        if self.sealed {
            tracing::warn!(
                "Rejected '{}' appended to sealed group {}",
                op.description(),
                self.seq
            );
            return Err(HistoryError::SealedGroup);
        }
        self.operations.push(op);
        Ok(())
    }

    /// Overrides the group label.
    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = Some(description.into());
    }

    /// Whether an explicit label has been set.
    pub fn has_description(&self) -> bool {
        self.description.is_some()
    }

    /// The explicit label if set and non-empty, otherwise the label of the
    /// first operation, otherwise an empty string.
    pub fn description(&self) -> String {
        match &self.description {
            Some(desc) if !desc.is_empty() => desc.clone(),
            _ => self
                .operations
                .first()
                .map(|op| op.description())
                .unwrap_or_default(),
        }
    }

    /// Reverts every operation, newest first.
    ///
    /// A failing operation does not stop the remaining ones.
    pub fn undo(&mut self) -> ReplayOutcome {
        let seq = self.seq;
        replay(self.operations.iter_mut().rev(), Direction::Undo, seq)
    }

    /// Re-applies every operation, oldest first.
    ///
    /// A failing operation does not stop the remaining ones.
    pub fn redo(&mut self) -> ReplayOutcome {
        let seq = self.seq;
        replay(self.operations.iter_mut(), Direction::Redo, seq)
    }
}

fn replay<'a>(
    operations: impl Iterator<Item = &'a mut Box<dyn ReversibleOperation>>,
    direction: Direction,
    seq: u64,
) -> ReplayOutcome {
    let mut outcome = ReplayOutcome::Succeeded;
    for op in operations {
        if let Err(e) = op.apply(direction) {
            tracing::warn!(
                "Failed to {direction} '{}' in group {seq}: {e:#}",
                op.description()
            );
            outcome = ReplayOutcome::Failed;
        }
    }
    outcome
}
