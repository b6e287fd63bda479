/// The reversible-operation contract implemented by callers.
use std::fmt;

/// Which way an operation is being replayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Revert the edit.
    Undo,
    /// Re-apply the edit.
    Redo,
}

impl Direction {
    /// The opposite replay direction.
    pub fn reversed(self) -> Self {
        match self {
            Self::Undo => Self::Redo,
            Self::Redo => Self::Undo,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undo => f.write_str("undo"),
            Self::Redo => f.write_str("redo"),
        }
    }
}

/// A single primitive edit that can be reverted and re-applied.
///
/// Implementations are supplied by the editing application and owned by the
/// `OperationGroup` they are recorded into. The history never looks inside an
/// operation; it only sequences calls to [`apply`](Self::apply).
///
/// `apply` must not call mutating methods of the `UndoManager` that is
/// replaying it. Such calls are rejected with `HistoryError::Busy`.
pub trait ReversibleOperation {
    /// Applies the edit in the given direction.
    ///
    /// # Errors
    ///
    /// Returns an error if the edit could not be applied. The operation should
    /// leave external state consistent (e.g. no-op on a failed precondition)
    /// instead of panicking; the remaining operations of the group still run.
    fn apply(&mut self, direction: Direction) -> anyhow::Result<()>;

    /// Human-readable label, e.g. "move" or "resize".
    fn description(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_reversed() {
        assert_eq!(Direction::Undo.reversed(), Direction::Redo);
        assert_eq!(Direction::Redo.reversed(), Direction::Undo);
    }

    #[test]
    fn test_direction_display() {
        assert_eq!(Direction::Undo.to_string(), "undo");
        assert_eq!(Direction::Redo.to_string(), "redo");
    }

    #[test]
    fn test_trait_object_apply() {
        struct Counter(i32);
        impl ReversibleOperation for Counter {
            fn apply(&mut self, direction: Direction) -> anyhow::Result<()> {
                match direction {
                    Direction::Undo => self.0 -= 1,
                    Direction::Redo => self.0 += 1,
                }
                Ok(())
            }
            fn description(&self) -> String {
                "count".to_string()
            }
        }

        let mut op: Box<dyn ReversibleOperation> = Box::new(Counter(0));
        op.apply(Direction::Redo).expect("redo");
        op.apply(Direction::Redo).expect("redo");
        op.apply(Direction::Undo).expect("undo");
        assert_eq!(op.description(), "count");
    }
}
