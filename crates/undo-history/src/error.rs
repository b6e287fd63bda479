/// Error types returned by the history API.
use thiserror::Error;

/// Failures reported by `UndoManager` and `OperationGroup`.
///
/// Operation-level errors (the `anyhow::Error` an operation returns from
/// `apply`) never appear here individually: they are logged and folded into
/// `ReplayFailed` / `Exhausted::failed_steps`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    /// A mutating call was made while a group is being replayed.
    #[error("history is busy replaying a group")]
    Busy,

    /// `end_group` was called without a matching `start_group`.
    #[error("end_group called without an open group")]
    NotInGroup,

    /// An operation was appended to a group that is already closed.
    #[error("cannot append to a sealed operation group")]
    SealedGroup,

    /// The source stack ran out before `requested` steps were replayed.
    #[error("requested {requested} steps but only {performed} were available ({failed_steps} failed)")]
    Exhausted {
        requested: usize,
        performed: usize,
        failed_steps: usize,
    },

    /// Every requested step ran, but at least one group reported a failure.
    #[error("{failed_steps} of {performed} replayed groups reported a failure")]
    ReplayFailed {
        performed: usize,
        failed_steps: usize,
    },
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, HistoryError>;

impl HistoryError {
    /// Number of steps actually replayed, for the replay-related variants.
    pub fn performed(&self) -> Option<usize> {
        match self {
            Self::Exhausted { performed, .. } | Self::ReplayFailed { performed, .. } => {
                Some(*performed)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            HistoryError::Busy.to_string(),
            "history is busy replaying a group"
        );
        let err = HistoryError::Exhausted {
            requested: 5,
            performed: 2,
            failed_steps: 0,
        };
        assert_eq!(
            err.to_string(),
            "requested 5 steps but only 2 were available (0 failed)"
        );
    }

    #[test]
    fn test_performed() {
        let err = HistoryError::ReplayFailed {
            performed: 3,
            failed_steps: 1,
        };
        assert_eq!(err.performed(), Some(3));
        assert_eq!(HistoryError::Busy.performed(), None);
    }
}
