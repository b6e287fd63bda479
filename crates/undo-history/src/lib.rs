/// Grouped undo/redo history.
///
/// Provides an `UndoManager` that records caller-supplied reversible
/// operations into atomic groups and replays those groups backward (undo)
/// or forward (redo). Failures inside a group are aggregated rather than
/// aborting the batch, and replay is guarded against reentrant mutation.
pub mod config;
pub mod error;
pub mod group;
pub mod manager;
pub mod operation;

pub use config::HistoryConfig;
pub use error::{HistoryError, Result};
pub use group::{OperationGroup, ReplayOutcome};
pub use manager::{GroupGuard, UndoManager};
pub use operation::{Direction, ReversibleOperation};
