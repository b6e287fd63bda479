/// Core undo/redo manager.
///
/// Recorded operations are collected into groups. Sealed groups live on the
/// history stack; undoing moves a group to the redo pool and redoing moves it
/// back. Recording anything new discards the redo pool.
use std::cell::{Cell, RefCell};
use std::fmt;

use crate::config::HistoryConfig;
use crate::error::{HistoryError, Result};
use crate::group::{OperationGroup, ReplayOutcome};
use crate::operation::{Direction, ReversibleOperation};

/// Stacks and grouping state, kept behind a `RefCell`.
///
/// Never borrowed while an operation is being applied, so operations may
/// query the manager during replay.
#[derive(Default)]
struct HistoryState {
    /// Sealed groups available for undo, oldest first.
    history: Vec<OperationGroup>,
    /// Undone groups available for redo, most-recently-undone on top.
    redo_pool: Vec<OperationGroup>,
    /// Group being filled between the outermost `start_group`/`end_group`.
    current: Option<OperationGroup>,
    /// Nesting level of `start_group` calls.
    depth: usize,
    /// Next sequence number to assign to new groups.
    next_seq: u64,
}

impl HistoryState {
    fn open_group(&mut self) -> OperationGroup {
        let group = OperationGroup::new(self.next_seq);
        self.next_seq += 1;
        group
    }

    /// Seals `group` onto history and returns any groups evicted by the depth
    /// cap. Callers drop them after releasing the state borrow.
    #[must_use]
    fn seal_into_history(
        &mut self,
        mut group: OperationGroup,
        config: &HistoryConfig,
    ) -> Vec<OperationGroup> {
        group.seal();
        tracing::debug!(
            "Sealed group {} with {} operation(s)",
            group.seq(),
            group.len()
        );
        self.history.push(group);

        if !config.exceeds_depth(self.history.len()) {
            return Vec::new();
        }
        let excess = self.history.len() - config.max_history_depth;
        tracing::debug!("Evicting {excess} oldest group(s) from history");
        self.history.drain(..excess).collect()
    }

    fn source_mut(&mut self, direction: Direction) -> &mut Vec<OperationGroup> {
        match direction {
            Direction::Undo => &mut self.history,
            Direction::Redo => &mut self.redo_pool,
        }
    }

    fn destination_mut(&mut self, direction: Direction) -> &mut Vec<OperationGroup> {
        self.source_mut(direction.reversed())
    }
}

/// Manages grouped undo/redo history.
///
/// The manager is single-threaded and used through `&self`, so operations
/// that hold a shared handle to it (e.g. `Rc<UndoManager>`) can call back in
/// during replay. Mutating calls made while a group is replaying are
/// rejected with `HistoryError::Busy`.
pub struct UndoManager {
    state: RefCell<HistoryState>,
    /// Set while a group is being replayed.
    replaying: Cell<bool>,
    config: HistoryConfig,
}

impl fmt::Debug for UndoManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("UndoManager");
        match self.state.try_borrow() {
            Ok(state) => {
                s.field("history_len", &state.history.len())
                    .field("redo_len", &state.redo_pool.len())
                    .field("depth", &state.depth)
                    .field("next_seq", &state.next_seq);
            }
            Err(_) => {
                s.field("state", &"<borrowed>");
            }
        }
        s.field("replaying", &self.replaying.get())
            .field("config", &self.config)
            .finish()
    }
}

impl Default for UndoManager {
    fn default() -> Self {
        Self::new()
    }
}

impl UndoManager {
    /// Creates an empty manager with the default configuration.
    pub fn new() -> Self {
        Self::with_config(HistoryConfig::default())
    }

    /// Creates an empty manager with the given configuration.
    pub fn with_config(config: HistoryConfig) -> Self {
        Self {
            state: RefCell::new(HistoryState::default()),
            replaying: Cell::new(false),
            config,
        }
    }

    /// Returns the configuration this manager was built with.
    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    fn ensure_idle(&self, action: &str) -> Result<()> {
        if self.replaying.get() {
            tracing::warn!("Rejected {action} while replaying history");
            return Err(HistoryError::Busy);
        }
        Ok(())
    }

    /// Opens a group, or deepens the currently open one.
    ///
    /// Only the outermost `start_group`/`end_group` pair creates and seals a
    /// group; everything recorded in between lands in that single group.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::Busy` during replay.
    pub fn start_group(&self) -> Result<()> {
        self.ensure_idle("start_group")?;
        let mut state = self.state.borrow_mut();
        if state.depth == 0 {
            debug_assert!(state.current.is_none());
            let group = state.open_group();
            state.current = Some(group);
        }
        state.depth += 1;
        Ok(())
    }

    /// Like [`start_group`](Self::start_group), and labels the open group
    /// unless an enclosing call already did.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::Busy` during replay.
    pub fn start_group_with_description(&self, description: impl Into<String>) -> Result<()> {
        self.start_group()?;
        let mut state = self.state.borrow_mut();
        if let Some(group) = state.current.as_mut() {
            if !group.has_description() {
                group.set_description(description);
            }
        }
        Ok(())
    }

    /// Closes one nesting level; the outermost close seals the group and
    /// pushes it onto the history stack.
    ///
    /// Calling this without an open group is a programming error and
    /// asserts in debug builds.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::Busy` during replay, `HistoryError::NotInGroup`
    /// if no group is open.
    pub fn end_group(&self) -> Result<()> {
        self.ensure_idle("end_group")?;
        let mut state = self.state.borrow_mut();
        debug_assert!(state.depth > 0, "end_group called without start_group");
        if state.depth == 0 {
            tracing::warn!("end_group called without an open group");
            return Err(HistoryError::NotInGroup);
        }

        state.depth -= 1;
        if state.depth > 0 {
            return Ok(());
        }
        let evicted = match state.current.take() {
            Some(group) => state.seal_into_history(group, &self.config),
            None => Vec::new(),
        };
        drop(state);
        drop(evicted);
        Ok(())
    }

    /// Opens a labelled group that is closed when the guard is dropped.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::Busy` during replay.
    pub fn group(&self, description: impl Into<String>) -> Result<GroupGuard<'_>> {
        self.start_group_with_description(description)?;
        Ok(GroupGuard {
            manager: self,
            ended: false,
        })
    }

    /// Whether a group is currently open.
    pub fn is_in_group(&self) -> bool {
        self.state.borrow().depth > 0
    }

    /// Current `start_group` nesting level.
    pub fn depth(&self) -> usize {
        self.state.borrow().depth
    }

    /// Whether a group is being replayed right now.
    pub fn is_replaying(&self) -> bool {
        self.replaying.get()
    }

    /// Records an operation that has already been applied by the caller.
    ///
    /// Discards the redo pool. Outside an explicit group the operation
    /// becomes its own single-operation group.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::Busy` during replay.
    pub fn record(&self, op: impl ReversibleOperation + 'static) -> Result<()> {
        self.record_boxed(Box::new(op))
    }

    /// Boxed variant of [`record`](Self::record).
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::Busy` during replay.
    pub fn record_boxed(&self, op: Box<dyn ReversibleOperation>) -> Result<()> {
        self.ensure_idle("record")?;
        tracing::trace!("Recording '{}'", op.description());

        let mut state = self.state.borrow_mut();
        let discarded = std::mem::take(&mut state.redo_pool);
        if !discarded.is_empty() {
            tracing::debug!("Discarding {} redo group(s)", discarded.len());
        }

        let (appended, evicted) = match state.current.as_mut() {
            Some(group) => (group.append(op), Vec::new()),
            None => {
                let mut group = state.open_group();
                let appended = group.append(op);
                (appended, state.seal_into_history(group, &self.config))
            }
        };

        // Operations may query the manager from `Drop`.
        drop(state);
        drop(discarded);
        drop(evicted);
        appended
    }

    /// Undoes up to `count` groups, newest first.
    ///
    /// Every popped group is fully replayed and moved to the redo pool even
    /// when some of its operations fail.
    ///
    /// # Errors
    ///
    /// - `HistoryError::Busy` during replay (nothing is undone).
    /// - `HistoryError::Exhausted` if history ran out before `count` steps.
    /// - `HistoryError::ReplayFailed` if any undone group reported a failure.
    pub fn undo(&self, count: usize) -> Result<()> {
        self.replay(Direction::Undo, count)
    }

    /// Redoes up to `count` groups, most-recently-undone first.
    ///
    /// # Errors
    ///
    /// Same as [`undo`](Self::undo), with the redo pool as the source.
    pub fn redo(&self, count: usize) -> Result<()> {
        self.replay(Direction::Redo, count)
    }

    /// Undoes every group in the history stack.
    ///
    /// Same as `undo(usize::MAX)`: the stack always runs out first, so a
    /// completed drain reports `HistoryError::Exhausted` with `performed`
    /// set to the number of groups undone.
    ///
    /// # Errors
    ///
    /// Same as [`undo`](Self::undo).
    pub fn undo_all(&self) -> Result<()> {
        self.undo(usize::MAX)
    }

    /// Redoes every group in the redo pool.
    ///
    /// # Errors
    ///
    /// Same as [`undo_all`](Self::undo_all).
    pub fn redo_all(&self) -> Result<()> {
        self.redo(usize::MAX)
    }

    fn replay(&self, direction: Direction, count: usize) -> Result<()> {
        self.ensure_idle(&direction.to_string())?;

        let mut performed = 0;
        let mut failed_steps = 0;
        while performed < count {
            let popped = self.state.borrow_mut().source_mut(direction).pop();
            let Some(group) = popped else {
                return Err(HistoryError::Exhausted {
                    requested: count,
                    performed,
                    failed_steps,
                });
            };

            tracing::debug!("Replaying {direction} of group {}", group.seq());
            let mut step = ReplayStep::begin(self, group, direction);
            if step.run().is_failure() {
                failed_steps += 1;
            }
            drop(step);
            performed += 1;
        }

        if failed_steps > 0 {
            return Err(HistoryError::ReplayFailed {
                performed,
                failed_steps,
            });
        }
        Ok(())
    }

    /// Drops every group in both stacks. Does not touch an open group.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::Busy` during replay.
    pub fn clear(&self) -> Result<()> {
        self.ensure_idle("clear")?;
        let mut state = self.state.borrow_mut();
        let history = std::mem::take(&mut state.history);
        let redo_pool = std::mem::take(&mut state.redo_pool);
        drop(state);
        drop(history);
        drop(redo_pool);
        Ok(())
    }

    /// Whether there is anything to undo.
    pub fn can_undo(&self) -> bool {
        !self.state.borrow().history.is_empty()
    }

    /// Whether there is anything to redo.
    pub fn can_redo(&self) -> bool {
        !self.state.borrow().redo_pool.is_empty()
    }

    /// Number of groups available for undo.
    pub fn history_len(&self) -> usize {
        self.state.borrow().history.len()
    }

    /// Number of groups available for redo.
    pub fn redo_len(&self) -> usize {
        self.state.borrow().redo_pool.len()
    }

    /// Label of the group the next `undo` would replay.
    pub fn undo_description(&self) -> Option<String> {
        self.state.borrow().history.last().map(|g| g.description())
    }

    /// Label of the group the next `redo` would replay.
    pub fn redo_description(&self) -> Option<String> {
        self.state.borrow().redo_pool.last().map(|g| g.description())
    }

    /// Sequence numbers of the history stack, bottom to top.
    pub fn history_seqs(&self) -> Vec<u64> {
        self.state.borrow().history.iter().map(|g| g.seq()).collect()
    }

    /// Sequence numbers of the redo pool, bottom to top.
    pub fn redo_seqs(&self) -> Vec<u64> {
        self.state.borrow().redo_pool.iter().map(|g| g.seq()).collect()
    }
}

/// One pop-replay-push step.
///
/// Holds the replay lock and the in-flight group. On drop, on every exit
/// path including unwinding, the group lands on the destination stack and
/// the lock is released.
struct ReplayStep<'a> {
    manager: &'a UndoManager,
    group: Option<OperationGroup>,
    direction: Direction,
}

impl<'a> ReplayStep<'a> {
    fn begin(manager: &'a UndoManager, group: OperationGroup, direction: Direction) -> Self {
        debug_assert!(!manager.replaying.get());
        manager.replaying.set(true);
        Self {
            manager,
            group: Some(group),
            direction,
        }
    }

    fn run(&mut self) -> ReplayOutcome {
        match (self.group.as_mut(), self.direction) {
            (Some(group), Direction::Undo) => group.undo(),
            (Some(group), Direction::Redo) => group.redo(),
            (None, _) => ReplayOutcome::Succeeded,
        }
    }
}

impl Drop for ReplayStep<'_> {
    fn drop(&mut self) {
        if let Some(group) = self.group.take() {
            self.manager
                .state
                .borrow_mut()
                .destination_mut(self.direction)
                .push(group);
        }
        self.manager.replaying.set(false);
    }
}

/// Scoped group bracket returned by [`UndoManager::group`].
///
/// Calls `end_group` when dropped.
#[must_use = "the group closes as soon as the guard is dropped"]
pub struct GroupGuard<'a> {
    manager: &'a UndoManager,
    ended: bool,
}

impl GroupGuard<'_> {
    /// Closes the group now, reporting any error.
    ///
    /// # Errors
    ///
    /// Propagates errors from `end_group`.
    pub fn end(mut self) -> Result<()> {
        self.ended = true;
        self.manager.end_group()
    }
}

impl Drop for GroupGuard<'_> {
    fn drop(&mut self) {
        if self.ended {
            return;
        }
        if let Err(e) = self.manager.end_group() {
            tracing::warn!("Failed to close undo group: {e}");
        }
    }
}
