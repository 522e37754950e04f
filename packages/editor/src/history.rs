//! # History Manager
//!
//! Debounced snapshot capture over an [`UndoStack`], with a replay guard.
//!
//! While an undo or redo is being applied the history is *replaying*: the
//! flag is raised before content is restored and only dropped once the guard
//! deadline passes, so any capture triggered by the restore itself is ignored.

use crate::config::HistoryConfig;
use crate::document::Snapshot;
use crate::timer::Debouncer;
use crate::undo_stack::UndoStack;
use folio_common::Node;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryState {
    Recording,
    Replaying,
}

#[derive(Debug, Clone)]
pub struct History {
    stack: UndoStack,
    state: HistoryState,
    snapshot_timer: Debouncer,
    replay_guard: Debouncer,
}

impl History {
    pub fn new(config: &HistoryConfig) -> Self {
        Self {
            stack: UndoStack::with_max_levels(config.max_depth),
            state: HistoryState::Recording,
            snapshot_timer: Debouncer::new(config.snapshot_debounce()),
            replay_guard: Debouncer::new(config.replay_guard()),
        }
    }

    pub fn state(&self) -> HistoryState {
        self.state
    }

    pub fn is_replaying(&self) -> bool {
        self.state == HistoryState::Replaying
    }

    /// Arm (or re-arm) the snapshot debounce. Returns false while replaying.
    pub fn schedule(&mut self, now: Instant) -> bool {
        if self.is_replaying() {
            return false;
        }
        self.snapshot_timer.arm(now);
        true
    }

    /// Push the current content. The first capture seeds the stack.
    ///
    /// Returns whether the stack changed.
    pub fn capture(&mut self, roots: &[Node]) -> Result<bool, serde_json::Error> {
        if self.is_replaying() {
            return Ok(false);
        }
        let snapshot = Snapshot::capture(roots)?;
        let pushed = self.stack.push(snapshot);
        if pushed {
            tracing::debug!(
                "[History] Captured snapshot ({} undo levels)",
                self.stack.undo_levels()
            );
        }
        Ok(pushed)
    }

    pub fn has_pending(&self) -> bool {
        self.snapshot_timer.is_pending()
    }

    /// Drop a scheduled capture without running it
    pub fn cancel_pending(&mut self) {
        self.snapshot_timer.cancel();
    }

    /// Consume the snapshot deadline if it is due
    pub fn take_due_snapshot(&mut self, now: Instant) -> bool {
        self.snapshot_timer.take_due(now)
    }

    /// Release the replay guard if it has expired. Returns true on release.
    pub fn release_guard(&mut self, now: Instant) -> bool {
        if self.replay_guard.take_due(now) {
            self.state = HistoryState::Recording;
            tracing::debug!("[History] Recording resumed");
            return true;
        }
        false
    }

    /// Step back and enter the replaying state.
    ///
    /// Returns the snapshot to restore, or `None` when there is nothing to undo.
    pub fn undo(&mut self, now: Instant) -> Option<Snapshot> {
        let snapshot = self.stack.undo()?.clone();
        self.begin_replay(now);
        Some(snapshot)
    }

    pub fn redo(&mut self, now: Instant) -> Option<Snapshot> {
        let snapshot = self.stack.redo()?.clone();
        self.begin_replay(now);
        Some(snapshot)
    }

    fn begin_replay(&mut self, now: Instant) {
        self.state = HistoryState::Replaying;
        self.snapshot_timer.cancel();
        self.replay_guard.arm(now);
    }

    pub fn can_undo(&self) -> bool {
        self.stack.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.stack.can_redo()
    }

    pub fn undo_levels(&self) -> usize {
        self.stack.undo_levels()
    }

    pub fn redo_levels(&self) -> usize {
        self.stack.redo_levels()
    }

    pub fn snapshot_deadline(&self) -> Option<Instant> {
        self.snapshot_timer.deadline()
    }

    pub fn guard_deadline(&self) -> Option<Instant> {
        self.replay_guard.deadline()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::{Clock, ManualClock};

    fn content(text: &str) -> Vec<Node> {
        vec![Node::element("root", "div").with_child(Node::text_node("t", text))]
    }

    #[test]
    fn test_first_capture_seeds() {
        let mut history = History::new(&HistoryConfig::default());
        assert!(history.capture(&content("a")).unwrap());
        assert_eq!(history.undo_levels(), 1);
        assert!(!history.can_undo());
    }

    #[test]
    fn test_capture_unchanged_is_noop() {
        let mut history = History::new(&HistoryConfig::default());
        history.capture(&content("a")).unwrap();
        assert!(!history.capture(&content("a")).unwrap());
        assert_eq!(history.undo_levels(), 1);
    }

    #[test]
    fn test_undo_enters_replay_until_guard() {
        let clock = ManualClock::new();
        let mut history = History::new(&HistoryConfig::default());
        history.capture(&content("a")).unwrap();
        history.capture(&content("b")).unwrap();

        let restored = history.undo(clock.now()).unwrap();
        assert_eq!(restored.restore().unwrap(), content("a"));
        assert!(history.is_replaying());

        // Captures and schedules are ignored during replay
        assert!(!history.schedule(clock.now()));
        assert!(!history.capture(&content("zzz")).unwrap());
        assert_eq!(history.undo_levels(), 1);
        assert_eq!(history.redo_levels(), 1);

        clock.advance_ms(49);
        assert!(!history.release_guard(clock.now()));
        clock.advance_ms(1);
        assert!(history.release_guard(clock.now()));
        assert_eq!(history.state(), HistoryState::Recording);
    }

    #[test]
    fn test_undo_without_prior_entry() {
        let clock = ManualClock::new();
        let mut history = History::new(&HistoryConfig::default());
        history.capture(&content("a")).unwrap();
        assert!(history.undo(clock.now()).is_none());
        assert!(!history.is_replaying());
    }

    #[test]
    fn test_replay_cancels_pending_capture() {
        let clock = ManualClock::new();
        let mut history = History::new(&HistoryConfig::default());
        history.capture(&content("a")).unwrap();
        history.capture(&content("b")).unwrap();
        history.schedule(clock.now());

        history.undo(clock.now());
        assert!(!history.has_pending());
    }
}
