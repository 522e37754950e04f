//! # Undo/Redo Stack
//!
//! Two bounded stacks of whole-content snapshots.
//!
//! ## Design
//!
//! - The top of the undo stack is always the *current* content
//! - Pushing clears the redo stack (new action invalidates future)
//! - Pushing past `max_levels` evicts the oldest undo entry
//! - Pushing content identical to the top is a no-op
//! - Undo needs two entries: the current one and something to go back to

use crate::document::Snapshot;
use std::collections::VecDeque;

/// Undo/redo stack for snapshot history
#[derive(Debug, Clone)]
pub struct UndoStack {
    /// Captured content, oldest first; the back is the current content
    undo_stack: VecDeque<Snapshot>,

    /// Undone content, most recently undone last
    redo_stack: Vec<Snapshot>,

    max_levels: usize,
}

impl UndoStack {
    /// Create a new undo stack with default max levels (50)
    pub fn new() -> Self {
        Self::with_max_levels(50)
    }

    /// Create an undo stack with custom max levels
    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            max_levels: max_levels.max(1),
        }
    }

    /// Record `snapshot` as the current content. Returns false if it matched
    /// the current top and nothing changed.
    pub fn push(&mut self, snapshot: Snapshot) -> bool {
        if self.undo_stack.back() == Some(&snapshot) {
            return false;
        }

        self.undo_stack.push_back(snapshot);
        while self.undo_stack.len() > self.max_levels {
            self.undo_stack.pop_front();
        }

        self.redo_stack.clear();
        true
    }

    /// Step back; returns the snapshot that is now current
    pub fn undo(&mut self) -> Option<&Snapshot> {
        if !self.can_undo() {
            return None;
        }
        let current = self.undo_stack.pop_back()?;
        self.redo_stack.push(current);
        self.undo_stack.back()
    }

    /// Step forward; returns the snapshot that is now current
    pub fn redo(&mut self) -> Option<&Snapshot> {
        let next = self.redo_stack.pop()?;
        self.undo_stack.push_back(next);
        self.undo_stack.back()
    }

    pub fn can_undo(&self) -> bool {
        self.undo_stack.len() >= 2
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_common::Node;

    fn snap(text: &str) -> Snapshot {
        Snapshot::capture(&[Node::text_node("t", text)]).unwrap()
    }

    #[test]
    fn test_undo_stack_creation() {
        let stack = UndoStack::new();
        assert_eq!(stack.undo_levels(), 0);
        assert_eq!(stack.redo_levels(), 0);
        assert!(!stack.can_undo());
        assert!(!stack.can_redo());
    }

    #[test]
    fn test_single_entry_cannot_undo() {
        let mut stack = UndoStack::new();
        stack.push(snap("v0"));
        assert!(!stack.can_undo());
        assert!(stack.undo().is_none());
        assert_eq!(stack.undo_levels(), 1);
    }

    #[test]
    fn test_undo_and_redo() {
        let mut stack = UndoStack::new();
        stack.push(snap("v0"));
        stack.push(snap("v1"));

        assert_eq!(stack.undo(), Some(&snap("v0")));
        assert_eq!(stack.redo_levels(), 1);
        assert!(stack.can_redo());

        assert_eq!(stack.redo(), Some(&snap("v1")));
        assert_eq!(stack.undo_levels(), 2);
        assert_eq!(stack.redo_levels(), 0);
    }

    #[test]
    fn test_identical_push_is_noop() {
        let mut stack = UndoStack::new();
        assert!(stack.push(snap("v0")));
        assert!(!stack.push(snap("v0")));
        assert_eq!(stack.undo_levels(), 1);
    }

    #[test]
    fn test_new_push_clears_redo() {
        let mut stack = UndoStack::new();
        stack.push(snap("v0"));
        stack.push(snap("v1"));
        stack.undo();
        assert_eq!(stack.redo_levels(), 1);

        stack.push(snap("v2"));
        assert_eq!(stack.redo_levels(), 0);
        assert_eq!(stack.undo(), Some(&snap("v0")));
    }

    #[test]
    fn test_max_levels_enforced() {
        let mut stack = UndoStack::with_max_levels(2);
        for i in 0..3 {
            stack.push(snap(&format!("Text {}", i)));
        }

        // Oldest evicted
        assert_eq!(stack.undo_levels(), 2);
        assert_eq!(stack.undo(), Some(&snap("Text 1")));
        assert!(!stack.can_undo());
    }
}
