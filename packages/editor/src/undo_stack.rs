//! # Engine Undo Stack
//!
//! Snapshot history kept by [`DomEngine`](crate::DomEngine).
//!
//! ## Design
//!
//! - Each level is a full HTML snapshot of the editable region
//! - The newest level is the current state; undo steps back one level
//! - Undone levels move to the redo stack
//! - A new level clears the redo stack
//! - `max_levels` caps how many steps back are kept; the surface sets it
//!   to one so the engine can compare changes while the host owns history
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut stack = UndoStack::with_max_levels(1);
//! stack.add_level("a".into());        // first level reports `initial`
//! stack.add_level("ab".into());
//! assert_eq!(stack.undo().as_deref(), Some("a"));
//! ```

/// Result of recording a level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelAdded {
    /// No level existed before this one
    pub initial: bool,
}

/// Snapshot undo/redo stack
#[derive(Debug, Clone)]
pub struct UndoStack {
    /// Recorded levels (current state last)
    undo_stack: Vec<String>,

    /// Undone levels (most recent last)
    redo_stack: Vec<String>,

    /// Steps back that are kept (0 = unlimited)
    max_levels: usize,

    /// Recording suspended
    ignoring: bool,
}

impl UndoStack {
    pub fn new() -> Self {
        Self::with_max_levels(100)
    }

    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_levels,
            ignoring: false,
        }
    }

    pub fn set_max_levels(&mut self, max_levels: usize) {
        self.max_levels = max_levels;
        self.trim();
    }

    pub fn set_ignoring(&mut self, ignoring: bool) {
        self.ignoring = ignoring;
    }

    pub fn is_ignoring(&self) -> bool {
        self.ignoring
    }

    /// Record a snapshot; `None` when ignoring or nothing changed
    pub fn add_level(&mut self, snapshot: String) -> Option<LevelAdded> {
        if self.ignoring {
            return None;
        }
        if self.undo_stack.last() == Some(&snapshot) {
            return None;
        }

        let initial = self.undo_stack.is_empty();
        self.undo_stack.push(snapshot);
        self.trim();

        // New level invalidates the future
        self.redo_stack.clear();

        Some(LevelAdded { initial })
    }

    fn trim(&mut self) {
        // The current state is kept on top of `max_levels` steps
        if self.max_levels > 0 && self.undo_stack.len() > self.max_levels + 1 {
            let excess = self.undo_stack.len() - (self.max_levels + 1);
            self.undo_stack.drain(..excess);
        }
    }

    /// Step back; returns the snapshot to restore
    pub fn undo(&mut self) -> Option<String> {
        if self.undo_stack.len() < 2 {
            return None;
        }
        let current = self.undo_stack.pop()?;
        self.redo_stack.push(current);
        self.undo_stack.last().cloned()
    }

    /// Step forward again; returns the snapshot to restore
    pub fn redo(&mut self) -> Option<String> {
        let next = self.redo_stack.pop()?;
        self.undo_stack.push(next.clone());
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        self.undo_stack.len() > 1
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Number of recorded levels, current state included
    pub fn levels(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
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

    #[test]
    fn test_undo_stack_creation() {
        let stack = UndoStack::new();
        assert_eq!(stack.levels(), 0);
        assert!(!stack.can_undo());
        assert!(!stack.can_redo());
    }

    #[test]
    fn test_first_level_is_initial() {
        let mut stack = UndoStack::new();

        assert_eq!(stack.add_level("a".into()), Some(LevelAdded { initial: true }));
        assert_eq!(stack.add_level("ab".into()), Some(LevelAdded { initial: false }));
        assert_eq!(stack.add_level("ab".into()), None);
    }

    #[test]
    fn test_undo_and_redo() {
        let mut stack = UndoStack::new();
        stack.add_level("a".into());
        stack.add_level("ab".into());

        assert_eq!(stack.undo().as_deref(), Some("a"));
        assert!(!stack.can_undo());
        assert!(stack.can_redo());

        assert_eq!(stack.redo().as_deref(), Some("ab"));
        assert!(!stack.can_redo());
    }

    #[test]
    fn test_new_level_clears_redo() {
        let mut stack = UndoStack::new();
        stack.add_level("a".into());
        stack.add_level("ab".into());
        stack.undo();

        stack.add_level("ac".into());
        assert!(!stack.can_redo());
    }

    #[test]
    fn test_max_levels_enforced() {
        let mut stack = UndoStack::with_max_levels(1);
        for text in ["a", "ab", "abc"] {
            stack.add_level(text.into());
        }

        assert_eq!(stack.levels(), 2);
        assert_eq!(stack.undo().as_deref(), Some("ab"));
        assert_eq!(stack.undo(), None);
    }

    #[test]
    fn test_ignoring_suspends_recording() {
        let mut stack = UndoStack::new();
        stack.set_ignoring(true);

        assert_eq!(stack.add_level("a".into()), None);
        assert_eq!(stack.levels(), 0);

        stack.set_ignoring(false);
        assert!(stack.add_level("a".into()).is_some());
    }
}
