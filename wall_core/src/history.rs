//! # Envelope Edit History
//!
//! Bounded undo/redo stacks of whole-envelope snapshots.
//!
//! The top of the undo stack always mirrors the envelope currently on
//! screen. Loading data resets the stack to that single envelope; every
//! committed edit records the envelope *after* the change, so the state
//! before it is already the entry underneath. Undo therefore pops the top
//! onto the redo stack and restores the new top, and can never empty the
//! stack.
//!
//! ## Example
//!
//! ```rust
//! use wall_core::envelope::EnvelopePoint;
//! use wall_core::history::EditHistory;
//!
//! let before = vec![EnvelopePoint::new(0.0, 0.0), EnvelopePoint::new(0.001, 5.0)];
//! let mut after = before.clone();
//! after[1].load = 6.0;
//!
//! let mut history = EditHistory::new();
//! history.reset(&before);
//! history.record(&after);
//!
//! assert_eq!(history.undo(), Some(before.as_slice()));
//! assert_eq!(history.redo(), Some(after.as_slice()));
//! ```

use std::collections::VecDeque;

use crate::envelope::EnvelopePoint;

/// Maximum number of snapshots kept on the undo stack
pub const MAX_HISTORY: usize = 100;

/// Undo/redo stacks of envelope snapshots.
#[derive(Debug, Clone, Default)]
pub struct EditHistory {
    undo_stack: VecDeque<Vec<EnvelopePoint>>,
    redo_stack: Vec<Vec<EnvelopePoint>>,
}

impl EditHistory {
    pub fn new() -> Self {
        EditHistory::default()
    }

    /// Drop everything and start over from `current`.
    pub fn reset(&mut self, current: &[EnvelopePoint]) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.undo_stack.push_back(current.to_vec());
    }

    /// Record a new current state. Clears the redo stack and evicts the
    /// oldest snapshot beyond [`MAX_HISTORY`].
    pub fn record(&mut self, snapshot: &[EnvelopePoint]) {
        self.push(snapshot.to_vec());
        self.redo_stack.clear();
    }

    /// Step back one snapshot, returning the state to restore.
    ///
    /// `None` (and no change) when only one snapshot is left.
    pub fn undo(&mut self) -> Option<&[EnvelopePoint]> {
        if self.undo_stack.len() <= 1 {
            return None;
        }
        let current = self.undo_stack.pop_back()?;
        self.redo_stack.push(current);
        self.undo_stack.back().map(Vec::as_slice)
    }

    /// Re-apply the most recently undone snapshot.
    pub fn redo(&mut self) -> Option<&[EnvelopePoint]> {
        let next = self.redo_stack.pop()?;
        self.push(next);
        self.undo_stack.back().map(Vec::as_slice)
    }

    pub fn can_undo(&self) -> bool {
        self.undo_stack.len() > 1
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Number of snapshots on the undo stack, current state included
    pub fn depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    /// Snapshot at the top of the undo stack
    pub fn current(&self) -> Option<&[EnvelopePoint]> {
        self.undo_stack.back().map(Vec::as_slice)
    }

    fn push(&mut self, snapshot: Vec<EnvelopePoint>) {
        self.undo_stack.push_back(snapshot);
        while self.undo_stack.len() > MAX_HISTORY {
            self.undo_stack.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(load: f64) -> Vec<EnvelopePoint> {
        vec![EnvelopePoint::new(0.0, 0.0), EnvelopePoint::new(0.001, load)]
    }

    #[test]
    fn test_undo_twice_restores_original() {
        let mut history = EditHistory::new();
        history.reset(&envelope(1.0));
        history.record(&envelope(2.0));
        history.record(&envelope(3.0));

        assert_eq!(history.undo().map(|s| s.to_vec()), Some(envelope(2.0)));
        assert_eq!(history.undo().map(|s| s.to_vec()), Some(envelope(1.0)));
        assert!(history.undo().is_none());
        assert_eq!(history.depth(), 1);
        assert_eq!(history.redo_depth(), 2);
    }

    #[test]
    fn test_undo_then_redo() {
        let mut history = EditHistory::new();
        history.reset(&envelope(1.0));
        history.record(&envelope(2.0));

        history.undo();
        assert!(history.can_redo());
        assert_eq!(history.redo().map(|s| s.to_vec()), Some(envelope(2.0)));
        assert!(!history.can_redo());
        assert!(history.redo().is_none());
        assert_eq!(history.current().map(|s| s.to_vec()), Some(envelope(2.0)));
    }

    #[test]
    fn test_record_clears_redo() {
        let mut history = EditHistory::new();
        history.reset(&envelope(1.0));
        history.record(&envelope(2.0));
        history.undo();
        history.record(&envelope(4.0));
        assert!(!history.can_redo());
        assert_eq!(history.depth(), 2);
    }

    #[test]
    fn test_single_entry_guard() {
        let mut history = EditHistory::new();
        assert!(history.undo().is_none());
        history.reset(&envelope(1.0));
        assert!(!history.can_undo());
        assert!(history.undo().is_none());
        assert_eq!(history.depth(), 1);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut history = EditHistory::new();
        history.reset(&envelope(0.0));
        for i in 1..=150 {
            history.record(&envelope(i as f64));
        }
        assert_eq!(history.depth(), MAX_HISTORY);
        // walk back to the oldest surviving snapshot
        let mut oldest = None;
        while let Some(s) = history.undo() {
            oldest = Some(s[1].load);
        }
        assert_eq!(oldest, Some(51.0));
    }
}
