use std::collections::VecDeque;

use crate::canvas::Snapshot;

/// Number of snapshots kept when nothing else is configured.
pub const DEFAULT_HISTORY_CAPACITY: usize = 20;

// ============================================================================
// HISTORY STACK - bounded, linear undo/redo over full-buffer snapshots
// ============================================================================

/// Linear undo/redo log.
///
/// `entries[cursor]` is the state currently shown; entries after the cursor
/// are redo states and are discarded by the next [`push`](Self::push). Once
/// `capacity` is reached the oldest entry is evicted and the whole window
/// slides, so even the loaded image can fall out of it.
pub struct HistoryStack {
    entries: VecDeque<Snapshot>,
    cursor: usize,
    capacity: usize,
}

impl HistoryStack {
    /// A stack holding only `seed`. Capacity is at least 1.
    pub fn new(capacity: usize, seed: Snapshot) -> Self {
        let capacity = capacity.max(1);
        let mut entries = VecDeque::with_capacity(capacity);
        entries.push_back(seed);
        Self {
            entries,
            cursor: 0,
            capacity,
        }
    }

    pub fn push(&mut self, entry: Snapshot) {
        // Invalidate the redo branch
        self.entries.truncate(self.cursor + 1);
        self.entries.push_back(entry);

        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        // Eviction shifts indices; the new top is still the current state.
        self.cursor = self.entries.len() - 1;
    }

    /// Step back. `None` at the oldest retained entry.
    pub fn undo(&mut self) -> Option<&Snapshot> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        self.entries.get(self.cursor)
    }

    /// Step forward. `None` at the newest entry.
    pub fn redo(&mut self) -> Option<&Snapshot> {
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        self.entries.get(self.cursor)
    }

    /// Drop everything and start over from `entry`.
    pub fn reset_to(&mut self, entry: Snapshot) {
        self.entries.clear();
        self.entries.push_back(entry);
        self.cursor = 0;
    }

    pub fn current(&self) -> Option<&Snapshot> {
        self.entries.get(self.cursor)
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn snap(tag: u8) -> Snapshot {
        Snapshot::from(RgbaImage::from_pixel(1, 1, Rgba([tag, 0, 0, 255])))
    }

    fn tag(s: &Snapshot) -> u8 {
        s.get_pixel(0, 0).map(|p| p.0[0]).unwrap_or(255)
    }

    #[test]
    fn seeded_stack_has_nothing_to_undo_or_redo() {
        let mut history = HistoryStack::new(5, snap(0));
        assert_eq!(history.len(), 1);
        assert!(history.undo().is_none());
        assert!(history.redo().is_none());
        assert_eq!(history.cursor(), 0);
    }

    #[test]
    fn undo_redo_walk_the_log() {
        let mut history = HistoryStack::new(5, snap(0));
        history.push(snap(1));
        history.push(snap(2));

        assert_eq!(history.undo().map(tag), Some(1));
        assert_eq!(history.undo().map(tag), Some(0));
        assert!(history.undo().is_none());
        assert_eq!(history.redo().map(tag), Some(1));
        assert_eq!(history.redo().map(tag), Some(2));
        assert!(history.redo().is_none());
    }

    #[test]
    fn push_after_undo_discards_redo_branch() {
        let mut history = HistoryStack::new(5, snap(0));
        history.push(snap(1));
        history.push(snap(2));
        history.undo();
        history.push(snap(3));

        assert!(history.redo().is_none());
        assert_eq!(history.len(), 3);
        assert_eq!(history.current().map(tag), Some(3));
        assert_eq!(history.undo().map(tag), Some(1));
    }

    #[test]
    fn capacity_evicts_oldest_and_slides_window() {
        let capacity = 4;
        let mut history = HistoryStack::new(capacity, snap(0));
        for t in 1..=capacity as u8 {
            history.push(snap(t));
        }
        assert_eq!(history.len(), capacity);
        assert_eq!(history.cursor(), capacity - 1);
        assert_eq!(history.current().map(tag), Some(4));

        for _ in 0..capacity - 1 {
            assert!(history.undo().is_some());
        }
        // oldest retained is 1; the seed was evicted
        assert_eq!(history.current().map(tag), Some(1));
        assert!(history.undo().is_none());
    }

    #[test]
    fn eviction_after_undo_keeps_cursor_on_new_top() {
        let mut history = HistoryStack::new(3, snap(0));
        history.push(snap(1));
        history.push(snap(2));
        history.undo();
        history.push(snap(3));
        history.push(snap(4));

        assert_eq!(history.len(), 3);
        assert_eq!(history.current().map(tag), Some(4));
        assert_eq!(history.undo().map(tag), Some(3));
        assert_eq!(history.undo().map(tag), Some(1));
    }

    #[test]
    fn reset_to_reseeds() {
        let mut history = HistoryStack::new(3, snap(0));
        history.push(snap(1));
        history.reset_to(snap(9));
        assert_eq!(history.len(), 1);
        assert_eq!(history.cursor(), 0);
        assert_eq!(history.current().map(tag), Some(9));
        assert!(!history.can_undo() && !history.can_redo());
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut history = HistoryStack::new(0, snap(0));
        history.push(snap(1));
        assert_eq!(history.capacity(), 1);
        assert_eq!(history.len(), 1);
        assert_eq!(history.current().map(tag), Some(1));
    }
}
