//! Linear undo/redo history of canvas snapshots.

use std::sync::Arc;

use tiny_skia::Pixmap;

use super::surface::{pack_layer, unpack_layer};
use super::tools::Annotation;
use super::CanvasResult;

pub const DEFAULT_HISTORY_LIMIT: usize = 64;
pub const DEFAULT_HISTORY_BYTE_BUDGET: usize = 256 * 1024 * 1024;
const HISTORY_LIMIT_MIN: usize = 2;

/// Entries report their retained size so the history can bound memory as
/// well as length.
pub trait HistoryEntry: Clone {
    fn byte_len(&self) -> usize;
}

/// One serialized state of the editable layers: the packed ink raster and
/// the annotation list that was composited over it.
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasSnapshot {
    ink: Arc<[u8]>,
    pub annotations: Arc<[Annotation]>,
}

impl CanvasSnapshot {
    pub fn capture(ink: &Pixmap, annotations: &[Annotation]) -> CanvasResult<Self> {
        Ok(Self {
            ink: Arc::from(pack_layer(ink)?),
            annotations: Arc::from(annotations),
        })
    }

    /// Writes the captured ink back into `layer`, byte for byte.
    pub fn restore_ink(&self, layer: &mut Pixmap) -> CanvasResult<bool> {
        unpack_layer(layer, &self.ink)
    }

    pub fn packed_ink_len(&self) -> usize {
        self.ink.len()
    }
}

impl HistoryEntry for CanvasSnapshot {
    fn byte_len(&self) -> usize {
        let labels: usize = self
            .annotations
            .iter()
            .map(|annotation| std::mem::size_of::<Annotation>() + annotation.text.len())
            .sum();
        self.ink.len() + labels
    }
}

/// Append-only history up to the cursor. Committing after an undo drops the
/// entries past the cursor; they cannot be redone. The oldest entries are
/// evicted once either the entry limit or the byte budget is exceeded; the
/// entry at the cursor is always kept.
#[derive(Debug, Clone)]
pub struct SnapshotHistory<T> {
    entries: Vec<T>,
    cursor: usize,
    limit: usize,
    byte_budget: usize,
}

impl<T: HistoryEntry> SnapshotHistory<T> {
    pub fn new(initial: T, limit: usize) -> Self {
        Self {
            entries: vec![initial],
            cursor: 0,
            limit: limit.max(HISTORY_LIMIT_MIN),
            byte_budget: DEFAULT_HISTORY_BYTE_BUDGET,
        }
    }

    pub fn with_byte_budget(mut self, byte_budget: usize) -> Self {
        self.byte_budget = byte_budget;
        self
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

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn byte_budget(&self) -> usize {
        self.byte_budget
    }

    pub fn total_bytes(&self) -> usize {
        self.entries.iter().map(HistoryEntry::byte_len).sum()
    }

    pub fn current(&self) -> Option<&T> {
        self.entries.get(self.cursor)
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    pub fn commit(&mut self, entry: T) {
        let discarded = self.entries.len().saturating_sub(self.cursor + 1);
        if discarded > 0 {
            tracing::debug!(discarded, "dropping redo entries after new edit");
        }
        self.entries.truncate(self.cursor + 1);
        self.entries.push(entry);

        let mut total = self.total_bytes();
        let mut evicted = 0_usize;
        while self.entries.len() > 1
            && (self.entries.len() > self.limit || total > self.byte_budget)
        {
            total -= self.entries.remove(0).byte_len();
            evicted += 1;
        }
        if evicted > 0 {
            tracing::warn!(
                evicted,
                limit = self.limit,
                byte_budget = self.byte_budget,
                retained_bytes = total,
                "history full; evicting oldest snapshots"
            );
        }
        self.cursor = self.entries.len() - 1;
    }

    pub fn undo(&mut self) -> Option<&T> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        self.entries.get(self.cursor)
    }

    pub fn redo(&mut self) -> Option<&T> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        self.entries.get(self.cursor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::surface::{new_layer, stroke_path};
    use crate::editor::tools::{CanvasPoint, Color, PenStroke, Size};

    /// Test entries weigh their own value in bytes.
    impl HistoryEntry for u32 {
        fn byte_len(&self) -> usize {
            *self as usize
        }
    }

    fn history() -> SnapshotHistory<u32> {
        SnapshotHistory::new(0, DEFAULT_HISTORY_LIMIT)
    }

    #[test]
    fn linear_commits_grow_length_and_cursor_together() {
        for edits in 0..10_u32 {
            let mut history = history();
            for value in 1..=edits {
                history.commit(value);
            }
            assert_eq!(history.len(), edits as usize + 1);
            assert_eq!(history.cursor(), edits as usize);
        }
    }

    #[test]
    fn undo_and_redo_are_noops_at_bounds() {
        let mut history = history();
        assert!(history.undo().is_none());
        assert!(history.redo().is_none());
        history.commit(1);
        assert!(history.redo().is_none());
        assert_eq!(history.cursor(), 1);
    }

    #[test]
    fn undo_then_redo_returns_same_entry() {
        let mut history = history();
        history.commit(1);
        history.commit(2);
        let before = *history.current().expect("cursor entry");
        assert_eq!(history.undo().copied(), Some(1));
        assert_eq!(history.redo().copied(), Some(before));
    }

    #[test]
    fn commit_after_undo_truncates_future() {
        for undo_count in 1..=4_usize {
            let mut history = history();
            for value in 1..=4 {
                history.commit(value);
            }
            for _ in 0..undo_count {
                history.undo();
            }
            let cursor_at_undo = history.cursor();
            history.commit(99);
            assert_eq!(history.len(), cursor_at_undo + 2);
            assert!(history.redo().is_none());
            assert_eq!(history.current().copied(), Some(99));
        }
    }

    #[test]
    fn limit_evicts_oldest_entries() {
        let mut history = SnapshotHistory::new(0_u32, 3);
        for value in 1..=5 {
            history.commit(value);
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.cursor(), 2);
        assert_eq!(history.undo().copied(), Some(4));
        assert_eq!(history.undo().copied(), Some(3));
        assert!(history.undo().is_none());
    }

    #[test]
    fn limit_has_a_floor() {
        let history = SnapshotHistory::new(0_u32, 0);
        assert_eq!(history.limit(), 2);
    }

    #[test]
    fn byte_budget_evicts_oldest_entries() {
        let mut history = SnapshotHistory::new(10_u32, DEFAULT_HISTORY_LIMIT).with_byte_budget(25);
        history.commit(10);
        assert_eq!(history.len(), 2);
        history.commit(10);
        assert_eq!(history.len(), 2);
        assert_eq!(history.total_bytes(), 20);
        assert_eq!(history.cursor(), 1);
    }

    #[test]
    fn oversized_entry_is_still_kept_at_the_cursor() {
        let mut history = SnapshotHistory::new(1_u32, DEFAULT_HISTORY_LIMIT).with_byte_budget(8);
        history.commit(100);
        assert_eq!(history.len(), 1);
        assert_eq!(history.current().copied(), Some(100));
        assert!(!history.can_undo());
    }

    #[test]
    fn sparse_ink_snapshots_are_a_fraction_of_the_raw_layer() {
        let size = Size::new(2880, 2304);
        let mut ink = new_layer(size).expect("layer");
        let mut history = SnapshotHistory::new(
            CanvasSnapshot::capture(&ink, &[]).expect("capture"),
            DEFAULT_HISTORY_LIMIT,
        );
        for offset in 0..3 {
            let y = 100.0 + offset as f32 * 200.0;
            let stroke = PenStroke::from_points(
                &[CanvasPoint::new(100.0, y), CanvasPoint::new(2800.0, y + 150.0)],
                Color::new(255, 0, 0),
                12.0,
            )
            .expect("stroke");
            stroke_path(&mut ink, &stroke);
            history.commit(CanvasSnapshot::capture(&ink, &[]).expect("capture"));
        }

        assert_eq!(history.len(), 4);
        let raw_layer = size.width as usize * size.height as usize * 4;
        assert!(history.total_bytes() * 16 < raw_layer);

        let mut restored = new_layer(size).expect("layer");
        let current = history.current().expect("current");
        assert!(current.restore_ink(&mut restored).expect("restore"));
        assert_eq!(restored.data(), ink.data());
    }
}
