//! Dirty flags for height cells.
//!
//! A mark sets two bits per cell: one consumed by the lighting drain and one
//! consumed by the finalize refresh of the topmost cache. Each consumer
//! clears only its own bit, so both see every mark exactly once.

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};

use crate::grid::CELLS;
use crate::queue::QueueSlot;

const LIGHT: u8 = 1 << 0;
const TOPMOST: u8 = 1 << 1;

/// Upper bound reported by [`DirtyTracker::approximate_count`].
pub const DIRTY_COUNT_CAP: u64 = 256;

/// One lighting-relevant height change, in world coordinates.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct HeightChange {
    pub world_x: i32,
    pub world_z: i32,
    pub new_height: i32,
    pub old_height: i32,
}

pub struct DirtyTracker {
    cells: Box<[AtomicU8]>,
    aggregate: AtomicBool,
    marks: AtomicU64,
    slot: QueueSlot,
}

impl DirtyTracker {
    pub fn new(slot: QueueSlot) -> Self {
        Self {
            cells: (0..CELLS).map(|_| AtomicU8::new(0)).collect(),
            aggregate: AtomicBool::new(false),
            marks: AtomicU64::new(0),
            slot,
        }
    }

    pub fn mark(&self, i: usize) {
        self.cells[i].fetch_or(LIGHT | TOPMOST, Ordering::AcqRel);
        self.marks.fetch_add(1, Ordering::Relaxed);
        self.slot.add();
        // Set last so a finalize pass that clears it still finds the cell bit.
        self.aggregate.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_light_dirty(&self, i: usize) -> bool {
        self.cells[i].load(Ordering::Acquire) & LIGHT != 0
    }

    #[inline]
    pub fn is_topmost_dirty(&self, i: usize) -> bool {
        self.cells[i].load(Ordering::Acquire) & TOPMOST != 0
    }

    /// Clears the lighting bit, returning whether it was set.
    #[inline]
    pub fn take_light(&self, i: usize) -> bool {
        self.cells[i].fetch_and(!LIGHT, Ordering::AcqRel) & LIGHT != 0
    }

    /// Clears the finalize bit, returning whether it was set.
    #[inline]
    pub fn take_topmost(&self, i: usize) -> bool {
        self.cells[i].fetch_and(!TOPMOST, Ordering::AcqRel) & TOPMOST != 0
    }

    #[inline]
    pub fn take_aggregate(&self) -> bool {
        self.aggregate.swap(false, Ordering::AcqRel)
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.aggregate.load(Ordering::Acquire)
    }

    /// Total marks ever made, capped; a sizing hint for lighting batches.
    #[inline]
    pub fn approximate_count(&self) -> u64 {
        self.marks.load(Ordering::Relaxed).min(DIRTY_COUNT_CAP)
    }

    #[inline]
    pub fn slot(&self) -> &QueueSlot {
        &self.slot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::DirtyColumnQueue;
    use std::sync::Arc;
    use stratum_chunk::ColumnKey;

    fn tracker() -> (DirtyTracker, Arc<DirtyColumnQueue>) {
        let key = ColumnKey::new(0, 0);
        let queue = Arc::new(DirtyColumnQueue::new(key.region()));
        (DirtyTracker::new(QueueSlot::new(Arc::clone(&queue), key)), queue)
    }

    #[test]
    fn bits_are_consumed_independently() {
        let (t, _q) = tracker();
        t.mark(5);
        assert!(t.take_light(5));
        assert!(!t.take_light(5));
        assert!(t.is_topmost_dirty(5));
        assert!(t.take_topmost(5));
        assert!(!t.take_topmost(5));
    }

    #[test]
    fn marks_enqueue_column_once() {
        let (t, q) = tracker();
        t.mark(1);
        t.mark(2);
        t.mark(1);
        assert_eq!(q.len(), 1);
        assert!(t.is_dirty());
        assert!(t.take_aggregate());
        assert!(!t.take_aggregate());
    }

    #[test]
    fn approximate_count_is_capped() {
        let (t, _q) = tracker();
        for i in 0..300 {
            t.mark(i % CELLS);
        }
        assert_eq!(t.approximate_count(), DIRTY_COUNT_CAP);
    }
}
