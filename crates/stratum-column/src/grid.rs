//! Per-cell atomic heights plus the previous-tick snapshot.

use std::sync::atomic::{AtomicI32, Ordering};

use stratum_chunk::{CHUNK_MASK, CHUNK_SIZE};

/// Height of a cell nobody has observed yet.
pub const HEIGHT_UNKNOWN: i32 = i32::MIN;

pub const CELLS: usize = CHUNK_SIZE * CHUNK_SIZE;

/// Row-major `(x, z)` index of a cell; coordinates are wrapped into the column.
#[inline]
pub fn cell_index(x: i32, z: i32) -> usize {
    ((x & CHUNK_MASK) as usize) * CHUNK_SIZE + (z & CHUNK_MASK) as usize
}

pub struct HeightGrid {
    live: Box<[AtomicI32]>,
    // Written only by whoever runs the snapshot stage for this column;
    // atomics keep the single-writer copy readable without a lock.
    snapshot: Box<[AtomicI32]>,
}

impl HeightGrid {
    pub fn unknown() -> Self {
        Self::from_fn(|_| HEIGHT_UNKNOWN)
    }

    /// Grid seeded from `heights` in row-major `(x, z)` order.
    pub fn from_heights(heights: &[i32]) -> Self {
        assert_eq!(
            heights.len(),
            CELLS,
            "height grid must hold {CELLS} cells"
        );
        Self::from_fn(|i| heights[i])
    }

    fn from_fn(f: impl Fn(usize) -> i32) -> Self {
        Self {
            live: (0..CELLS).map(|i| AtomicI32::new(f(i))).collect(),
            snapshot: (0..CELLS).map(|i| AtomicI32::new(f(i))).collect(),
        }
    }

    #[inline]
    pub fn get(&self, x: i32, z: i32) -> i32 {
        self.live[cell_index(x, z)].load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn get_index(&self, i: usize) -> i32 {
        self.live[i].load(Ordering::Acquire)
    }

    #[inline]
    pub fn snapshot(&self, x: i32, z: i32) -> i32 {
        self.snapshot[cell_index(x, z)].load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn snapshot_index(&self, i: usize) -> i32 {
        self.snapshot[i].load(Ordering::Acquire)
    }

    /// Raises the cell to `y` if `y` is above the stored height and
    /// `qualifies` still holds. Retries when another writer moved the cell
    /// first. Returns true when this call stored `y`.
    pub fn raise(&self, x: i32, z: i32, y: i32, qualifies: impl Fn() -> bool) -> bool {
        let cell = &self.live[cell_index(x, z)];
        loop {
            let current = cell.load(Ordering::Acquire);
            if y <= current || !qualifies() {
                return false;
            }
            if cell
                .compare_exchange_weak(current, y, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return true;
            }
        }
    }

    /// Replaces the cell with `y` only if it still holds `expected`.
    /// Used by rescans, the one path allowed to lower a height.
    pub fn replace(&self, x: i32, z: i32, expected: i32, y: i32) -> bool {
        self.live[cell_index(x, z)]
            .compare_exchange(expected, y, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn copy_snapshot(&self) {
        for (live, snap) in self.live.iter().zip(self.snapshot.iter()) {
            snap.store(live.load(Ordering::Acquire), Ordering::Release);
        }
    }

    /// Copy of the live heights in row-major order.
    pub fn to_vec(&self) -> Vec<i32> {
        self.live.iter().map(|c| c.load(Ordering::Acquire)).collect()
    }
}
