use std::sync::atomic::{AtomicI32, Ordering};

/// Vertical extent ever covered by this column's chunks, plus how many of
/// them are attached right now. The extent only widens.
pub struct ColumnBounds {
    lowest: AtomicI32,
    highest: AtomicI32,
    active: AtomicI32,
}

impl Default for ColumnBounds {
    fn default() -> Self {
        Self::new(i32::MAX, i32::MIN)
    }
}

impl ColumnBounds {
    /// `lowest > highest` means no chunk has been registered.
    pub fn new(lowest: i32, highest: i32) -> Self {
        Self {
            lowest: AtomicI32::new(lowest),
            highest: AtomicI32::new(highest),
            active: AtomicI32::new(0),
        }
    }

    pub fn register(&self, min_y: i32, max_y: i32) {
        widen(&self.lowest, min_y, |new, old| new < old);
        widen(&self.highest, max_y, |new, old| new > old);
        self.active.fetch_add(1, Ordering::AcqRel);
    }

    /// Drops one attached chunk and returns how many remain.
    pub fn release(&self) -> i32 {
        let prev = self.active.fetch_sub(1, Ordering::AcqRel);
        assert!(prev > 0, "column released more chunks than it registered");
        prev - 1
    }

    #[inline]
    pub fn lowest_raw(&self) -> i32 {
        self.lowest.load(Ordering::Acquire)
    }

    #[inline]
    pub fn highest_raw(&self) -> i32 {
        self.highest.load(Ordering::Acquire)
    }

    /// `(lowest, highest)` once anything has been registered.
    pub fn range(&self) -> Option<(i32, i32)> {
        let lo = self.lowest_raw();
        let hi = self.highest_raw();
        (lo <= hi).then_some((lo, hi))
    }

    #[inline]
    pub fn active(&self) -> i32 {
        self.active.load(Ordering::Acquire)
    }
}

fn widen(cell: &AtomicI32, value: i32, wider: impl Fn(i32, i32) -> bool) {
    let mut current = cell.load(Ordering::Acquire);
    while wider(value, current) {
        match cell.compare_exchange_weak(current, value, Ordering::AcqRel, Ordering::Acquire) {
            Ok(_) => return,
            Err(actual) => current = actual,
        }
    }
}
