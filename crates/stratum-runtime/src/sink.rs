use std::sync::atomic::{AtomicU64, Ordering};

use stratum_chunk::ColumnKey;
use stratum_column::HeightChange;

/// Consumer of height changes drained during the lighting stage.
///
/// Called from pool threads, once per drained column with a non-empty batch.
pub trait LightingSink: Send + Sync {
    fn height_changes(&self, column: ColumnKey, changes: &[HeightChange]);
}

/// Sink that only counts what it receives.
#[derive(Debug, Default)]
pub struct CountingSink {
    batches: AtomicU64,
    changes: AtomicU64,
    raised: AtomicU64,
}

impl CountingSink {
    pub fn batches(&self) -> u64 {
        self.batches.load(Ordering::Relaxed)
    }

    pub fn changes(&self) -> u64 {
        self.changes.load(Ordering::Relaxed)
    }

    /// Changes whose new height is above the old one.
    pub fn raised(&self) -> u64 {
        self.raised.load(Ordering::Relaxed)
    }
}

impl LightingSink for CountingSink {
    fn height_changes(&self, _column: ColumnKey, changes: &[HeightChange]) {
        let raised = changes.iter().filter(|c| c.new_height > c.old_height).count();
        self.batches.fetch_add(1, Ordering::Relaxed);
        self.changes.fetch_add(changes.len() as u64, Ordering::Relaxed);
        self.raised.fetch_add(raised as u64, Ordering::Relaxed);
    }
}
