//! Per-region queue of columns waiting for the lighting stage.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::{Receiver, Sender, unbounded};
use stratum_chunk::{ColumnKey, RegionKey};

/// World-owned work set of columns with lighting-relevant height changes.
///
/// Columns enqueue themselves through a [`QueueSlot`], so each column sits in
/// the queue at most once until the consumer resets its slot.
pub struct DirtyColumnQueue {
    region: RegionKey,
    tx: Sender<ColumnKey>,
    rx: Receiver<ColumnKey>,
}

impl DirtyColumnQueue {
    pub fn new(region: RegionKey) -> Self {
        let (tx, rx) = unbounded();
        Self { region, tx, rx }
    }

    #[inline]
    pub fn region(&self) -> RegionKey {
        self.region
    }

    pub fn pop(&self) -> Option<ColumnKey> {
        self.rx.try_recv().ok()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    fn push(&self, key: ColumnKey) {
        // Both ends live in `self`, so the channel cannot be disconnected.
        let _ = self.tx.send(key);
    }
}

/// A column's membership flag in its region queue.
pub struct QueueSlot {
    queue: Arc<DirtyColumnQueue>,
    key: ColumnKey,
    queued: AtomicBool,
}

impl QueueSlot {
    pub fn new(queue: Arc<DirtyColumnQueue>, key: ColumnKey) -> Self {
        Self {
            queue,
            key,
            queued: AtomicBool::new(false),
        }
    }

    /// Enqueues the column unless it is already waiting. Returns true when
    /// this call pushed it.
    pub fn add(&self) -> bool {
        if self
            .queued
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.queue.push(self.key);
            return true;
        }
        false
    }

    /// Called by the consumer once it has taken the column off the queue.
    pub fn reset(&self) {
        self.queued.store(false, Ordering::Release);
    }

    #[inline]
    pub fn is_queued(&self) -> bool {
        self.queued.load(Ordering::Acquire)
    }

    #[inline]
    pub fn queue(&self) -> &Arc<DirtyColumnQueue> {
        &self.queue
    }
}
