use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_channel::Sender;
use stratum_blocks::Block;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BlockEdit {
    pub wx: i32,
    pub wy: i32,
    pub wz: i32,
    pub block: Block,
}

impl BlockEdit {
    pub fn new(wx: i32, wy: i32, wz: i32, block: Block) -> Self {
        Self { wx, wy, wz, block }
    }
}

/// Cloneable handle for queueing edits from any thread. Edits are applied
/// during the next simulation stage.
#[derive(Clone)]
pub struct EditSender {
    pub(crate) tx: Sender<BlockEdit>,
    pub(crate) queued: Arc<AtomicUsize>,
}

impl EditSender {
    /// Returns false once the runner is gone.
    pub fn send(&self, edit: BlockEdit) -> bool {
        self.queued.fetch_add(1, Ordering::Relaxed);
        if self.tx.send(edit).is_err() {
            self.queued.fetch_sub(1, Ordering::Relaxed);
            return false;
        }
        true
    }

    pub fn set_block(&self, wx: i32, wy: i32, wz: i32, block: Block) -> bool {
        self.send(BlockEdit::new(wx, wy, wz, block))
    }

    pub fn queued(&self) -> usize {
        self.queued.load(Ordering::Relaxed)
    }
}
