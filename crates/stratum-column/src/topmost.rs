use std::sync::atomic::{AtomicU32, Ordering};

use stratum_blocks::Block;

use crate::grid::CELLS;

const UNKNOWN: u32 = u32::MAX;

/// Block found at each cell's height during the last finalize pass.
pub struct TopmostCache {
    cells: Box<[AtomicU32]>,
}

impl TopmostCache {
    pub fn unknown() -> Self {
        Self {
            cells: (0..CELLS).map(|_| AtomicU32::new(UNKNOWN)).collect(),
        }
    }

    pub fn from_blocks(blocks: &[Option<Block>]) -> Self {
        assert_eq!(blocks.len(), CELLS, "topmost grid must hold {CELLS} cells");
        Self {
            cells: blocks
                .iter()
                .map(|b| AtomicU32::new(b.map_or(UNKNOWN, Block::pack)))
                .collect(),
        }
    }

    #[inline]
    pub fn get(&self, i: usize) -> Option<Block> {
        match self.cells[i].load(Ordering::Acquire) {
            UNKNOWN => None,
            raw => Some(Block::unpack(raw)),
        }
    }

    #[inline]
    pub fn set(&self, i: usize, block: Option<Block>) {
        self.cells[i].store(block.map_or(UNKNOWN, Block::pack), Ordering::Release);
    }

    pub fn to_vec(&self) -> Vec<Option<Block>> {
        (0..CELLS).map(|i| self.get(i)).collect()
    }
}
