//! Chunk coordinates and the shared cubic chunk buffer.
#![forbid(unsafe_code)]

pub mod coord;

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use stratum_blocks::Block;

pub use coord::{CHUNK_BITS, CHUNK_MASK, CHUNK_SIZE, ChunkCoord, ColumnKey, REGION_BITS, RegionKey};

const VOLUME: usize = CHUNK_SIZE * CHUNK_SIZE * CHUNK_SIZE;

/// A cubic chunk whose blocks can be read and written from any thread.
///
/// `uniform` is a conservative hint: while it is set every block holds the
/// same value. It is cleared before the first differing write lands and is
/// never set again.
#[derive(Debug)]
pub struct ChunkBuf {
    pub coord: ChunkCoord,
    blocks: Box<[AtomicU32]>,
    uniform: AtomicBool,
}

impl ChunkBuf {
    pub fn new_uniform(coord: ChunkCoord, block: Block) -> Self {
        let raw = block.pack();
        ChunkBuf {
            coord,
            blocks: (0..VOLUME).map(|_| AtomicU32::new(raw)).collect(),
            uniform: AtomicBool::new(true),
        }
    }

    /// Builds a chunk from local blocks in `idx` order, padding with air or
    /// truncating to the chunk volume.
    pub fn from_blocks(coord: ChunkCoord, blocks: Vec<Block>) -> Self {
        let mut b = blocks;
        if b.len() != VOLUME {
            b.resize(VOLUME, Block::AIR);
        }
        let first = b[0];
        let uniform = b.iter().all(|x| *x == first);
        ChunkBuf {
            coord,
            blocks: b.into_iter().map(|x| AtomicU32::new(x.pack())).collect(),
            uniform: AtomicBool::new(uniform),
        }
    }

    #[inline]
    pub fn idx(x: usize, y: usize, z: usize) -> usize {
        (y * CHUNK_SIZE + z) * CHUNK_SIZE + x
    }

    #[inline]
    pub fn get_local(&self, x: usize, y: usize, z: usize) -> Block {
        Block::unpack(self.blocks[Self::idx(x, y, z)].load(Ordering::Acquire))
    }

    /// Block at world coordinates, wrapped into this chunk.
    #[inline]
    pub fn block_at(&self, wx: i32, wy: i32, wz: i32) -> Block {
        self.get_local(
            (wx & CHUNK_MASK) as usize,
            (wy & CHUNK_MASK) as usize,
            (wz & CHUNK_MASK) as usize,
        )
    }

    #[inline]
    pub fn contains_world(&self, wx: i32, wy: i32, wz: i32) -> bool {
        ChunkCoord::from_world(wx, wy, wz) == self.coord
    }

    #[inline]
    pub fn get_world(&self, wx: i32, wy: i32, wz: i32) -> Option<Block> {
        if !self.contains_world(wx, wy, wz) {
            return None;
        }
        Some(self.block_at(wx, wy, wz))
    }

    /// Writes a block at world coordinates (wrapped) and returns the block it
    /// replaced.
    pub fn set_block(&self, wx: i32, wy: i32, wz: i32, block: Block) -> Block {
        let i = Self::idx(
            (wx & CHUNK_MASK) as usize,
            (wy & CHUNK_MASK) as usize,
            (wz & CHUNK_MASK) as usize,
        );
        let raw = block.pack();
        if self.uniform.load(Ordering::Acquire) && self.blocks[0].load(Ordering::Acquire) != raw {
            self.uniform.store(false, Ordering::Release);
        }
        Block::unpack(self.blocks[i].swap(raw, Ordering::AcqRel))
    }

    #[inline]
    pub fn is_uniform(&self) -> bool {
        self.uniform.load(Ordering::Acquire)
    }

    #[inline]
    pub fn base_y(&self) -> i32 {
        self.coord.base_y()
    }

    /// Highest world Y inside this chunk.
    #[inline]
    pub fn max_y(&self) -> i32 {
        self.coord.base_y() + CHUNK_SIZE as i32 - 1
    }
}
