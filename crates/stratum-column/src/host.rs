//! What a column needs from the world around it.

use std::io::{self, Write};
use std::sync::Arc;

use stratum_chunk::{ChunkBuf, ColumnKey};

use crate::biome::BiomeMap;
use crate::column::Column;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LoadOption {
    /// Load or generate the chunk when it is not resident.
    LoadIfNeeded,
    /// Only return chunks that are already resident.
    LoadedOnly,
}

pub trait ChunkLookup {
    fn chunk_at(&self, wx: i32, wy: i32, wz: i32, load: LoadOption) -> Option<Arc<ChunkBuf>>;
}

pub trait TerrainGenerator: Send + Sync {
    /// Generator's idea of the surface, row-major `(x, z)`, if it has one.
    fn surface_heights(&self, key: ColumnKey) -> Option<Vec<i32>>;

    fn biomes_for(&self, key: ColumnKey) -> Option<BiomeMap>;
}

/// Generator that knows nothing; every query falls back.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoTerrain;

impl TerrainGenerator for NoTerrain {
    fn surface_heights(&self, _key: ColumnKey) -> Option<Vec<i32>> {
        None
    }

    fn biomes_for(&self, _key: ColumnKey) -> Option<BiomeMap> {
        None
    }
}

/// World-side hooks used when a column is saved and retired.
pub trait ColumnHost {
    fn column_writer(&self, key: ColumnKey) -> io::Result<Box<dyn Write + '_>>;

    /// Drops `column` from the host. Must leave it in place if a chunk has
    /// attached since the detach that triggered the call.
    fn remove_column(&self, key: ColumnKey, column: &Column);
}
