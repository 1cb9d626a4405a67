//! Per-column surface heights for a concurrently mutated voxel world.
//!
//! A [`Column`] tracks the topmost surface block of each cell in a chunk-wide
//! column. Heights are raised lock-free by chunk loads and block changes,
//! marked dirty for the lighting stage, snapshotted once per tick, and used
//! to refresh a cache of topmost blocks during finalize. Stage-sensitive
//! calls are checked against the world's [`TickClock`].
#![forbid(unsafe_code)]

pub mod biome;
pub mod bounds;
pub mod buffer;
pub mod codec;
pub mod column;
pub mod dirty;
pub mod grid;
pub mod host;
pub mod queue;
pub mod stage;
pub mod topmost;

pub use biome::{BiomeId, BiomeMap};
pub use buffer::HeightMapBuffer;
pub use codec::{ColumnData, read_column, write_column};
pub use column::{Column, ColumnEnv, ColumnSource};
pub use dirty::{DIRTY_COUNT_CAP, HeightChange};
pub use grid::{CELLS, HEIGHT_UNKNOWN, cell_index};
pub use host::{ChunkLookup, ColumnHost, LoadOption, NoTerrain, TerrainGenerator};
pub use queue::DirtyColumnQueue;
pub use stage::{StageMask, TickClock, TickStage};
