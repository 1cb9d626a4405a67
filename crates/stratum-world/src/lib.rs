//! Chunk and column tables, noise terrain, and on-disk column storage.
#![forbid(unsafe_code)]

pub mod store;
pub mod terrain;
pub mod world;
pub mod worldgen;

pub use store::ColumnStore;
pub use terrain::NoiseTerrain;
pub use world::World;
pub use worldgen::{WorldGenConfig, WorldGenParams, load_params_from_path};
