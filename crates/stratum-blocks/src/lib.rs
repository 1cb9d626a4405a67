//! Block ids, block type registry, and surface classification.
#![forbid(unsafe_code)]

pub mod config;
pub mod registry;
pub mod types;

pub use registry::BlockRegistry;
pub use types::{Block, BlockId, BlockState};
