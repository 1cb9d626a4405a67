use std::sync::{Arc, OnceLock};

use crate::grid::{CELLS, cell_index};

pub type BiomeId = u8;

/// Biome id per cell, row-major `(x, z)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BiomeMap {
    ids: Box<[BiomeId]>,
}

impl BiomeMap {
    pub fn filled(id: BiomeId) -> Self {
        Self {
            ids: vec![id; CELLS].into_boxed_slice(),
        }
    }

    pub fn from_ids(ids: Vec<BiomeId>) -> Option<Self> {
        (ids.len() == CELLS).then(|| Self {
            ids: ids.into_boxed_slice(),
        })
    }

    #[inline]
    pub fn get(&self, x: i32, z: i32) -> BiomeId {
        self.ids[cell_index(x, z)]
    }

    #[inline]
    pub fn as_slice(&self) -> &[BiomeId] {
        &self.ids
    }
}

/// Biome map that can be assigned once; later assignments are refused.
#[derive(Default)]
pub struct BiomeSlot {
    inner: OnceLock<Arc<BiomeMap>>,
}

impl BiomeSlot {
    pub fn get(&self) -> Option<&Arc<BiomeMap>> {
        self.inner.get()
    }

    /// Returns true when this call won.
    pub fn set(&self, map: Arc<BiomeMap>) -> bool {
        self.inner.set(map).is_ok()
    }
}
