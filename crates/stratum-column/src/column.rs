use std::fmt;
use std::io::{Read, Write};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use stratum_blocks::{Block, BlockRegistry};
use stratum_chunk::{CHUNK_MASK, CHUNK_SIZE, ChunkBuf, ColumnKey};

use crate::biome::{BiomeMap, BiomeSlot};
use crate::bounds::ColumnBounds;
use crate::buffer::HeightMapBuffer;
use crate::codec::{self, ColumnData};
use crate::dirty::{DirtyTracker, HeightChange};
use crate::grid::{CELLS, HEIGHT_UNKNOWN, HeightGrid, cell_index};
use crate::host::{ChunkLookup, ColumnHost, LoadOption, TerrainGenerator};
use crate::queue::{DirtyColumnQueue, QueueSlot};
use crate::stage::{StageMask, TickClock};
use crate::topmost::TopmostCache;

/// Shared services every column of a world is built with.
#[derive(Clone)]
pub struct ColumnEnv {
    pub clock: Arc<TickClock>,
    pub registry: Arc<BlockRegistry>,
    pub generator: Arc<dyn TerrainGenerator>,
}

/// Where a new column's heights come from.
pub enum ColumnSource<'a> {
    /// Persisted column bytes.
    Stored(&'a mut dyn Read),
    /// Heights precomputed during terrain generation, row-major `(x, z)`.
    Generated(Vec<i32>),
    /// Nothing known yet; every cell starts at [`HEIGHT_UNKNOWN`].
    Fresh,
}

/// Surface heights for one chunk-wide column of the world.
pub struct Column {
    key: ColumnKey,
    env: ColumnEnv,
    grid: HeightGrid,
    dirty: DirtyTracker,
    bounds: ColumnBounds,
    topmost: TopmostCache,
    biome: BiomeSlot,
    generator_heights: OnceLock<Option<Box<[i32]>>>,
    save_lock: Mutex<()>,
}

impl Column {
    pub fn new(
        key: ColumnKey,
        source: ColumnSource<'_>,
        env: ColumnEnv,
        queue: Arc<DirtyColumnQueue>,
    ) -> Self {
        debug_assert_eq!(queue.region(), key.region());
        let mut biome = None;
        let (grid, bounds, topmost) = match source {
            ColumnSource::Stored(input) => match codec::read_column(input) {
                Ok(data) => {
                    biome = data.biome;
                    (
                        HeightGrid::from_heights(&data.heights),
                        ColumnBounds::new(data.lowest_y, data.highest_y),
                        TopmostCache::from_blocks(&data.topmost),
                    )
                }
                Err(e) => {
                    log::warn!("column ({}, {}) failed to load: {e}", key.cx, key.cz);
                    (HeightGrid::unknown(), ColumnBounds::default(), TopmostCache::unknown())
                }
            },
            ColumnSource::Generated(heights) => (
                HeightGrid::from_heights(&heights),
                ColumnBounds::default(),
                TopmostCache::unknown(),
            ),
            ColumnSource::Fresh => (
                HeightGrid::unknown(),
                ColumnBounds::default(),
                TopmostCache::unknown(),
            ),
        };
        let biome = biome.or_else(|| env.generator.biomes_for(key));
        let column = Self {
            key,
            dirty: DirtyTracker::new(QueueSlot::new(queue, key)),
            env,
            grid,
            bounds,
            topmost,
            biome: BiomeSlot::default(),
            generator_heights: OnceLock::new(),
            save_lock: Mutex::new(()),
        };
        if let Some(map) = biome {
            column.biome.set(Arc::new(map));
        }
        column.grid.copy_snapshot();
        column
    }

    #[inline]
    pub fn key(&self) -> ColumnKey {
        self.key
    }

    /// Stored height of a cell, possibly [`HEIGHT_UNKNOWN`].
    #[inline]
    pub fn height(&self, x: i32, z: i32) -> i32 {
        self.grid.get(x, z)
    }

    /// Height as of the last snapshot stage.
    #[inline]
    pub fn snapshot_height(&self, x: i32, z: i32) -> i32 {
        self.grid.snapshot(x, z)
    }

    /// Stored height, else the generator's estimate, else the lowest loaded Y.
    pub fn surface_height(&self, x: i32, z: i32) -> i32 {
        let height = self.grid.get(x, z);
        if height != HEIGHT_UNKNOWN {
            return height;
        }
        let generated = self.generator_heights.get_or_init(|| {
            self.env
                .generator
                .surface_heights(self.key)
                .filter(|h| h.len() == CELLS)
                .map(Vec::into_boxed_slice)
        });
        match generated {
            Some(h) => h[cell_index(x, z)],
            None => self
                .bounds
                .range()
                .map_or(HEIGHT_UNKNOWN, |(lowest, _)| lowest),
        }
    }

    pub fn topmost_block(&self, x: i32, z: i32) -> Option<Block> {
        self.env
            .clock
            .check(StageMask::PRESNAPSHOT | StageMask::SNAPSHOT, "topmost_block");
        self.topmost.get(cell_index(x, z))
    }

    pub fn height_map_buffer(&self) -> HeightMapBuffer {
        HeightMapBuffer::new(
            self.key.base_x(),
            self.key.base_z(),
            CHUNK_SIZE,
            CHUNK_SIZE,
            self.grid.to_vec(),
        )
    }

    /// Updates one cell for a chunk that just attached to this column.
    pub fn notify_chunk_added(&self, chunk: &ChunkBuf, x: i32, z: i32) -> bool {
        debug_assert_eq!(chunk.coord.column(), self.key);
        let min_y = chunk.base_y();
        let max_y = chunk.max_y();
        if max_y <= self.grid.get(x, z) {
            return false;
        }
        if chunk.is_uniform() {
            // One material throughout: the top block answers for all of it.
            return self.raise(chunk, x, max_y, z);
        }
        for y in (min_y..=max_y).rev() {
            if y <= self.grid.get(x, z) {
                return false;
            }
            if self.env.registry.is_surface(chunk.block_at(x, y, z)) {
                return self.raise(chunk, x, y, z);
            }
        }
        false
    }

    /// Runs [`Column::notify_chunk_added`] for every cell; returns how many
    /// heights changed.
    pub fn notify_chunk_loaded(&self, chunk: &ChunkBuf) -> usize {
        let mut changed = 0;
        for x in 0..CHUNK_SIZE as i32 {
            for z in 0..CHUNK_SIZE as i32 {
                if self.notify_chunk_added(chunk, x, z) {
                    changed += 1;
                }
            }
        }
        changed
    }

    pub fn notify_block_change(&self, chunk: &ChunkBuf, x: i32, y: i32, z: i32) -> bool {
        debug_assert_eq!(chunk.coord.column(), self.key);
        self.raise(chunk, x, y, z)
    }

    fn raise(&self, chunk: &ChunkBuf, x: i32, y: i32, z: i32) -> bool {
        let registry = &self.env.registry;
        let changed = self
            .grid
            .raise(x, z, y, || registry.is_surface(chunk.block_at(x, y, z)));
        if changed {
            self.mark_dirty(x, z);
        }
        changed
    }

    /// Recomputes a cell top-down over the loaded chunks.
    ///
    /// Notifications only ever raise a height, so whoever removes a surface
    /// block must call this for the cell or the stale height stays. A cell
    /// with no surface block left drops to one below the lowest loaded Y.
    pub fn rescan_cell(&self, x: i32, z: i32, chunks: &dyn ChunkLookup) -> bool {
        let Some((lowest, highest)) = self.bounds.range() else {
            return false;
        };
        let wx = self.key.base_x() + (x & CHUNK_MASK);
        let wz = self.key.base_z() + (z & CHUNK_MASK);
        let before = self.grid.get(x, z);
        let mut found = lowest.saturating_sub(1);
        let mut y = highest;
        while y >= lowest {
            match chunks.chunk_at(wx, y, wz, LoadOption::LoadedOnly) {
                Some(chunk) => {
                    if self.env.registry.is_surface(chunk.block_at(wx, y, wz)) {
                        found = y;
                        break;
                    }
                    if y == lowest {
                        break;
                    }
                    y -= 1;
                }
                None => {
                    let base = y & !CHUNK_MASK;
                    if base == i32::MIN {
                        break;
                    }
                    y = base - 1;
                }
            }
        }
        if found == before {
            return false;
        }
        // Lost to a concurrent raise: that writer's height stands.
        if !self.grid.replace(x, z, before, found) {
            return false;
        }
        self.mark_dirty(x, z);
        true
    }

    pub fn mark_dirty(&self, x: i32, z: i32) {
        self.env.clock.check(!StageMask::LIGHTING, "mark_dirty");
        self.dirty.mark(cell_index(x, z));
    }

    /// Pulls up to `capacity` height changes into `out` and returns how many
    /// were written.
    ///
    /// Cells whose old and new heights are both `>= max_y`, both `< min_y`,
    /// or equal are consumed without being reported. Cells without a
    /// snapshot are skipped but the column is not re-queued for them, so a
    /// change away from an unknown height is never reported: a later drain
    /// compares against the snapshot taken after it. When `capacity` runs
    /// out before the scan does, the column re-queues itself.
    pub fn drain_dirty(
        &self,
        capacity: usize,
        min_y: i32,
        max_y: i32,
        out: &mut Vec<HeightChange>,
    ) -> usize {
        self.env.clock.check(StageMask::LIGHTING, "drain_dirty");
        self.dirty.slot().reset();
        let mut written = 0;
        for i in 0..CELLS {
            if !self.dirty.is_light_dirty(i) {
                continue;
            }
            let old = self.grid.snapshot_index(i);
            if old == HEIGHT_UNKNOWN {
                continue;
            }
            if written == capacity {
                self.dirty.slot().add();
                break;
            }
            self.dirty.take_light(i);
            let new = self.grid.get_index(i);
            if new == old || (new >= max_y && old >= max_y) || (new < min_y && old < min_y) {
                continue;
            }
            let (world_x, world_z) = self.world_xz(i);
            out.push(HeightChange {
                world_x,
                world_z,
                new_height: new,
                old_height: old,
            });
            written += 1;
        }
        written
    }

    pub fn approximate_dirty_count(&self) -> u64 {
        self.env
            .clock
            .check(StageMask::LIGHTING, "approximate_dirty_count");
        self.dirty.approximate_count()
    }

    /// Refreshes the topmost cache for cells marked since the last pass.
    /// Returns how many cells were refreshed.
    pub fn finalize_tick(&self, chunks: &dyn ChunkLookup) -> usize {
        self.env.clock.check(StageMask::FINALIZE, "finalize_tick");
        if !self.dirty.take_aggregate() {
            return 0;
        }
        let mut refreshed = 0;
        for i in 0..CELLS {
            if !self.dirty.take_topmost(i) {
                continue;
            }
            let y = self.grid.get_index(i);
            let block = if y == HEIGHT_UNKNOWN {
                None
            } else {
                let (wx, wz) = self.world_xz(i);
                chunks
                    .chunk_at(wx, y, wz, LoadOption::LoadedOnly)
                    .map(|c| c.block_at(wx, y, wz))
            };
            self.topmost.set(i, block);
            refreshed += 1;
        }
        refreshed
    }

    pub fn copy_snapshot(&self) {
        self.env.clock.check(StageMask::SNAPSHOT, "copy_snapshot");
        self.grid.copy_snapshot();
    }

    pub fn register_chunk(&self, min_y: i32, max_y: i32) {
        self.bounds.register(min_y, max_y);
    }

    /// Detaches one chunk. With `save`, the last detach writes the column
    /// through `host` and asks it to drop the column; returns true then.
    pub fn deregister_chunk(&self, save: bool, host: &dyn ColumnHost) -> bool {
        if !save {
            self.bounds.release();
            return false;
        }
        self.env.clock.check(StageMask::SNAPSHOT, "deregister_chunk");
        if self.bounds.release() != 0 {
            return false;
        }
        self.save(host);
        host.remove_column(self.key, self);
        true
    }

    #[inline]
    pub fn active_chunks(&self) -> bool {
        self.bounds.active() > 0
    }

    #[inline]
    pub fn active_chunk_count(&self) -> i32 {
        self.bounds.active()
    }

    /// `(lowest, highest)` Y ever registered, if any chunk has been.
    pub fn bounds(&self) -> Option<(i32, i32)> {
        self.bounds.range()
    }

    pub fn to_column_data(&self) -> ColumnData {
        ColumnData {
            heights: self.grid.to_vec(),
            lowest_y: self.bounds.lowest_raw(),
            highest_y: self.bounds.highest_raw(),
            topmost: self.topmost.to_vec(),
            biome: self.biome.get().map(|b| BiomeMap::clone(b)),
        }
    }

    /// Writes the column through `host`. Failures are logged and the attempt
    /// is dropped; returns whether the write completed.
    pub fn save(&self, host: &dyn ColumnHost) -> bool {
        let _guard = self.save_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut out = match host.column_writer(self.key) {
            Ok(out) => out,
            Err(e) => {
                log::warn!("column ({}, {}) save: cannot open output: {e}", self.key.cx, self.key.cz);
                return false;
            }
        };
        let data = self.to_column_data();
        match codec::write_column(&mut out, &data).and_then(|_| out.flush()) {
            Ok(()) => {
                log::debug!("column ({}, {}) saved", self.key.cx, self.key.cz);
                true
            }
            Err(e) => {
                log::warn!("column ({}, {}) save failed: {e}", self.key.cx, self.key.cz);
                false
            }
        }
    }

    pub fn biome(&self) -> Option<&Arc<BiomeMap>> {
        self.biome.get()
    }

    /// First assignment wins; returns false if a map was already set.
    pub fn set_biome(&self, map: Arc<BiomeMap>) -> bool {
        self.biome.set(map)
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty.is_dirty()
    }

    #[inline]
    pub fn is_queued(&self) -> bool {
        self.dirty.slot().is_queued()
    }

    #[inline]
    fn world_xz(&self, i: usize) -> (i32, i32) {
        (
            self.key.base_x() + (i / CHUNK_SIZE) as i32,
            self.key.base_z() + (i % CHUNK_SIZE) as i32,
        )
    }
}

impl fmt::Debug for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("cx", &self.key.cx)
            .field("cz", &self.key.cz)
            .field("active", &self.bounds.active())
            .finish()
    }
}
