use std::io::{self, Write};
use std::sync::{Arc, RwLock};

use hashbrown::HashMap;
use hashbrown::hash_map::Entry;
use stratum_blocks::{Block, BlockRegistry};
use stratum_chunk::{ChunkBuf, ChunkCoord, ColumnKey, RegionKey};
use stratum_column::{
    ChunkLookup, Column, ColumnEnv, ColumnHost, ColumnSource, DirtyColumnQueue, LoadOption,
    StageMask, TerrainGenerator, TickClock,
};

use crate::store::ColumnStore;
use crate::terrain::NoiseTerrain;

/// Resident chunks and their surface columns.
///
/// Chunks are generated on load and not persisted; columns are written to
/// the [`ColumnStore`] when their last chunk unloads with saving enabled.
pub struct World {
    registry: Arc<BlockRegistry>,
    clock: Arc<TickClock>,
    terrain: Arc<NoiseTerrain>,
    store: Option<ColumnStore>,
    chunks: RwLock<HashMap<ChunkCoord, Arc<ChunkBuf>>>,
    columns: RwLock<HashMap<ColumnKey, Arc<Column>>>,
    queues: RwLock<HashMap<RegionKey, Arc<DirtyColumnQueue>>>,
}

impl World {
    pub fn new(
        registry: Arc<BlockRegistry>,
        terrain: Arc<NoiseTerrain>,
        store: Option<ColumnStore>,
    ) -> Self {
        Self {
            registry,
            clock: Arc::new(TickClock::default()),
            terrain,
            store,
            chunks: RwLock::new(HashMap::new()),
            columns: RwLock::new(HashMap::new()),
            queues: RwLock::new(HashMap::new()),
        }
    }

    #[inline]
    pub fn registry(&self) -> &Arc<BlockRegistry> {
        &self.registry
    }

    #[inline]
    pub fn clock(&self) -> &Arc<TickClock> {
        &self.clock
    }

    #[inline]
    pub fn terrain(&self) -> &Arc<NoiseTerrain> {
        &self.terrain
    }

    #[inline]
    pub fn store(&self) -> Option<&ColumnStore> {
        self.store.as_ref()
    }

    fn env(&self) -> ColumnEnv {
        ColumnEnv {
            clock: Arc::clone(&self.clock),
            registry: Arc::clone(&self.registry),
            generator: Arc::clone(&self.terrain) as Arc<dyn TerrainGenerator>,
        }
    }

    /// Queue of dirty columns for `region`, created on first use.
    pub fn dirty_queue_for(&self, region: RegionKey) -> Arc<DirtyColumnQueue> {
        if let Some(q) = self.queues.read().unwrap().get(&region) {
            return Arc::clone(q);
        }
        let mut queues = self.queues.write().unwrap();
        Arc::clone(
            queues
                .entry(region)
                .or_insert_with(|| Arc::new(DirtyColumnQueue::new(region))),
        )
    }

    pub fn region_queues(&self) -> Vec<Arc<DirtyColumnQueue>> {
        self.queues.read().unwrap().values().cloned().collect()
    }

    pub fn chunk(&self, coord: ChunkCoord) -> Option<Arc<ChunkBuf>> {
        self.chunks.read().unwrap().get(&coord).cloned()
    }

    pub fn loaded_chunks(&self) -> Vec<ChunkCoord> {
        self.chunks.read().unwrap().keys().copied().collect()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.read().unwrap().len()
    }

    pub fn column(&self, key: ColumnKey) -> Option<Arc<Column>> {
        self.columns.read().unwrap().get(&key).cloned()
    }

    pub fn columns(&self) -> Vec<Arc<Column>> {
        self.columns.read().unwrap().values().cloned().collect()
    }

    pub fn column_count(&self) -> usize {
        self.columns.read().unwrap().len()
    }

    /// Registers a chunk span on the column for `key`, opening the column if
    /// the world does not hold one. Runs under the `columns` write lock so a
    /// racing [`ColumnHost::remove_column`] either sees the registration or
    /// has already dropped the column.
    fn attach_chunk(&self, key: ColumnKey, min_y: i32, max_y: i32) -> Arc<Column> {
        let mut columns = self.columns.write().unwrap();
        let column = match columns.entry(key) {
            Entry::Occupied(e) => Arc::clone(e.get()),
            Entry::Vacant(e) => Arc::clone(e.insert(Arc::new(self.open_column(key)))),
        };
        column.register_chunk(min_y, max_y);
        column
    }

    fn open_column(&self, key: ColumnKey) -> Column {
        let queue = self.dirty_queue_for(key.region());
        if let Some(store) = self.store.as_ref().filter(|s| s.exists(key)) {
            match store.reader(key) {
                Ok(mut input) => {
                    log::debug!("column ({}, {}) loaded from {}", key.cx, key.cz, store.dir().display());
                    return Column::new(key, ColumnSource::Stored(&mut input), self.env(), queue);
                }
                Err(e) => log::warn!("column ({}, {}) unreadable, regenerating: {e}", key.cx, key.cz),
            }
        }
        let source = match self.terrain.surface_heights(key) {
            Some(heights) => ColumnSource::Generated(heights),
            None => ColumnSource::Fresh,
        };
        Column::new(key, source, self.env(), queue)
    }

    /// Generates `coord` if it is not resident and attaches it to its column.
    pub fn load_chunk(&self, coord: ChunkCoord) -> Arc<ChunkBuf> {
        if let Some(c) = self.chunk(coord) {
            return c;
        }
        let generated = Arc::new(self.terrain.generate_chunk(coord));
        let chunk = match self.chunks.write().unwrap().entry(coord) {
            Entry::Occupied(e) => return Arc::clone(e.get()),
            Entry::Vacant(e) => Arc::clone(e.insert(generated)),
        };
        let column = self.attach_chunk(coord.column(), chunk.base_y(), chunk.max_y());
        let raised = column.notify_chunk_loaded(&chunk);
        log::trace!(
            "chunk ({}, {}, {}) loaded, {raised} heights raised",
            coord.cx,
            coord.cy,
            coord.cz
        );
        chunk
    }

    /// Detaches a resident chunk. With `save`, must run during the snapshot
    /// stage; the column is written out once its last chunk leaves.
    pub fn unload_chunk(&self, coord: ChunkCoord, save: bool) -> bool {
        if self.chunks.write().unwrap().remove(&coord).is_none() {
            return false;
        }
        let Some(column) = self.column(coord.column()) else {
            return true;
        };
        column.deregister_chunk(save, self);
        if !save && !column.active_chunks() {
            self.remove_column(column.key(), &column);
        }
        true
    }

    /// Writes a block and keeps the column height in step, lowering it by a
    /// rescan when the surface block at the current height is replaced.
    /// Returns the replaced block, or `None` if the chunk is not resident.
    pub fn set_block(&self, wx: i32, wy: i32, wz: i32, block: Block) -> Option<Block> {
        self.clock.check(StageMask::SIMULATION, "set_block");
        let chunk = self.chunk(ChunkCoord::from_world(wx, wy, wz))?;
        let prev = chunk.set_block(wx, wy, wz, block);
        if let Some(column) = self.column(ColumnKey::from_world(wx, wz)) {
            if !column.notify_block_change(&chunk, wx, wy, wz)
                && column.height(wx, wz) == wy
                && !self.registry.is_surface(block)
            {
                column.rescan_cell(wx, wz, self);
            }
        }
        Some(prev)
    }

    pub fn block_at(&self, wx: i32, wy: i32, wz: i32) -> Option<Block> {
        self.chunk(ChunkCoord::from_world(wx, wy, wz))
            .map(|c| c.block_at(wx, wy, wz))
    }

    /// Best known surface height at a world position, if its column exists.
    pub fn surface_height(&self, wx: i32, wz: i32) -> Option<i32> {
        self.column(ColumnKey::from_world(wx, wz))
            .map(|c| c.surface_height(wx, wz))
    }
}

impl ChunkLookup for World {
    fn chunk_at(&self, wx: i32, wy: i32, wz: i32, load: LoadOption) -> Option<Arc<ChunkBuf>> {
        let coord = ChunkCoord::from_world(wx, wy, wz);
        match load {
            LoadOption::LoadedOnly => self.chunk(coord),
            LoadOption::LoadIfNeeded => Some(self.load_chunk(coord)),
        }
    }
}

impl ColumnHost for World {
    fn column_writer(&self, key: ColumnKey) -> io::Result<Box<dyn Write + '_>> {
        match &self.store {
            Some(store) => Ok(Box::new(store.writer(key)?)),
            None => Ok(Box::new(io::sink())),
        }
    }

    /// Drops the column unless a chunk attached after its last detach.
    fn remove_column(&self, key: ColumnKey, column: &Column) {
        let mut columns = self.columns.write().unwrap();
        if columns
            .get(&key)
            .is_some_and(|c| std::ptr::eq(Arc::as_ptr(c), column) && !c.active_chunks())
        {
            columns.remove(&key);
        }
    }
}
