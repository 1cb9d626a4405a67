#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use stratum_blocks::{Block, BlockRegistry};
use stratum_chunk::{ChunkBuf, ChunkCoord, ColumnKey};
use stratum_column::{
    BiomeMap, ChunkLookup, Column, ColumnEnv, ColumnHost, ColumnSource, DirtyColumnQueue,
    LoadOption, NoTerrain, TerrainGenerator, TickClock, TickStage,
};

/// Chunk table and save sink standing in for a world.
#[derive(Default)]
pub struct TestWorld {
    pub chunks: Mutex<HashMap<ChunkCoord, Arc<ChunkBuf>>>,
    pub saved: Mutex<HashMap<ColumnKey, Vec<u8>>>,
    pub saves: AtomicUsize,
    pub removed: Mutex<Vec<ColumnKey>>,
    pub fail_writes: bool,
}

impl TestWorld {
    pub fn insert(&self, chunk: ChunkBuf) -> Arc<ChunkBuf> {
        let chunk = Arc::new(chunk);
        self.chunks
            .lock()
            .unwrap()
            .insert(chunk.coord, Arc::clone(&chunk));
        chunk
    }

    pub fn saved_bytes(&self, key: ColumnKey) -> Option<Vec<u8>> {
        self.saved.lock().unwrap().get(&key).cloned()
    }
}

impl ChunkLookup for TestWorld {
    fn chunk_at(&self, wx: i32, wy: i32, wz: i32, _load: LoadOption) -> Option<Arc<ChunkBuf>> {
        self.chunks
            .lock()
            .unwrap()
            .get(&ChunkCoord::from_world(wx, wy, wz))
            .cloned()
    }
}

pub struct SaveSink<'a> {
    world: &'a TestWorld,
    key: ColumnKey,
    buf: Vec<u8>,
}

impl Write for SaveSink<'_> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.world
            .saved
            .lock()
            .unwrap()
            .insert(self.key, self.buf.clone());
        Ok(())
    }
}

impl ColumnHost for TestWorld {
    fn column_writer(&self, key: ColumnKey) -> io::Result<Box<dyn Write + '_>> {
        if self.fail_writes {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"));
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(SaveSink {
            world: self,
            key,
            buf: Vec::new(),
        }))
    }

    fn remove_column(&self, key: ColumnKey, _column: &Column) {
        self.removed.lock().unwrap().push(key);
    }
}

/// Generator returning fixed answers and counting height queries.
pub struct FixedTerrain {
    pub heights: Option<Vec<i32>>,
    pub biome: Option<BiomeMap>,
    pub height_calls: AtomicUsize,
}

impl FixedTerrain {
    pub fn new(heights: Option<Vec<i32>>, biome: Option<BiomeMap>) -> Self {
        Self {
            heights,
            biome,
            height_calls: AtomicUsize::new(0),
        }
    }
}

impl TerrainGenerator for FixedTerrain {
    fn surface_heights(&self, _key: ColumnKey) -> Option<Vec<i32>> {
        self.height_calls.fetch_add(1, Ordering::SeqCst);
        self.heights.clone()
    }

    fn biomes_for(&self, _key: ColumnKey) -> Option<BiomeMap> {
        self.biome.clone()
    }
}

pub struct Harness {
    pub clock: Arc<TickClock>,
    pub registry: Arc<BlockRegistry>,
    pub queue: Arc<DirtyColumnQueue>,
    pub env: ColumnEnv,
}

impl Harness {
    pub fn new(key: ColumnKey) -> Self {
        Self::with_generator(key, Arc::new(NoTerrain))
    }

    pub fn with_generator(key: ColumnKey, generator: Arc<dyn TerrainGenerator>) -> Self {
        let clock = Arc::new(TickClock::new(TickStage::Simulation));
        let registry = Arc::new(BlockRegistry::builtin());
        let queue = Arc::new(DirtyColumnQueue::new(key.region()));
        let env = ColumnEnv {
            clock: Arc::clone(&clock),
            registry: Arc::clone(&registry),
            generator,
        };
        Self {
            clock,
            registry,
            queue,
            env,
        }
    }

    pub fn column(&self, key: ColumnKey, source: ColumnSource<'_>) -> Column {
        Column::new(key, source, self.env.clone(), Arc::clone(&self.queue))
    }

    pub fn block(&self, name: &str) -> Block {
        self.registry.block_by_name(name).unwrap()
    }

    pub fn stage(&self, stage: TickStage) {
        self.clock.set(stage);
    }
}
