//! Tick orchestration: runs each stage of a world tick on a worker pool.
#![forbid(unsafe_code)]

mod edits;
mod sink;
mod stats;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, unbounded};
use hashbrown::HashMap;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use stratum_chunk::{ChunkCoord, ColumnKey};
use stratum_column::TickStage;
use stratum_world::World;

pub use edits::{BlockEdit, EditSender};
pub use sink::{CountingSink, LightingSink};
pub use stats::TickStats;

pub struct TickRunner {
    world: Arc<World>,
    pool: ThreadPool,
    edit_tx: Sender<BlockEdit>,
    edit_rx: Receiver<BlockEdit>,
    queued_edits: Arc<AtomicUsize>,
    unloads: HashMap<ChunkCoord, bool>,
    sink: Arc<dyn LightingSink>,
    light_min_y: i32,
    light_max_y: i32,
    tick: u64,
}

impl TickRunner {
    /// Runner with `threads` workers; 0 lets rayon pick.
    pub fn new(
        world: Arc<World>,
        sink: Arc<dyn LightingSink>,
        threads: usize,
    ) -> Result<Self, ThreadPoolBuildError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("stratum-tick-{i}"))
            .build()?;
        let (edit_tx, edit_rx) = unbounded();
        Ok(Self {
            world,
            pool,
            edit_tx,
            edit_rx,
            queued_edits: Arc::new(AtomicUsize::new(0)),
            unloads: HashMap::new(),
            sink,
            light_min_y: i32::MIN,
            light_max_y: i32::MAX,
            tick: 0,
        })
    }

    /// Only height changes crossing `min_y..max_y` reach the sink.
    pub fn with_light_range(mut self, min_y: i32, max_y: i32) -> Self {
        self.light_min_y = min_y;
        self.light_max_y = max_y;
        self
    }

    #[inline]
    pub fn world(&self) -> &Arc<World> {
        &self.world
    }

    #[inline]
    pub fn ticks_run(&self) -> u64 {
        self.tick
    }

    pub fn edit_sender(&self) -> EditSender {
        EditSender {
            tx: self.edit_tx.clone(),
            queued: Arc::clone(&self.queued_edits),
        }
    }

    /// Unloads `coord` during the next snapshot stage. Repeated requests
    /// collapse; any request with `save` makes the unload save.
    pub fn request_unload(&mut self, coord: ChunkCoord, save: bool) {
        *self.unloads.entry(coord).or_insert(false) |= save;
    }

    pub fn request_unload_all(&mut self, save: bool) {
        for coord in self.world.loaded_chunks() {
            self.request_unload(coord, save);
        }
    }

    pub fn pending_unloads(&self) -> usize {
        self.unloads.len()
    }

    /// Runs one full tick and leaves the clock back at simulation.
    pub fn tick(&mut self) -> TickStats {
        self.tick += 1;
        let clock = Arc::clone(self.world.clock());
        let mut stats = TickStats {
            tick: self.tick,
            ..TickStats::default()
        };

        clock.set(TickStage::Simulation);
        let t0 = Instant::now();
        self.run_simulation(&mut stats);
        stats.t_simulation = t0.elapsed();

        clock.set(TickStage::Lighting);
        let t0 = Instant::now();
        self.run_lighting(&mut stats);
        stats.t_lighting = t0.elapsed();

        clock.set(TickStage::PreSnapshot);
        clock.set(TickStage::Snapshot);
        let t0 = Instant::now();
        self.run_snapshot(&mut stats);
        stats.t_snapshot = t0.elapsed();

        clock.set(TickStage::Finalize);
        let t0 = Instant::now();
        self.run_finalize(&mut stats);
        stats.t_finalize = t0.elapsed();

        clock.set(TickStage::Simulation);
        stats.log();
        stats
    }

    fn run_simulation(&mut self, stats: &mut TickStats) {
        let edits: Vec<BlockEdit> = self.edit_rx.try_iter().collect();
        self.queued_edits.fetch_sub(edits.len(), Ordering::Relaxed);
        let world = self.world.as_ref();
        let applied = self.pool.install(|| {
            edits
                .par_iter()
                .filter(|e| world.set_block(e.wx, e.wy, e.wz, e.block).is_some())
                .count()
        });
        stats.edits_applied = applied;
        stats.edits_dropped = edits.len() - applied;
    }

    fn run_lighting(&mut self, stats: &mut TickStats) {
        let world = self.world.as_ref();
        // Collect first: a column that runs out of capacity re-queues itself
        // for the next tick.
        let keys: Vec<ColumnKey> = world
            .region_queues()
            .iter()
            .flat_map(|q| std::iter::from_fn(move || q.pop()))
            .collect();
        let sink = self.sink.as_ref();
        let (min_y, max_y) = (self.light_min_y, self.light_max_y);
        let (columns, changes) = self.pool.install(|| {
            keys.par_iter()
                .filter_map(|key| world.column(*key))
                .map(|column| {
                    let capacity = (column.approximate_dirty_count() as usize).max(1);
                    let mut out = Vec::with_capacity(capacity);
                    column.drain_dirty(capacity, min_y, max_y, &mut out);
                    if !out.is_empty() {
                        sink.height_changes(column.key(), &out);
                    }
                    (1, out.len())
                })
                .reduce(|| (0, 0), |a, b| (a.0 + b.0, a.1 + b.1))
        });
        stats.columns_drained = columns;
        stats.height_changes = changes;
    }

    fn run_snapshot(&mut self, stats: &mut TickStats) {
        let columns = self.world.columns();
        self.pool
            .install(|| columns.par_iter().for_each(|c| c.copy_snapshot()));
        for (coord, save) in self.unloads.drain() {
            if self.world.unload_chunk(coord, save) {
                stats.chunks_unloaded += 1;
            }
        }
    }

    fn run_finalize(&mut self, stats: &mut TickStats) {
        let world = self.world.as_ref();
        let columns = world.columns();
        let (finalized, refreshed) = self.pool.install(|| {
            columns
                .par_iter()
                .map(|c| c.finalize_tick(world))
                .filter(|&n| n > 0)
                .map(|n| (1, n))
                .reduce(|| (0, 0), |a, b| (a.0 + b.0, a.1 + b.1))
        });
        stats.columns_finalized = finalized;
        stats.topmost_refreshed = refreshed;
    }
}
