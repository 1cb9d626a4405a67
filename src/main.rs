mod config;

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use stratum_blocks::{Block, BlockRegistry};
use stratum_chunk::{CHUNK_SIZE, ChunkCoord};
use stratum_runtime::{CountingSink, EditSender, TickRunner, TickStats};
use stratum_world::{ColumnStore, NoiseTerrain, World, WorldGenParams, load_params_from_path};

use crate::config::RunConfig;

/// Streams random block edits through a world and ticks its surface columns.
#[derive(Parser, Debug)]
#[command(name = "stratum", version)]
struct Cli {
    /// Run configuration (TOML).
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    ticks: Option<u64>,
    #[arg(long)]
    radius: Option<i32>,
    #[arg(long)]
    edits_per_tick: Option<usize>,
    /// Directory for saved columns; nothing is written without it.
    #[arg(long)]
    save_dir: Option<PathBuf>,
    #[arg(long)]
    seed: Option<i32>,
    #[arg(long)]
    threads: Option<usize>,
}

impl Cli {
    fn apply(&self, cfg: &mut RunConfig) {
        if let Some(v) = self.ticks {
            cfg.ticks = v;
        }
        if let Some(v) = self.radius {
            cfg.radius = v.max(0);
        }
        if let Some(v) = self.edits_per_tick {
            cfg.edits_per_tick = v;
        }
        if let Some(v) = &self.save_dir {
            cfg.save_dir = Some(v.clone());
        }
        if let Some(v) = self.seed {
            cfg.seed = v;
        }
        if let Some(v) = self.threads {
            cfg.threads = v;
        }
    }
}

fn build_world(cfg: &RunConfig) -> Result<Arc<World>, Box<dyn Error>> {
    let registry = Arc::new(match &cfg.blocks {
        Some(path) => BlockRegistry::load_from_path(path)?,
        None => BlockRegistry::builtin(),
    });
    let params = match &cfg.worldgen {
        Some(path) => load_params_from_path(path)?,
        None => WorldGenParams::default(),
    };
    let store = cfg.save_dir.as_ref().map(ColumnStore::open).transpose()?;
    let terrain = Arc::new(NoiseTerrain::new(cfg.seed, params, Arc::clone(&registry)));
    Ok(Arc::new(World::new(registry, terrain, store)))
}

fn load_square(world: &World, cfg: &RunConfig) {
    let t0 = Instant::now();
    for cx in -cfg.radius..=cfg.radius {
        for cz in -cfg.radius..=cfg.radius {
            for cy in 0..cfg.chunks_y {
                world.load_chunk(ChunkCoord::new(cx, cy, cz));
            }
        }
    }
    log::info!(
        "loaded {} chunks in {} columns in {:.1} ms",
        world.chunk_count(),
        world.column_count(),
        t0.elapsed().as_secs_f64() * 1000.0
    );
}

/// Queues `count` edits at random surface cells: half build up, half dig.
fn queue_random_edits(
    world: &World,
    edits: &EditSender,
    rng: &mut fastrand::Rng,
    cfg: &RunConfig,
    build: Block,
) {
    let span = (2 * cfg.radius + 1) * CHUNK_SIZE as i32;
    let origin = -cfg.radius * CHUNK_SIZE as i32;
    let top = cfg.chunks_y * CHUNK_SIZE as i32 - 1;
    for _ in 0..cfg.edits_per_tick {
        let wx = origin + rng.i32(0..span);
        let wz = origin + rng.i32(0..span);
        let Some(h) = world.surface_height(wx, wz) else {
            continue;
        };
        if rng.bool() {
            let y = h + rng.i32(1..4);
            if y <= top {
                edits.set_block(wx, y, wz, build);
            }
        } else if h >= 0 {
            edits.set_block(wx, h, wz, Block::AIR);
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let mut cfg = match &cli.config {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    };
    cli.apply(&mut cfg);
    log::info!(
        "seed={} radius={} chunks_y={} ticks={} edits_per_tick={}",
        cfg.seed,
        cfg.radius,
        cfg.chunks_y,
        cfg.ticks,
        cfg.edits_per_tick
    );

    let world = build_world(&cfg)?;
    load_square(&world, &cfg);
    let build = world
        .registry()
        .block_by_name("stone")
        .ok_or("block registry has no 'stone'")?;

    let sink = Arc::new(CountingSink::default());
    let mut runner = TickRunner::new(Arc::clone(&world), sink.clone(), cfg.threads)?.with_light_range(
        cfg.light.min_y.unwrap_or(i32::MIN),
        cfg.light.max_y.unwrap_or(i32::MAX),
    );
    let edits = runner.edit_sender();
    let mut rng = fastrand::Rng::with_seed(cfg.seed as u64);
    let mut totals = TickStats::default();

    for _ in 0..cfg.ticks {
        queue_random_edits(&world, &edits, &mut rng, &cfg, build);
        totals.merge(&runner.tick());
    }

    runner.request_unload_all(cfg.save_dir.is_some());
    totals.merge(&runner.tick());
    if let Some(dir) = &cfg.save_dir {
        log::info!("columns saved to {}", dir.display());
    }

    println!("ticks:              {}", totals.tick);
    println!("edits applied:      {}", totals.edits_applied);
    println!("edits dropped:      {}", totals.edits_dropped);
    println!("columns drained:    {}", totals.columns_drained);
    println!("height changes:     {} ({} raised)", sink.changes(), sink.raised());
    println!("topmost refreshed:  {}", totals.topmost_refreshed);
    println!("chunks unloaded:    {}", totals.chunks_unloaded);
    println!(
        "tick time:          {:.2} ms avg",
        totals.total_time().as_secs_f64() * 1000.0 / totals.tick.max(1) as f64
    );
    Ok(())
}
