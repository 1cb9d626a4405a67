mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread;

use common::{FixedTerrain, Harness, TestWorld};
use stratum_blocks::Block;
use stratum_chunk::{CHUNK_SIZE, ChunkBuf, ChunkCoord, ColumnKey};
use stratum_column::{BiomeMap, CELLS, ColumnSource, HEIGHT_UNKNOWN, HeightChange, TickStage};

const KEY: ColumnKey = ColumnKey::new(0, 0);

fn chunk_with(h: &Harness, cy: i32, solids: &[(i32, i32, i32)]) -> ChunkBuf {
    let chunk = ChunkBuf::new_uniform(ChunkCoord::new(KEY.cx, cy, KEY.cz), Block::AIR);
    let stone = h.block("stone");
    for &(x, y, z) in solids {
        chunk.set_block(x, y, z, stone);
    }
    chunk
}

#[test]
fn first_solid_from_the_top_sets_height_and_air_above_leaves_it() {
    let h = Harness::new(KEY);
    let column = h.column(KEY, ColumnSource::Fresh);
    assert_eq!(column.height(2, 3), HEIGHT_UNKNOWN);

    let lower = chunk_with(&h, 0, &[(2, 7, 3), (2, 3, 3)]);
    assert!(!lower.is_uniform());
    assert!(column.notify_chunk_added(&lower, 2, 3));
    assert_eq!(column.height(2, 3), 7);
    assert!(column.is_dirty());
    assert!(column.is_queued());

    let upper = ChunkBuf::new_uniform(ChunkCoord::new(0, 1, 0), Block::AIR);
    assert!(upper.is_uniform());
    assert!(!column.notify_chunk_added(&upper, 2, 3));
    assert_eq!(column.height(2, 3), 7);
}

#[test]
fn uniform_solid_chunk_uses_its_top() {
    let h = Harness::new(KEY);
    let column = h.column(KEY, ColumnSource::Fresh);
    let solid = ChunkBuf::new_uniform(ChunkCoord::new(0, 2, 0), h.block("stone"));
    assert_eq!(column.notify_chunk_loaded(&solid), CELLS);
    assert_eq!(column.height(0, 0), 47);
    assert_eq!(column.height(15, 15), 47);
    // A chunk entirely below the known surface changes nothing.
    let below = ChunkBuf::new_uniform(ChunkCoord::new(0, 1, 0), h.block("stone"));
    assert_eq!(column.notify_chunk_loaded(&below), 0);
}

#[test]
fn block_changes_only_raise() {
    let h = Harness::new(KEY);
    let column = h.column(KEY, ColumnSource::Generated(vec![10; CELLS]));
    let chunk = chunk_with(&h, 0, &[(1, 12, 1), (1, 5, 1)]);
    chunk.set_block(1, 13, 1, h.block("tall_grass"));
    assert!(!column.notify_block_change(&chunk, 1, 5, 1));
    assert!(!column.notify_block_change(&chunk, 1, 13, 1));
    assert_eq!(column.height(1, 1), 10);
    assert!(column.notify_block_change(&chunk, 1, 12, 1));
    assert_eq!(column.height(1, 1), 12);
}

#[test]
fn concurrent_block_changes_keep_highest_surface() {
    let h = Harness::new(KEY);
    let column = Arc::new(h.column(KEY, ColumnSource::Fresh));
    let lower = Arc::new(ChunkBuf::new_uniform(ChunkCoord::new(0, 0, 0), h.block("stone")));
    let upper = Arc::new(ChunkBuf::new_uniform(ChunkCoord::new(0, 1, 0), h.block("stone")));
    upper.set_block(4, 31, 4, Block::AIR);
    upper.set_block(4, 30, 4, h.block("tall_grass"));

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let column = Arc::clone(&column);
            let lower = Arc::clone(&lower);
            let upper = Arc::clone(&upper);
            thread::spawn(move || {
                for i in 0..32 {
                    let y = (i * 7 + t * 5) % 32;
                    let chunk = if y < 16 { &lower } else { &upper };
                    column.notify_block_change(chunk, 4, y, 4);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(column.height(4, 4), 29);
}

#[test]
fn snapshot_then_drain_reports_nothing() {
    let h = Harness::new(KEY);
    let column = h.column(KEY, ColumnSource::Generated(vec![0; CELLS]));
    let chunk = chunk_with(&h, 0, &[(0, 9, 0), (3, 4, 5)]);
    column.notify_chunk_loaded(&chunk);

    h.stage(TickStage::Snapshot);
    column.copy_snapshot();
    h.stage(TickStage::Lighting);
    let mut out = Vec::new();
    assert_eq!(column.drain_dirty(64, i32::MIN, i32::MAX, &mut out), 0);
    assert!(out.is_empty());
}

#[test]
fn drain_reports_each_change_once() {
    let h = Harness::new(KEY);
    let column = h.column(KEY, ColumnSource::Generated(vec![0; CELLS]));
    let chunk = chunk_with(&h, 0, &[(2, 9, 6)]);
    assert!(column.notify_block_change(&chunk, 2, 9, 6));

    h.stage(TickStage::Lighting);
    let mut out = Vec::new();
    assert_eq!(column.drain_dirty(4, i32::MIN, i32::MAX, &mut out), 1);
    assert_eq!(
        out,
        vec![HeightChange {
            world_x: 2,
            world_z: 6,
            new_height: 9,
            old_height: 0,
        }]
    );
    assert!(!column.is_queued());
    out.clear();
    assert_eq!(column.drain_dirty(4, i32::MIN, i32::MAX, &mut out), 0);

    // Marking again makes it visible again.
    h.stage(TickStage::Simulation);
    column.mark_dirty(2, 6);
    h.stage(TickStage::Lighting);
    assert_eq!(column.drain_dirty(4, i32::MIN, i32::MAX, &mut out), 1);
}

#[test]
fn drain_filters_changes_outside_y_range_but_consumes_them() {
    let key = ColumnKey::new(-1, 2);
    let h = Harness::new(key);
    let column = h.column(key, ColumnSource::Generated(vec![20; CELLS]));
    let chunk = ChunkBuf::new_uniform(ChunkCoord::new(-1, 1, 2), Block::AIR);
    let stone = h.block("stone");
    chunk.set_block(-16, 30, 32, stone);
    chunk.set_block(-15, 25, 32, stone);
    assert!(column.notify_block_change(&chunk, -16, 30, 32));
    assert!(column.notify_block_change(&chunk, -15, 25, 32));

    h.stage(TickStage::Lighting);
    let mut out = Vec::new();
    // Old 20 and new 30/25 all sit at or above max_y.
    assert_eq!(column.drain_dirty(8, 0, 20, &mut out), 0);
    assert_eq!(column.drain_dirty(8, i32::MIN, i32::MAX, &mut out), 0);

    h.stage(TickStage::Simulation);
    chunk.set_block(-14, 31, 32, stone);
    assert!(column.notify_block_change(&chunk, -14, 31, 32));
    h.stage(TickStage::Lighting);
    assert_eq!(column.drain_dirty(8, 0, 40, &mut out), 1);
    assert_eq!(out[0].world_x, -14);
    assert_eq!(out[0].world_z, 32);
}

#[test]
fn drain_respects_capacity_and_requeues() {
    let h = Harness::new(KEY);
    let column = h.column(KEY, ColumnSource::Generated(vec![0; CELLS]));
    let chunk = ChunkBuf::new_uniform(ChunkCoord::new(0, 0, 0), h.block("stone"));
    assert_eq!(column.notify_chunk_loaded(&chunk), CELLS);
    assert_eq!(h.queue.pop(), Some(KEY));

    h.stage(TickStage::Lighting);
    assert_eq!(column.approximate_dirty_count(), 256);
    let mut out = Vec::new();
    assert_eq!(column.drain_dirty(100, i32::MIN, i32::MAX, &mut out), 100);
    assert!(column.is_queued());
    assert_eq!(h.queue.pop(), Some(KEY));
    assert_eq!(column.drain_dirty(200, i32::MIN, i32::MAX, &mut out), CELLS - 100);
    assert!(!column.is_queued());
    assert!(h.queue.is_empty());

    let mut cells: Vec<(i32, i32)> = out.iter().map(|c| (c.world_x, c.world_z)).collect();
    cells.sort();
    cells.dedup();
    assert_eq!(cells.len(), CELLS);
}

#[test]
fn change_from_unknown_snapshot_is_never_reported() {
    let h = Harness::new(KEY);
    let column = h.column(KEY, ColumnSource::Fresh);
    let chunk = chunk_with(&h, 0, &[(0, 3, 0)]);
    assert!(column.notify_chunk_added(&chunk, 0, 0));
    assert_eq!(h.queue.pop(), Some(KEY));

    h.stage(TickStage::Lighting);
    let mut out = Vec::new();
    assert_eq!(column.drain_dirty(8, i32::MIN, i32::MAX, &mut out), 0);
    assert!(!column.is_queued());
    assert!(h.queue.is_empty());
    h.stage(TickStage::Snapshot);
    column.copy_snapshot();
    assert_eq!(column.snapshot_height(0, 0), 3);

    // Next tick: another mark re-queues the column, and the old cell now
    // compares equal to its snapshot.
    h.stage(TickStage::Simulation);
    column.mark_dirty(0, 0);
    assert_eq!(h.queue.pop(), Some(KEY));
    h.stage(TickStage::Lighting);
    assert_eq!(column.drain_dirty(8, i32::MIN, i32::MAX, &mut out), 0);
    assert!(out.is_empty());
}

#[test]
fn finalize_refreshes_topmost_from_loaded_chunks() {
    let h = Harness::new(KEY);
    let world = TestWorld::default();
    let column = h.column(KEY, ColumnSource::Fresh);
    let chunk = world.insert(chunk_with(&h, 0, &[(1, 6, 1)]));
    chunk.set_block(2, 4, 2, h.block("sand"));
    column.notify_chunk_loaded(&chunk);

    h.stage(TickStage::Snapshot);
    assert_eq!(column.topmost_block(1, 1), None);
    h.stage(TickStage::Finalize);
    assert_eq!(column.finalize_tick(&world), 2);
    assert_eq!(column.finalize_tick(&world), 0);
    h.stage(TickStage::PreSnapshot);
    assert_eq!(column.topmost_block(1, 1), Some(h.block("stone")));
    assert_eq!(column.topmost_block(2, 2), Some(h.block("sand")));
    assert_eq!(column.topmost_block(3, 3), None);
}

#[test]
fn finalize_miss_yields_unknown() {
    let h = Harness::new(KEY);
    let world = TestWorld::default();
    let column = h.column(KEY, ColumnSource::Fresh);
    let chunk = chunk_with(&h, 0, &[(5, 5, 5)]);
    column.notify_chunk_added(&chunk, 5, 5);
    h.stage(TickStage::Finalize);
    assert_eq!(column.finalize_tick(&world), 1);
    h.stage(TickStage::Snapshot);
    assert_eq!(column.topmost_block(5, 5), None);
}

#[test]
fn register_widens_bounds() {
    let h = Harness::new(KEY);
    let column = h.column(KEY, ColumnSource::Fresh);
    column.register_chunk(5, 20);
    column.register_chunk(-3, 10);
    assert_eq!(column.bounds(), Some((-3, 20)));
    assert_eq!(column.active_chunk_count(), 2);
}

#[test]
fn last_deregister_saves_once_and_removes() {
    let h = Harness::new(KEY);
    let world = TestWorld::default();
    let column = h.column(KEY, ColumnSource::Fresh);
    column.register_chunk(0, 15);
    column.register_chunk(16, 31);

    h.stage(TickStage::Snapshot);
    assert!(!column.deregister_chunk(true, &world));
    assert_eq!(world.saves.load(Ordering::SeqCst), 0);
    assert!(column.deregister_chunk(true, &world));
    assert_eq!(column.active_chunk_count(), 0);
    assert!(!column.active_chunks());
    assert_eq!(world.saves.load(Ordering::SeqCst), 1);
    assert_eq!(*world.removed.lock().unwrap(), vec![KEY]);
}

#[test]
fn deregister_without_save_only_counts_down() {
    let h = Harness::new(KEY);
    let world = TestWorld::default();
    let column = h.column(KEY, ColumnSource::Fresh);
    column.register_chunk(0, 15);
    assert!(!column.deregister_chunk(false, &world));
    assert_eq!(column.active_chunk_count(), 0);
    assert_eq!(world.saves.load(Ordering::SeqCst), 0);
    assert!(world.removed.lock().unwrap().is_empty());
}

#[test]
#[should_panic(expected = "deregister_chunk called during simulation stage")]
fn saving_deregister_outside_snapshot_panics() {
    let h = Harness::new(KEY);
    let column = h.column(KEY, ColumnSource::Fresh);
    column.register_chunk(0, 15);
    column.deregister_chunk(true, &TestWorld::default());
}

#[test]
fn saved_column_loads_back_identically() {
    let key = ColumnKey::new(7, -3);
    let h = Harness::new(key);
    let world = TestWorld::default();
    let column = h.column(key, ColumnSource::Fresh);
    let chunk = world.insert(ChunkBuf::new_uniform(ChunkCoord::new(7, 0, -3), Block::AIR));
    chunk.set_block(112, 11, -48, h.block("grass"));
    chunk.set_block(120, 2, -40, h.block("dirt"));
    column.register_chunk(0, 15);
    column.notify_chunk_loaded(&chunk);
    column.set_biome(Arc::new(BiomeMap::filled(3)));
    h.stage(TickStage::Finalize);
    column.finalize_tick(&world);
    assert!(column.save(&world));

    let bytes = world.saved_bytes(key).unwrap();
    let loaded = h.column(key, ColumnSource::Stored(&mut bytes.as_slice()));
    assert_eq!(loaded.to_column_data(), column.to_column_data());
    assert_eq!(loaded.height(0, 0), 11);
    assert_eq!(loaded.height(8, 8), 2);
    assert_eq!(loaded.snapshot_height(0, 0), 11);
    assert_eq!(loaded.bounds(), Some((0, 15)));
    assert_eq!(loaded.active_chunk_count(), 0);
    assert_eq!(loaded.biome().unwrap().get(0, 0), 3);
}

#[test]
fn failed_save_is_reported_not_raised() {
    let h = Harness::new(KEY);
    let world = TestWorld {
        fail_writes: true,
        ..TestWorld::default()
    };
    let column = h.column(KEY, ColumnSource::Fresh);
    assert!(!column.save(&world));
}

#[test]
fn corrupt_stream_loads_as_unknown_with_generated_biome() {
    let generator = Arc::new(FixedTerrain::new(None, Some(BiomeMap::filled(9))));
    let h = Harness::with_generator(KEY, generator);
    let garbage = b"not a column";
    let column = h.column(KEY, ColumnSource::Stored(&mut &garbage[..]));
    assert_eq!(column.height(0, 0), HEIGHT_UNKNOWN);
    assert_eq!(column.bounds(), None);
    assert_eq!(column.biome().unwrap().get(4, 4), 9);
}

#[test]
fn surface_height_falls_back_to_generator_once() {
    let mut heights = vec![0; CELLS];
    heights[CHUNK_SIZE + 2] = 41;
    let generator = Arc::new(FixedTerrain::new(Some(heights), None));
    let h = Harness::with_generator(KEY, generator.clone());
    let column = h.column(KEY, ColumnSource::Fresh);
    assert_eq!(column.surface_height(1, 2), 41);
    assert_eq!(column.surface_height(0, 0), 0);
    assert_eq!(generator.height_calls.load(Ordering::SeqCst), 1);

    let chunk = chunk_with(&h, 0, &[(1, 14, 2)]);
    column.notify_block_change(&chunk, 1, 14, 2);
    assert_eq!(column.surface_height(1, 2), 14);
}

#[test]
fn surface_height_without_generator_uses_lowest_y() {
    let generator = Arc::new(FixedTerrain::new(None, None));
    let h = Harness::with_generator(KEY, generator.clone());
    let column = h.column(KEY, ColumnSource::Fresh);
    assert_eq!(column.surface_height(0, 0), HEIGHT_UNKNOWN);
    column.register_chunk(-32, -17);
    assert_eq!(column.surface_height(0, 0), -32);
    assert_eq!(generator.height_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn biome_is_set_once() {
    let generator = Arc::new(FixedTerrain::new(None, Some(BiomeMap::filled(1))));
    let h = Harness::with_generator(KEY, generator);
    let column = h.column(KEY, ColumnSource::Fresh);
    assert!(!column.set_biome(Arc::new(BiomeMap::filled(2))));
    assert_eq!(column.biome().unwrap().get(0, 0), 1);

    let bare = Harness::new(KEY).column(KEY, ColumnSource::Fresh);
    assert!(bare.biome().is_none());
    assert!(bare.set_biome(Arc::new(BiomeMap::filled(2))));
    assert!(!bare.set_biome(Arc::new(BiomeMap::filled(3))));
}

#[test]
fn rescan_lowers_after_surface_removal() {
    let h = Harness::new(KEY);
    let world = TestWorld::default();
    let column = h.column(KEY, ColumnSource::Fresh);
    let lower = world.insert(chunk_with(&h, 0, &[(3, 4, 3)]));
    let upper = world.insert(chunk_with(&h, 1, &[(3, 20, 3)]));
    column.register_chunk(0, 15);
    column.register_chunk(16, 31);
    column.notify_chunk_loaded(&lower);
    column.notify_chunk_loaded(&upper);
    assert_eq!(column.height(3, 3), 20);

    upper.set_block(3, 20, 3, Block::AIR);
    // The grid never lowers on its own.
    assert!(!column.notify_block_change(&upper, 3, 20, 3));
    assert_eq!(column.height(3, 3), 20);
    assert!(column.rescan_cell(3, 3, &world));
    assert_eq!(column.height(3, 3), 4);
    assert!(!column.rescan_cell(3, 3, &world));

    lower.set_block(3, 4, 3, Block::AIR);
    assert!(column.rescan_cell(3, 3, &world));
    assert_eq!(column.height(3, 3), -1);
}

#[test]
fn height_map_buffer_is_anchored_in_world_space() {
    let key = ColumnKey::new(-2, 1);
    let h = Harness::new(key);
    let mut heights = vec![0; CELLS];
    heights[5 * CHUNK_SIZE + 6] = 33;
    let column = h.column(key, ColumnSource::Generated(heights));
    let buf = column.height_map_buffer();
    assert_eq!((buf.origin_x, buf.origin_z), (-32, 16));
    assert_eq!(buf.get(-27, 22), Some(33));
    assert_eq!(buf.get(-33, 22), None);
}

#[test]
#[should_panic(expected = "mark_dirty called during lighting stage")]
fn marking_during_lighting_panics() {
    let h = Harness::new(KEY);
    let column = h.column(KEY, ColumnSource::Fresh);
    h.stage(TickStage::Lighting);
    column.mark_dirty(0, 0);
}

#[test]
#[should_panic(expected = "drain_dirty called during simulation stage")]
fn drain_outside_lighting_panics() {
    let h = Harness::new(KEY);
    let column = h.column(KEY, ColumnSource::Fresh);
    column.drain_dirty(1, 0, 1, &mut Vec::new());
}

#[test]
#[should_panic(expected = "topmost_block called during finalize stage")]
fn topmost_read_during_finalize_panics() {
    let h = Harness::new(KEY);
    let column = h.column(KEY, ColumnSource::Fresh);
    h.stage(TickStage::Finalize);
    column.topmost_block(0, 0);
}

#[test]
#[should_panic(expected = "height grid must hold")]
fn generated_grid_must_be_full() {
    let h = Harness::new(KEY);
    h.column(KEY, ColumnSource::Generated(vec![0; 3]));
}
