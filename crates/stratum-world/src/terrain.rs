//! Heightmap terrain from 2D simplex noise.

use std::sync::Arc;

use fastnoise_lite::{FastNoiseLite, NoiseType};
use stratum_blocks::{Block, BlockRegistry};
use stratum_chunk::{CHUNK_SIZE, ChunkBuf, ChunkCoord, ColumnKey};
use stratum_column::{BiomeId, BiomeMap, CELLS, TerrainGenerator};

use crate::worldgen::WorldGenParams;

#[derive(Clone, Copy, Debug)]
struct Palette {
    top: Block,
    subsoil: Block,
    deep: Block,
    beach: Block,
    water: Block,
}

/// Stone below, a soil band under a grass or sand top, water up to sea level.
pub struct NoiseTerrain {
    seed: i32,
    params: WorldGenParams,
    palette: Palette,
    registry: Arc<BlockRegistry>,
}

fn resolve(reg: &BlockRegistry, name: &str) -> Block {
    match reg.block_by_name(name) {
        Some(b) => b,
        None => {
            log::warn!("worldgen block '{name}' is not registered; using air");
            Block::AIR
        }
    }
}

impl NoiseTerrain {
    pub fn new(seed: i32, params: WorldGenParams, registry: Arc<BlockRegistry>) -> Self {
        let palette = Palette {
            top: resolve(&registry, &params.top),
            subsoil: resolve(&registry, &params.subsoil),
            deep: resolve(&registry, &params.deep),
            beach: resolve(&registry, &params.beach),
            water: resolve(&registry, &params.water_block),
        };
        Self {
            seed,
            params,
            palette,
            registry,
        }
    }

    #[inline]
    pub fn seed(&self) -> i32 {
        self.seed
    }

    #[inline]
    pub fn params(&self) -> &WorldGenParams {
        &self.params
    }

    fn height_noise(&self) -> FastNoiseLite {
        let mut n = FastNoiseLite::with_seed(self.seed);
        n.set_noise_type(Some(NoiseType::OpenSimplex2));
        n.set_frequency(Some(self.params.height_frequency));
        n
    }

    fn biome_noise(&self) -> FastNoiseLite {
        let mut n = FastNoiseLite::with_seed(self.seed ^ 0x1203_5F31);
        n.set_noise_type(Some(NoiseType::OpenSimplex2));
        n.set_frequency(Some(self.params.biome_frequency));
        n
    }

    fn ground_with(&self, noise: &FastNoiseLite, wx: i32, wz: i32) -> i32 {
        let t = (noise.get_noise_2d(wx as f32, wz as f32) * 0.5 + 0.5).clamp(0.0, 1.0);
        let span = (self.params.max_y - self.params.min_y) as f32;
        self.params.min_y + (t * span).round() as i32
    }

    /// Y of the top solid ground block, ignoring water.
    pub fn ground_height(&self, wx: i32, wz: i32) -> i32 {
        self.ground_with(&self.height_noise(), wx, wz)
    }

    /// Block at `y` in a cell whose ground top is `ground`.
    pub fn block_for(&self, ground: i32, y: i32) -> Block {
        let p = &self.palette;
        if y > ground {
            return match self.params.water_level {
                Some(level) if y <= level => p.water,
                _ => Block::AIR,
            };
        }
        if y == ground {
            let near_water = self
                .params
                .water_level
                .is_some_and(|level| ground <= level + self.params.beach_band);
            return if near_water { p.beach } else { p.top };
        }
        if y >= ground - self.params.subsoil_depth {
            p.subsoil
        } else {
            p.deep
        }
    }

    fn surface_from_ground(&self, ground: i32) -> i32 {
        let top = self.params.water_level.map_or(ground, |l| l.max(ground));
        let floor = ground - self.params.subsoil_depth - 1;
        (floor..=top)
            .rev()
            .find(|&y| self.registry.is_surface(self.block_for(ground, y)))
            .unwrap_or(floor)
    }

    /// Y of the highest surface block this terrain places in the cell.
    pub fn surface_height(&self, wx: i32, wz: i32) -> i32 {
        self.surface_from_ground(self.ground_height(wx, wz))
    }

    pub fn biome_at(&self, wx: i32, wz: i32) -> BiomeId {
        self.biome_with(&self.biome_noise(), wx, wz)
    }

    fn biome_with(&self, noise: &FastNoiseLite, wx: i32, wz: i32) -> BiomeId {
        let count = self.params.biome_count;
        let t = (noise.get_noise_2d(wx as f32, wz as f32) * 0.5 + 0.5).clamp(0.0, 1.0);
        ((t * count as f32) as u8).min(count - 1)
    }

    pub fn generate_chunk(&self, coord: ChunkCoord) -> ChunkBuf {
        let noise = self.height_noise();
        let (bx, by, bz) = (coord.base_x(), coord.base_y(), coord.base_z());
        let mut ground = [0i32; CELLS];
        for x in 0..CHUNK_SIZE {
            for z in 0..CHUNK_SIZE {
                ground[x * CHUNK_SIZE + z] = self.ground_with(&noise, bx + x as i32, bz + z as i32);
            }
        }
        let mut blocks = Vec::with_capacity(CHUNK_SIZE * CHUNK_SIZE * CHUNK_SIZE);
        for ly in 0..CHUNK_SIZE {
            for lz in 0..CHUNK_SIZE {
                for lx in 0..CHUNK_SIZE {
                    blocks.push(self.block_for(ground[lx * CHUNK_SIZE + lz], by + ly as i32));
                }
            }
        }
        ChunkBuf::from_blocks(coord, blocks)
    }

    fn per_cell<T>(&self, key: ColumnKey, f: impl Fn(i32, i32) -> T) -> Vec<T> {
        let mut out = Vec::with_capacity(CELLS);
        for x in 0..CHUNK_SIZE as i32 {
            for z in 0..CHUNK_SIZE as i32 {
                out.push(f(key.base_x() + x, key.base_z() + z));
            }
        }
        out
    }
}

impl TerrainGenerator for NoiseTerrain {
    fn surface_heights(&self, key: ColumnKey) -> Option<Vec<i32>> {
        let noise = self.height_noise();
        Some(self.per_cell(key, |wx, wz| {
            self.surface_from_ground(self.ground_with(&noise, wx, wz))
        }))
    }

    fn biomes_for(&self, key: ColumnKey) -> Option<BiomeMap> {
        let noise = self.biome_noise();
        BiomeMap::from_ids(self.per_cell(key, |wx, wz| self.biome_with(&noise, wx, wz)))
    }
}
