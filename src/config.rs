use serde::Deserialize;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct RunConfig {
    #[serde(default = "default_seed")]
    pub seed: i32,
    /// Chunks loaded in each direction around the origin column.
    #[serde(default = "default_radius")]
    pub radius: i32,
    #[serde(default = "default_chunks_y")]
    pub chunks_y: i32,
    #[serde(default = "default_ticks")]
    pub ticks: u64,
    #[serde(default = "default_edits_per_tick")]
    pub edits_per_tick: usize,
    /// Worker threads; 0 picks one per core.
    #[serde(default)]
    pub threads: usize,
    #[serde(default)]
    pub save_dir: Option<PathBuf>,
    #[serde(default)]
    pub blocks: Option<PathBuf>,
    #[serde(default)]
    pub worldgen: Option<PathBuf>,
    #[serde(default)]
    pub light: LightRange,
}

fn default_seed() -> i32 {
    1337
}
fn default_radius() -> i32 {
    2
}
fn default_chunks_y() -> i32 {
    6
}
fn default_ticks() -> u64 {
    100
}
fn default_edits_per_tick() -> usize {
    64
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            radius: default_radius(),
            chunks_y: default_chunks_y(),
            ticks: default_ticks(),
            edits_per_tick: default_edits_per_tick(),
            threads: 0,
            save_dir: None,
            blocks: None,
            worldgen: None,
            light: LightRange::default(),
        }
    }
}

/// Y band that lighting cares about; unset ends are unbounded.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct LightRange {
    #[serde(default)]
    pub min_y: Option<i32>,
    #[serde(default)]
    pub max_y: Option<i32>,
}

impl RunConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, Box<dyn Error>> {
        let cfg: RunConfig = toml::from_str(s)?;
        if cfg.radius < 0 || cfg.chunks_y <= 0 {
            return Err(format!(
                "radius must be >= 0 and chunks_y > 0 (got {} and {})",
                cfg.radius, cfg.chunks_y
            )
            .into());
        }
        Ok(cfg)
    }

    pub fn load(path: &Path) -> Result<Self, Box<dyn Error>> {
        let s = fs::read_to_string(path)?;
        Self::from_toml_str(&s)
    }

    /// Resident chunk count once the square around the origin is loaded.
    pub fn chunk_count(&self) -> usize {
        let side = (2 * self.radius + 1) as usize;
        side * side * self.chunks_y as usize
    }
}
