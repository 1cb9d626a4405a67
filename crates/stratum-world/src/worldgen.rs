use serde::Deserialize;
use std::error::Error;
use std::fs;
use std::path::Path;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct WorldGenConfig {
    #[serde(default)]
    pub height: Height,
    #[serde(default)]
    pub surface: Surface,
    #[serde(default)]
    pub water: Water,
    #[serde(default)]
    pub biomes: Biomes,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Height {
    #[serde(default = "default_height_freq")]
    pub frequency: f32,
    #[serde(default = "default_min_y")]
    pub min_y: i32,
    #[serde(default = "default_max_y")]
    pub max_y: i32,
}
fn default_height_freq() -> f32 {
    0.02
}
fn default_min_y() -> i32 {
    24
}
fn default_max_y() -> i32 {
    72
}
impl Default for Height {
    fn default() -> Self {
        Self {
            frequency: default_height_freq(),
            min_y: default_min_y(),
            max_y: default_max_y(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Surface {
    #[serde(default = "default_top")]
    pub top: String,
    #[serde(default = "default_subsoil")]
    pub subsoil: String,
    #[serde(default = "default_subsoil_depth")]
    pub subsoil_depth: i32,
    #[serde(default = "default_deep")]
    pub deep: String,
    #[serde(default = "default_beach")]
    pub beach: String,
    #[serde(default = "default_beach_band")]
    pub beach_band: i32,
}
fn default_top() -> String {
    "grass".to_string()
}
fn default_subsoil() -> String {
    "dirt".to_string()
}
fn default_subsoil_depth() -> i32 {
    3
}
fn default_deep() -> String {
    "stone".to_string()
}
fn default_beach() -> String {
    "sand".to_string()
}
fn default_beach_band() -> i32 {
    2
}
impl Default for Surface {
    fn default() -> Self {
        Self {
            top: default_top(),
            subsoil: default_subsoil(),
            subsoil_depth: default_subsoil_depth(),
            deep: default_deep(),
            beach: default_beach(),
            beach_band: default_beach_band(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Water {
    #[serde(default = "default_water_enable")]
    pub enable: bool,
    #[serde(default = "default_water_level")]
    pub level: i32,
    #[serde(default = "default_water_block")]
    pub block: String,
}
fn default_water_enable() -> bool {
    true
}
fn default_water_level() -> i32 {
    40
}
fn default_water_block() -> String {
    "water".to_string()
}
impl Default for Water {
    fn default() -> Self {
        Self {
            enable: default_water_enable(),
            level: default_water_level(),
            block: default_water_block(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Biomes {
    #[serde(default = "default_biome_freq")]
    pub frequency: f32,
    #[serde(default = "default_biome_count")]
    pub count: u8,
}
fn default_biome_freq() -> f32 {
    0.004
}
fn default_biome_count() -> u8 {
    4
}
impl Default for Biomes {
    fn default() -> Self {
        Self {
            frequency: default_biome_freq(),
            count: default_biome_count(),
        }
    }
}

/// Resolved generation parameters, validated from a [`WorldGenConfig`].
#[derive(Clone, Debug, PartialEq)]
pub struct WorldGenParams {
    pub height_frequency: f32,
    pub min_y: i32,
    pub max_y: i32,
    pub top: String,
    pub subsoil: String,
    pub subsoil_depth: i32,
    pub deep: String,
    pub beach: String,
    pub beach_band: i32,
    pub water_level: Option<i32>,
    pub water_block: String,
    pub biome_frequency: f32,
    pub biome_count: u8,
}

impl Default for WorldGenParams {
    fn default() -> Self {
        Self::from_config(&WorldGenConfig::default())
    }
}

impl WorldGenParams {
    pub fn from_config(cfg: &WorldGenConfig) -> Self {
        let min_y = cfg.height.min_y.min(cfg.height.max_y);
        let max_y = cfg.height.max_y.max(cfg.height.min_y);
        Self {
            height_frequency: cfg.height.frequency,
            min_y,
            max_y,
            top: cfg.surface.top.clone(),
            subsoil: cfg.surface.subsoil.clone(),
            subsoil_depth: cfg.surface.subsoil_depth.max(0),
            deep: cfg.surface.deep.clone(),
            beach: cfg.surface.beach.clone(),
            beach_band: cfg.surface.beach_band.max(0),
            water_level: cfg.water.enable.then_some(cfg.water.level),
            water_block: cfg.water.block.clone(),
            biome_frequency: cfg.biomes.frequency,
            biome_count: cfg.biomes.count.max(1),
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self, Box<dyn Error>> {
        let cfg: WorldGenConfig = toml::from_str(s)?;
        Ok(Self::from_config(&cfg))
    }
}

pub fn load_params_from_path(path: &Path) -> Result<WorldGenParams, Box<dyn Error>> {
    let s = fs::read_to_string(path)?;
    WorldGenParams::from_toml_str(&s)
}
