use std::collections::HashMap;
use std::error::Error;
use std::fs;
use std::path::Path;

use super::config::{BlockDef, BlocksConfig};
use super::types::{Block, BlockId};

#[derive(Clone, Debug)]
pub struct BlockType {
    pub id: BlockId,
    pub name: String,
    pub solid: bool,
    pub surface: bool,
}

#[derive(Default, Clone, Debug)]
pub struct BlockRegistry {
    pub blocks: Vec<BlockType>,
    pub by_name: HashMap<String, BlockId>,
    pub unknown_block_id: Option<BlockId>,
}

const BUILTIN_BLOCKS: &str = r#"
unknown_block = "unknown"

[[blocks]]
name = "air"
solid = false

[[blocks]]
name = "stone"

[[blocks]]
name = "dirt"

[[blocks]]
name = "grass"

[[blocks]]
name = "sand"

[[blocks]]
name = "water"
solid = false
surface = true

[[blocks]]
name = "leaves"
solid = false
surface = true

[[blocks]]
name = "glass"

[[blocks]]
name = "tall_grass"
solid = false

[[blocks]]
name = "unknown"
"#;

impl BlockRegistry {
    pub fn new() -> Self {
        Self {
            blocks: Vec::new(),
            by_name: HashMap::new(),
            unknown_block_id: None,
        }
    }

    /// Registry with the block set the demo world generates.
    pub fn builtin() -> Self {
        Self::from_toml_str(BUILTIN_BLOCKS).expect("builtin block table is valid")
    }

    #[inline]
    pub fn get(&self, id: BlockId) -> Option<&BlockType> {
        self.blocks.get(id as usize)
    }

    pub fn id_by_name(&self, name: &str) -> Option<BlockId> {
        self.by_name.get(name).copied()
    }

    pub fn block_by_name(&self, name: &str) -> Option<Block> {
        self.id_by_name(name).map(Block::new)
    }

    /// True for anything counted as ground when tracking column heights.
    /// Ids missing from the registry never qualify.
    #[inline]
    pub fn is_surface(&self, b: Block) -> bool {
        self.get(b.id).map(|ty| ty.surface).unwrap_or(false)
    }

    #[inline]
    pub fn is_solid(&self, b: Block) -> bool {
        self.get(b.id).map(|ty| ty.solid).unwrap_or(false)
    }

    pub fn from_toml_str(toml_str: &str) -> Result<Self, Box<dyn Error>> {
        let cfg: BlocksConfig = toml::from_str(toml_str)?;
        Self::from_configs(cfg)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, Box<dyn Error>> {
        let s = fs::read_to_string(path)?;
        Self::from_toml_str(&s)
    }

    pub fn from_configs(cfg: BlocksConfig) -> Result<Self, Box<dyn Error>> {
        let mut reg = BlockRegistry::new();
        for def in cfg.blocks.into_iter() {
            reg.push_def(def)?;
        }
        match reg.id_by_name("air") {
            Some(0) => {}
            Some(other) => return Err(format!("air must use id 0, found {other}").into()),
            None => return Err("block table has no air entry".into()),
        }
        if let Some(name) = cfg.unknown_block {
            let id = reg
                .id_by_name(&name)
                .ok_or_else(|| format!("unknown_block '{name}' is not defined"))?;
            reg.unknown_block_id = Some(id);
        }
        Ok(reg)
    }

    fn push_def(&mut self, def: BlockDef) -> Result<(), Box<dyn Error>> {
        let next = self.blocks.len() as u16;
        let id = def.id.unwrap_or(next);
        // Ids index straight into `blocks`, so the table must stay dense.
        if id != next {
            return Err(format!("block '{}' has id {id}, expected {next}", def.name).into());
        }
        if self.by_name.contains_key(&def.name) {
            return Err(format!("duplicate block name '{}'", def.name).into());
        }
        let solid = def.solid.unwrap_or(true);
        let surface = def.surface.unwrap_or(solid);
        self.by_name.insert(def.name.clone(), id);
        self.blocks.push(BlockType {
            id,
            name: def.name,
            solid,
            surface,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_has_air_at_zero() {
        let reg = BlockRegistry::builtin();
        assert_eq!(reg.id_by_name("air"), Some(0));
        assert!(!reg.is_surface(Block::AIR));
        let stone = reg.block_by_name("stone").unwrap();
        assert!(reg.is_surface(stone));
        assert!(reg.is_solid(stone));
    }

    #[test]
    fn surface_can_differ_from_solid() {
        let reg = BlockRegistry::builtin();
        let water = reg.block_by_name("water").unwrap();
        assert!(!reg.is_solid(water));
        assert!(reg.is_surface(water));
        let tall = reg.block_by_name("tall_grass").unwrap();
        assert!(!reg.is_surface(tall));
    }

    #[test]
    fn out_of_range_ids_are_not_surface() {
        let reg = BlockRegistry::builtin();
        assert!(!reg.is_surface(Block::new(u16::MAX)));
    }
}
