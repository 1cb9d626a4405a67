use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub struct BlocksConfig {
    pub blocks: Vec<BlockDef>,
    #[serde(default)]
    pub unknown_block: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct BlockDef {
    pub name: String,
    #[serde(default)]
    pub id: Option<u16>,
    #[serde(default)]
    pub solid: Option<bool>,
    // Counted as ground when tracking column heights; falls back to `solid`.
    #[serde(default)]
    pub surface: Option<bool>,
}
