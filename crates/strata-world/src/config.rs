use serde::Deserialize;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

/// Largest loader radius, in chunks, a config may ask for.
pub const MAX_RADIUS: i32 = 64;

#[derive(Clone, Debug, Deserialize)]
pub struct WorldConfig {
    #[serde(default = "default_seed")]
    pub seed: i32,
    /// Directory for cluster files. `None` keeps the world in memory only.
    #[serde(default)]
    pub save_dir: Option<PathBuf>,
    #[serde(default)]
    pub streaming: StreamingConfig,
    #[serde(default)]
    pub terrain: TerrainConfig,
    #[serde(default)]
    pub decoration: DecorationConfig,
    #[serde(default)]
    pub entities: EntityConfig,
    #[serde(default)]
    pub render: RenderConfig,
}

fn default_seed() -> i32 {
    1337
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            save_dir: None,
            streaming: StreamingConfig::default(),
            terrain: TerrainConfig::default(),
            decoration: DecorationConfig::default(),
            entities: EntityConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

impl WorldConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, Box<dyn Error>> {
        let cfg: WorldConfig = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: &Path) -> Result<Self, Box<dyn Error>> {
        let s = fs::read_to_string(path)?;
        Self::from_toml_str(&s)
    }

    pub fn validate(&self) -> Result<(), Box<dyn Error>> {
        if !(0..=MAX_RADIUS).contains(&self.streaming.radius) {
            return Err(format!(
                "streaming.radius must be within [0, {MAX_RADIUS}], got {}",
                self.streaming.radius
            )
            .into());
        }
        if self.streaming.max_loaders == 0 {
            return Err("streaming.max_loaders must be > 0".into());
        }
        if !self.render.teardown_capacity.is_power_of_two() {
            return Err(format!(
                "render.teardown_capacity must be a power of two, got {}",
                self.render.teardown_capacity
            )
            .into());
        }
        if self.entities.capacity == 0 {
            return Err("entities.capacity must be > 0".into());
        }
        if !(0.0..=1.0).contains(&self.terrain.glowstone_chance) {
            return Err("terrain.glowstone_chance must be within [0, 1]".into());
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct StreamingConfig {
    /// Loader radius in chunks.
    #[serde(default = "default_radius")]
    pub radius: i32,
    #[serde(default = "default_max_loaders")]
    pub max_loaders: usize,
}
fn default_radius() -> i32 {
    4
}
fn default_max_loaders() -> usize {
    8
}
impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            radius: default_radius(),
            max_loaders: default_max_loaders(),
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TerrainMode {
    Normal,
    Flat,
}

fn default_mode() -> TerrainMode {
    TerrainMode::Normal
}

#[derive(Clone, Debug, Deserialize)]
pub struct TerrainConfig {
    #[serde(default = "default_mode")]
    pub mode: TerrainMode,
    /// Height of the grass layer above the bedrock floor in flat mode.
    #[serde(default = "default_flat_thickness")]
    pub flat_thickness: i32,
    #[serde(default = "default_base_height")]
    pub base_height: i32,
    #[serde(default = "default_amplitude")]
    pub amplitude: f32,
    #[serde(default = "default_frequency")]
    pub frequency: f32,
    #[serde(default = "default_biome_frequency")]
    pub biome_frequency: f32,
    #[serde(default = "default_dirt_depth")]
    pub dirt_depth: i32,
    #[serde(default = "default_glowstone_chance")]
    pub glowstone_chance: f32,
    #[serde(default = "default_bedrock_y")]
    pub bedrock_y: i32,
}
fn default_flat_thickness() -> i32 {
    4
}
fn default_base_height() -> i32 {
    24
}
fn default_amplitude() -> f32 {
    12.0
}
fn default_frequency() -> f32 {
    0.01
}
fn default_biome_frequency() -> f32 {
    0.002
}
fn default_dirt_depth() -> i32 {
    3
}
fn default_glowstone_chance() -> f32 {
    0.002
}
fn default_bedrock_y() -> i32 {
    -48
}
impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            flat_thickness: default_flat_thickness(),
            base_height: default_base_height(),
            amplitude: default_amplitude(),
            frequency: default_frequency(),
            biome_frequency: default_biome_frequency(),
            dirt_depth: default_dirt_depth(),
            glowstone_chance: default_glowstone_chance(),
            bedrock_y: default_bedrock_y(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct DecorationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}
fn default_true() -> bool {
    true
}
impl Default for DecorationConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct EntityConfig {
    #[serde(default = "default_entity_capacity")]
    pub capacity: usize,
    #[serde(default = "default_item_lifetime")]
    pub item_lifetime_ticks: u32,
}
fn default_entity_capacity() -> usize {
    256
}
fn default_item_lifetime() -> u32 {
    6000
}
impl Default for EntityConfig {
    fn default() -> Self {
        Self {
            capacity: default_entity_capacity(),
            item_lifetime_ticks: default_item_lifetime(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct RenderConfig {
    /// Slots in the world-to-render teardown ring. Must be a power of two.
    #[serde(default = "default_teardown_capacity")]
    pub teardown_capacity: usize,
}
fn default_teardown_capacity() -> usize {
    64
}
impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            teardown_capacity: default_teardown_capacity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let cfg = WorldConfig::from_toml_str("").expect("empty config");
        assert_eq!(cfg.seed, 1337);
        assert_eq!(cfg.streaming.radius, 4);
        assert_eq!(cfg.terrain.mode, TerrainMode::Normal);
        assert!(cfg.decoration.enabled);
        assert!(cfg.save_dir.is_none());
    }

    #[test]
    fn partial_sections_merge_with_defaults() {
        let cfg = WorldConfig::from_toml_str(
            r#"
            seed = 9
            [terrain]
            mode = "flat"
            flat_thickness = 2
            [streaming]
            radius = 2
            "#,
        )
        .expect("config");
        assert_eq!(cfg.seed, 9);
        assert_eq!(cfg.terrain.mode, TerrainMode::Flat);
        assert_eq!(cfg.terrain.flat_thickness, 2);
        assert_eq!(cfg.terrain.base_height, 24);
        assert_eq!(cfg.streaming.max_loaders, 8);
    }

    #[test]
    fn rejects_non_power_of_two_ring() {
        let err = WorldConfig::from_toml_str("[render]\nteardown_capacity = 24\n");
        assert!(err.is_err());
    }

    #[test]
    fn sample_config_parses() {
        let cfg = WorldConfig::from_toml_str(include_str!("../../../config/world.toml")).expect("sample config");
        assert_eq!(cfg.streaming.max_loaders, 8);
        assert_eq!(cfg.render.teardown_capacity, 64);
    }

    #[test]
    fn radius_is_bounded() {
        let at_max = format!("[streaming]\nradius = {MAX_RADIUS}\n");
        assert!(WorldConfig::from_toml_str(&at_max).is_ok());
        assert!(WorldConfig::from_toml_str("[streaming]\nradius = 30000\n").is_err());
        assert!(WorldConfig::from_toml_str("[streaming]\nradius = -1\n").is_err());
    }
}
