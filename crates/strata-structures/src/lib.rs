//! Procedural structure templates and the neighbor-caching decorator that
//! stamps them across chunk borders.
#![forbid(unsafe_code)]

pub mod catalog;
pub mod decorator;

pub use catalog::StructureCatalog;
pub use decorator::{DecorationStats, Decorator, decorate_chunk};

use serde::Deserialize;
use strata_blocks::Block;
use strata_world::{Biome, CHUNK_SIZE_I32};

/// Farthest a template block may sit from its anchor on any axis. Keeps every
/// stamp inside the 3x3x3 window around the anchor's chunk.
pub const MAX_REACH: i32 = CHUNK_SIZE_I32;

fn one() -> f32 {
    1.0
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct TemplateBlock {
    /// Offset from the base block the structure stands on.
    pub offset: [i32; 3],
    pub block: Block,
    /// Independent chance this block is written once the template fits.
    #[serde(default = "one")]
    pub probability: f32,
    /// The target may already hold `block` instead of air.
    #[serde(default)]
    pub allow_overlap: bool,
}

impl TemplateBlock {
    pub fn new(offset: [i32; 3], block: Block) -> Self {
        Self {
            offset,
            block,
            probability: 1.0,
            allow_overlap: false,
        }
    }

    pub fn chance(mut self, p: f32) -> Self {
        self.probability = p;
        self
    }

    pub fn overlapping(mut self) -> Self {
        self.allow_overlap = true;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct StructureTemplate {
    pub name: String,
    /// Surface block the structure must stand on.
    pub base: Block,
    /// Per-column placement chance.
    pub chance: f32,
    #[serde(default)]
    pub biomes: Vec<Biome>,
    pub blocks: Vec<TemplateBlock>,
}

impl StructureTemplate {
    pub fn grows_in(&self, biome: Biome) -> bool {
        self.biomes.contains(&biome)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("structure name must not be empty".into());
        }
        if self.base.is_air() {
            return Err(format!("structure '{}': base must not be air", self.name));
        }
        if !(0.0..=1.0).contains(&self.chance) {
            return Err(format!("structure '{}': chance {} outside [0, 1]", self.name, self.chance));
        }
        if self.blocks.is_empty() {
            return Err(format!("structure '{}' has no blocks", self.name));
        }
        for tb in &self.blocks {
            if tb.block.is_air() {
                return Err(format!("structure '{}': template blocks must not be air", self.name));
            }
            if !(0.0..=1.0).contains(&tb.probability) {
                return Err(format!(
                    "structure '{}': probability {} outside [0, 1]",
                    self.name, tb.probability
                ));
            }
            if tb.offset.iter().any(|c| c.abs() > MAX_REACH) {
                return Err(format!(
                    "structure '{}': offset {:?} reaches farther than {} blocks",
                    self.name, tb.offset, MAX_REACH
                ));
            }
        }
        Ok(())
    }
}

/// Broadleaf tree: a log trunk under two wide leaf layers and a narrow crown.
pub fn oak() -> StructureTemplate {
    let trunk = 5;
    let mut blocks: Vec<TemplateBlock> = (1..=trunk).map(|y| TemplateBlock::new([0, y, 0], Block::Log)).collect();
    for y in [trunk - 1, trunk] {
        for dz in -2i32..=2 {
            for dx in -2i32..=2 {
                if dx == 0 && dz == 0 {
                    continue;
                }
                let leaf = TemplateBlock::new([dx, y, dz], Block::Leaf).overlapping();
                // Ragged corners.
                let leaf = if dx.abs() == 2 && dz.abs() == 2 { leaf.chance(0.5) } else { leaf };
                blocks.push(leaf);
            }
        }
    }
    for dz in -1i32..=1 {
        for dx in -1i32..=1 {
            blocks.push(TemplateBlock::new([dx, trunk + 1, dz], Block::Leaf).overlapping());
        }
    }
    blocks.push(TemplateBlock::new([0, trunk + 2, 0], Block::Leaf).overlapping());
    StructureTemplate {
        name: "oak".into(),
        base: Block::Grass,
        chance: 0.01,
        biomes: vec![Biome::Forest, Biome::Plains],
        blocks,
    }
}

/// Conifer on snow: tall trunk with leaf rings narrowing toward the top.
pub fn spruce() -> StructureTemplate {
    let trunk = 7;
    let mut blocks: Vec<TemplateBlock> = (1..=trunk).map(|y| TemplateBlock::new([0, y, 0], Block::Log)).collect();
    for (y, r) in [(3, 2i32), (4, 1), (5, 2), (6, 1), (7, 1)] {
        for dz in -r..=r {
            for dx in -r..=r {
                if (dx == 0 && dz == 0) || (dx.abs() == r && dz.abs() == r && r > 1) {
                    continue;
                }
                blocks.push(TemplateBlock::new([dx, y, dz], Block::Leaf).overlapping());
            }
        }
    }
    blocks.push(TemplateBlock::new([0, trunk + 1, 0], Block::Leaf).overlapping());
    StructureTemplate {
        name: "spruce".into(),
        base: Block::Snow,
        chance: 0.008,
        biomes: vec![Biome::Tundra],
        blocks,
    }
}

pub fn cactus() -> StructureTemplate {
    StructureTemplate {
        name: "cactus".into(),
        base: Block::Sand,
        chance: 0.004,
        biomes: vec![Biome::Desert],
        blocks: vec![
            TemplateBlock::new([0, 1, 0], Block::Cactus),
            TemplateBlock::new([0, 2, 0], Block::Cactus),
            TemplateBlock::new([0, 3, 0], Block::Cactus).chance(0.5),
        ],
    }
}

/// Lumpy stone mound that may sink one block into the ground around it.
pub fn boulder() -> StructureTemplate {
    let mut blocks = Vec::new();
    for dz in -1i32..=1 {
        for dx in -1i32..=1 {
            let edge = dx != 0 || dz != 0;
            blocks.push(TemplateBlock::new([dx, 1, dz], Block::Stone).chance(if edge { 0.8 } else { 1.0 }));
        }
    }
    blocks.push(TemplateBlock::new([0, 2, 0], Block::Stone));
    blocks.push(TemplateBlock::new([1, 2, 0], Block::Stone).chance(0.4));
    StructureTemplate {
        name: "boulder".into(),
        base: Block::Grass,
        chance: 0.0015,
        biomes: vec![Biome::Plains],
        blocks,
    }
}

/// Wooden post capped with glowstone.
pub fn lantern() -> StructureTemplate {
    StructureTemplate {
        name: "lantern".into(),
        base: Block::Grass,
        chance: 0.0008,
        biomes: vec![Biome::Plains, Biome::Forest],
        blocks: vec![
            TemplateBlock::new([0, 1, 0], Block::Planks),
            TemplateBlock::new([0, 2, 0], Block::Planks),
            TemplateBlock::new([0, 3, 0], Block::Glowstone),
        ],
    }
}

pub fn builtin_templates() -> Vec<StructureTemplate> {
    vec![oak(), spruce(), cactus(), boulder(), lantern()]
}
