//! Block types and their static lighting/visibility properties.
#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

/// Maximum light level for either channel.
pub const MAX_LIGHT: u8 = 15;

/// Closed set of block types. The discriminant is the on-disk id.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Block {
    #[default]
    Air = 0,
    Grass = 1,
    Dirt = 2,
    Sand = 3,
    Stone = 4,
    Log = 5,
    Leaf = 6,
    Glowstone = 7,
    Snow = 8,
    Bedrock = 9,
    Cactus = 10,
    Planks = 11,
}

impl Block {
    pub const ALL: [Block; 12] = [
        Block::Air,
        Block::Grass,
        Block::Dirt,
        Block::Sand,
        Block::Stone,
        Block::Log,
        Block::Leaf,
        Block::Glowstone,
        Block::Snow,
        Block::Bedrock,
        Block::Cactus,
        Block::Planks,
    ];

    #[inline]
    pub const fn id(self) -> u8 {
        self as u8
    }

    pub const fn from_id(id: u8) -> Option<Block> {
        if (id as usize) < Block::ALL.len() {
            Some(Block::ALL[id as usize])
        } else {
            None
        }
    }

    #[inline]
    pub const fn is_air(self) -> bool {
        matches!(self, Block::Air)
    }

    /// Opaque blocks stop both light channels and hide neighbor faces.
    #[inline]
    pub const fn is_opaque(self) -> bool {
        !matches!(self, Block::Air | Block::Leaf | Block::Glowstone)
    }

    #[inline]
    pub const fn is_transparent(self) -> bool {
        !self.is_opaque()
    }

    /// Torch-channel light emitted by this block.
    #[inline]
    pub const fn emission(self) -> u8 {
        match self {
            Block::Glowstone => MAX_LIGHT,
            _ => 0,
        }
    }

    #[inline]
    pub const fn is_emitter(self) -> bool {
        self.emission() > 0
    }

    /// Whether an entity standing on top of this block is supported.
    #[inline]
    pub const fn is_solid(self) -> bool {
        !matches!(self, Block::Air)
    }

    pub fn name(self) -> &'static str {
        match self {
            Block::Air => "air",
            Block::Grass => "grass",
            Block::Dirt => "dirt",
            Block::Sand => "sand",
            Block::Stone => "stone",
            Block::Log => "log",
            Block::Leaf => "leaf",
            Block::Glowstone => "glowstone",
            Block::Snow => "snow",
            Block::Bedrock => "bedrock",
            Block::Cactus => "cactus",
            Block::Planks => "planks",
        }
    }

    pub fn from_name(name: &str) -> Option<Block> {
        Block::ALL.into_iter().find(|b| b.name() == name)
    }
}

impl std::fmt::Display for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
