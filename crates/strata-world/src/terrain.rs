use fastnoise_lite::{FastNoiseLite, NoiseType};
use strata_blocks::Block;

use crate::config::{TerrainConfig, TerrainMode};
use crate::{CHUNK_SIZE, CHUNK_VOLUME, ChunkCoord, local_index};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Biome {
    Plains,
    Forest,
    Desert,
    Tundra,
}

impl Biome {
    pub const ALL: [Biome; 4] = [Biome::Plains, Biome::Forest, Biome::Desert, Biome::Tundra];

    pub fn top_block(self) -> Block {
        match self {
            Biome::Plains | Biome::Forest => Block::Grass,
            Biome::Desert => Block::Sand,
            Biome::Tundra => Block::Snow,
        }
    }

    pub fn filler_block(self) -> Block {
        match self {
            Biome::Desert => Block::Sand,
            _ => Block::Dirt,
        }
    }
}

/// Deterministic height-field terrain. Every query is a pure function of the
/// seed, the config and the coordinates.
pub struct TerrainGen {
    seed: i32,
    cfg: TerrainConfig,
    height: FastNoiseLite,
    temperature: FastNoiseLite,
    moisture: FastNoiseLite,
}

fn noise(seed: i32, freq: f32) -> FastNoiseLite {
    let mut n = FastNoiseLite::with_seed(seed);
    n.set_noise_type(Some(NoiseType::OpenSimplex2));
    n.set_frequency(Some(freq));
    n
}

#[inline]
fn hash3(x: i32, y: i32, z: i32, seed: u32) -> u32 {
    let mut h = (x as u32).wrapping_mul(0x85eb_ca6b)
        ^ (y as u32).wrapping_mul(0x27d4_eb2d)
        ^ (z as u32).wrapping_mul(0xc2b2_ae35)
        ^ seed.wrapping_mul(0x1656_67b1);
    h ^= h >> 16;
    h = h.wrapping_mul(0x7feb_352d);
    h ^= h >> 15;
    h = h.wrapping_mul(0x846c_a68b);
    h ^= h >> 16;
    h
}

#[inline]
fn rand01(seed: i32, x: i32, y: i32, z: i32, salt: u32) -> f32 {
    let h = hash3(x, y, z, (seed as u32) ^ salt);
    (h & 0x00FF_FFFF) as f32 / 16_777_216.0
}

impl TerrainGen {
    pub fn new(seed: i32, cfg: TerrainConfig) -> Self {
        Self {
            seed,
            height: noise(seed, cfg.frequency),
            temperature: noise(seed.wrapping_add(101), cfg.biome_frequency),
            moisture: noise(seed.wrapping_add(202), cfg.biome_frequency * 1.7),
            cfg,
        }
    }

    #[inline]
    pub fn seed(&self) -> i32 {
        self.seed
    }

    #[inline]
    pub fn config(&self) -> &TerrainConfig {
        &self.cfg
    }

    /// World y of the topmost solid block in column (x, z).
    pub fn surface_height(&self, x: i32, z: i32) -> i32 {
        match self.cfg.mode {
            TerrainMode::Flat => self.cfg.flat_thickness.max(0),
            TerrainMode::Normal => {
                let n = self.height.get_noise_2d(x as f32, z as f32);
                let h = self.cfg.base_height + (n * self.cfg.amplitude).round() as i32;
                h.max(self.cfg.bedrock_y + 1)
            }
        }
    }

    pub fn biome_at(&self, x: i32, z: i32) -> Biome {
        if self.cfg.mode == TerrainMode::Flat {
            return Biome::Plains;
        }
        let t = self.temperature.get_noise_2d(x as f32, z as f32);
        let m = self.moisture.get_noise_2d(x as f32, z as f32);
        if t < -0.35 {
            Biome::Tundra
        } else if t > 0.35 {
            Biome::Desert
        } else if m > 0.1 {
            Biome::Forest
        } else {
            Biome::Plains
        }
    }

    /// Block at a world position given the column's precomputed surface and biome.
    fn column_block(&self, x: i32, y: i32, z: i32, surface: i32, biome: Biome) -> Block {
        if y > surface {
            return Block::Air;
        }
        match self.cfg.mode {
            TerrainMode::Flat => {
                if y < 0 {
                    Block::Stone
                } else if y == 0 {
                    Block::Bedrock
                } else if y == surface {
                    Block::Grass
                } else {
                    Block::Dirt
                }
            }
            TerrainMode::Normal => {
                if y <= self.cfg.bedrock_y {
                    Block::Bedrock
                } else if y == surface {
                    biome.top_block()
                } else if y > surface - self.cfg.dirt_depth {
                    biome.filler_block()
                } else if y < surface - 4
                    && rand01(self.seed, x, y, z, 0x0061_0057) < self.cfg.glowstone_chance
                {
                    Block::Glowstone
                } else {
                    Block::Stone
                }
            }
        }
    }

    pub fn block_at(&self, x: i32, y: i32, z: i32) -> Block {
        let surface = self.surface_height(x, z);
        self.column_block(x, y, z, surface, self.biome_at(x, z))
    }

    /// Fills `out` (one chunk, x fastest then z then y) with the terrain of `coord`.
    pub fn fill_chunk(&self, coord: ChunkCoord, out: &mut [Block]) {
        assert_eq!(out.len(), CHUNK_VOLUME, "chunk buffer has wrong size");
        let o = coord.origin();
        let mut columns = [(0i32, Biome::Plains); CHUNK_SIZE * CHUNK_SIZE];
        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                let (wx, wz) = (o.x + x as i32, o.z + z as i32);
                columns[z * CHUNK_SIZE + x] = (self.surface_height(wx, wz), self.biome_at(wx, wz));
            }
        }
        for y in 0..CHUNK_SIZE {
            let wy = o.y + y as i32;
            for z in 0..CHUNK_SIZE {
                for x in 0..CHUNK_SIZE {
                    let (surface, biome) = columns[z * CHUNK_SIZE + x];
                    out[local_index(x, y, z)] =
                        self.column_block(o.x + x as i32, wy, o.z + z as i32, surface, biome);
                }
            }
        }
    }
}
