//! World-space addressing, configuration and terrain generation.
#![forbid(unsafe_code)]

pub mod config;
pub mod coord;
pub mod terrain;

pub use config::{
    DecorationConfig, EntityConfig, MAX_RADIUS, RenderConfig, StreamingConfig, TerrainConfig, TerrainMode,
    WorldConfig,
};
pub use coord::{ChunkCoord, ClusterKey, chunk_seed};
pub use terrain::{Biome, TerrainGen};

/// Edge length of a chunk in blocks.
pub const CHUNK_SIZE: usize = 16;
pub const CHUNK_SIZE_I32: i32 = CHUNK_SIZE as i32;
pub const CHUNK_VOLUME: usize = CHUNK_SIZE * CHUNK_SIZE * CHUNK_SIZE;
/// log2 of the cluster edge length in chunks.
pub const CLUSTER_SHIFT: i32 = 3;
pub const CLUSTER_SIZE: usize = 1 << CLUSTER_SHIFT;
pub const CLUSTER_SLOTS: usize = CLUSTER_SIZE * CLUSTER_SIZE * CLUSTER_SIZE;

/// Linear index of a chunk-local cell, x fastest then z then y.
#[inline]
pub const fn local_index(x: usize, y: usize, z: usize) -> usize {
    (y * CHUNK_SIZE + z) * CHUNK_SIZE + x
}

/// Inverse of [`local_index`].
#[inline]
pub const fn local_coords(i: usize) -> (usize, usize, usize) {
    let x = i % CHUNK_SIZE;
    let z = (i / CHUNK_SIZE) % CHUNK_SIZE;
    let y = i / (CHUNK_SIZE * CHUNK_SIZE);
    (x, y, z)
}
