use strata_geom::BlockPos;

use crate::{CHUNK_SIZE_I32, CLUSTER_SHIFT, CLUSTER_SIZE};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoord {
    pub cx: i32,
    pub cy: i32,
    pub cz: i32,
}

impl ChunkCoord {
    #[inline]
    pub const fn new(cx: i32, cy: i32, cz: i32) -> Self {
        Self { cx, cy, cz }
    }

    #[inline]
    pub fn with_y(self, cy: i32) -> Self {
        Self { cy, ..self }
    }

    #[inline]
    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self {
            cx: self.cx + dx,
            cy: self.cy + dy,
            cz: self.cz + dz,
        }
    }

    #[inline]
    pub fn distance_sq(self, other: ChunkCoord) -> i64 {
        let dx = i64::from(self.cx - other.cx);
        let dy = i64::from(self.cy - other.cy);
        let dz = i64::from(self.cz - other.cz);
        dx * dx + dy * dy + dz * dz
    }

    /// Chunk containing a world block position.
    #[inline]
    pub fn containing(p: BlockPos) -> Self {
        Self::new(
            p.x.div_euclid(CHUNK_SIZE_I32),
            p.y.div_euclid(CHUNK_SIZE_I32),
            p.z.div_euclid(CHUNK_SIZE_I32),
        )
    }

    /// Splits a world block position into its chunk and chunk-local cell.
    #[inline]
    pub fn split(p: BlockPos) -> (Self, (usize, usize, usize)) {
        let local = (
            p.x.rem_euclid(CHUNK_SIZE_I32) as usize,
            p.y.rem_euclid(CHUNK_SIZE_I32) as usize,
            p.z.rem_euclid(CHUNK_SIZE_I32) as usize,
        );
        (Self::containing(p), local)
    }

    /// World position of the chunk's minimum corner.
    #[inline]
    pub fn origin(self) -> BlockPos {
        BlockPos::new(
            self.cx * CHUNK_SIZE_I32,
            self.cy * CHUNK_SIZE_I32,
            self.cz * CHUNK_SIZE_I32,
        )
    }

    #[inline]
    pub fn world_pos(self, x: usize, y: usize, z: usize) -> BlockPos {
        let o = self.origin();
        BlockPos::new(o.x + x as i32, o.y + y as i32, o.z + z as i32)
    }

    #[inline]
    pub fn cluster_key(self) -> ClusterKey {
        ClusterKey {
            x: self.cx >> CLUSTER_SHIFT,
            y: self.cy >> CLUSTER_SHIFT,
            z: self.cz >> CLUSTER_SHIFT,
        }
    }

    /// Slot of this chunk inside its cluster (low 3 bits of each axis).
    #[inline]
    pub fn slot_index(self) -> usize {
        let m = (CLUSTER_SIZE - 1) as i32;
        let (x, y, z) = (
            (self.cx & m) as usize,
            (self.cy & m) as usize,
            (self.cz & m) as usize,
        );
        (y * CLUSTER_SIZE + z) * CLUSTER_SIZE + x
    }
}

impl From<(i32, i32, i32)> for ChunkCoord {
    fn from(value: (i32, i32, i32)) -> Self {
        Self::new(value.0, value.1, value.2)
    }
}

impl From<ChunkCoord> for (i32, i32, i32) {
    fn from(value: ChunkCoord) -> Self {
        (value.cx, value.cy, value.cz)
    }
}

impl std::fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.cx, self.cy, self.cz)
    }
}

/// Coarse key of an 8x8x8 block of chunk slots.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClusterKey {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl ClusterKey {
    #[inline]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Chunk coordinate stored at `slot` of this cluster.
    #[inline]
    pub fn chunk_at(self, slot: usize) -> ChunkCoord {
        let x = (slot % CLUSTER_SIZE) as i32;
        let z = ((slot / CLUSTER_SIZE) % CLUSTER_SIZE) as i32;
        let y = (slot / (CLUSTER_SIZE * CLUSTER_SIZE)) as i32;
        ChunkCoord::new(
            (self.x << CLUSTER_SHIFT) + x,
            (self.y << CLUSTER_SHIFT) + y,
            (self.z << CLUSTER_SHIFT) + z,
        )
    }
}

/// Seed for a chunk's private RNG stream, derived from the world seed and
/// the chunk coordinates.
pub fn chunk_seed(world_seed: i32, c: ChunkCoord) -> u64 {
    let mut h = (world_seed as u32 as u64) ^ 0x9E37_79B9_7F4A_7C15;
    for v in [c.cx, c.cy, c.cz] {
        h ^= v as u32 as u64;
        h = h.wrapping_mul(0xBF58_476D_1CE4_E5B9);
        h ^= h >> 31;
        h = h.wrapping_mul(0x94D0_49BB_1331_11EB);
        h ^= h >> 29;
    }
    h
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CLUSTER_SLOTS;

    #[test]
    fn negative_coords_shift_arithmetically() {
        let c = ChunkCoord::new(-1, -8, -9);
        assert_eq!(c.cluster_key(), ClusterKey::new(-1, -1, -2));
        let k = c.cluster_key();
        assert_eq!(k.chunk_at(c.slot_index()), c);
    }

    #[test]
    fn split_handles_negative_blocks() {
        let (c, l) = ChunkCoord::split(BlockPos::new(-1, 16, -17));
        assert_eq!(c, ChunkCoord::new(-1, 1, -2));
        assert_eq!(l, (15, 0, 15));
        assert_eq!(c.world_pos(l.0, l.1, l.2), BlockPos::new(-1, 16, -17));
    }

    #[test]
    fn slots_cover_cluster_once() {
        let k = ClusterKey::new(2, -3, 0);
        let mut seen = vec![false; CLUSTER_SLOTS];
        for s in 0..CLUSTER_SLOTS {
            let c = k.chunk_at(s);
            assert_eq!(c.cluster_key(), k);
            assert!(!seen[c.slot_index()]);
            seen[c.slot_index()] = true;
        }
    }

    #[test]
    fn chunk_seed_differs_by_axis() {
        let a = chunk_seed(7, ChunkCoord::new(1, 0, 0));
        let b = chunk_seed(7, ChunkCoord::new(0, 1, 0));
        let c = chunk_seed(7, ChunkCoord::new(0, 0, 1));
        assert!(a != b && b != c && a != c);
        assert_eq!(a, chunk_seed(7, ChunkCoord::new(1, 0, 0)));
        assert_ne!(a, chunk_seed(8, ChunkCoord::new(1, 0, 0)));
    }
}
