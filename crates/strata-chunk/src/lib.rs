//! Chunk storage: blocks, packed light, pending light work and per-chunk RNG.
#![forbid(unsafe_code)]

pub mod queue;

pub use queue::{LightQueue, LightQueueItem};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use strata_blocks::{Block, MAX_LIGHT};
use strata_geom::Face;
use strata_world::{CHUNK_SIZE, CHUNK_VOLUME, ChunkCoord, TerrainGen, chunk_seed, local_index};

/// Light channel; the value is the bit offset of its nibble in the packed byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LightChannel {
    Sky,
    Torch,
}

impl LightChannel {
    pub const ALL: [LightChannel; 2] = [LightChannel::Sky, LightChannel::Torch];

    #[inline]
    const fn shift(self) -> u8 {
        match self {
            LightChannel::Sky => 4,
            LightChannel::Torch => 0,
        }
    }

    #[inline]
    pub fn unpack(self, packed: u8) -> u8 {
        (packed >> self.shift()) & 0x0F
    }

    #[inline]
    pub fn pack(self, packed: u8, value: u8) -> u8 {
        debug_assert!(value <= MAX_LIGHT);
        let mask = 0x0F << self.shift();
        (packed & !mask) | ((value & 0x0F) << self.shift())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LightPass {
    Insert,
    Delete,
}

#[inline]
const fn queue_slot(channel: LightChannel, pass: LightPass) -> usize {
    match (channel, pass) {
        (LightChannel::Torch, LightPass::Insert) => 0,
        (LightChannel::Torch, LightPass::Delete) => 1,
        (LightChannel::Sky, LightPass::Insert) => 2,
        (LightChannel::Sky, LightPass::Delete) => 3,
    }
}

pub struct Chunk {
    pub coord: ChunkCoord,
    blocks: Box<[Block]>,
    light: Box<[u8]>,
    queues: [LightQueue; 4],
    rng: ChaCha8Rng,
    tainted: bool,
    modified: bool,
    /// Bit x of entry z marks column (x, z) as lit from the open sky above.
    sky_columns: [u16; CHUNK_SIZE],
}

impl Chunk {
    /// An all-air chunk.
    pub fn new(coord: ChunkCoord, world_seed: i32) -> Self {
        Self::from_blocks(coord, world_seed, vec![Block::Air; CHUNK_VOLUME].into_boxed_slice())
    }

    pub fn from_blocks(coord: ChunkCoord, world_seed: i32, blocks: Box<[Block]>) -> Self {
        assert_eq!(blocks.len(), CHUNK_VOLUME, "chunk {coord} block array has wrong size");
        Self {
            coord,
            blocks,
            light: vec![0u8; CHUNK_VOLUME].into_boxed_slice(),
            queues: Default::default(),
            rng: ChaCha8Rng::seed_from_u64(chunk_seed(world_seed, coord)),
            tainted: true,
            modified: false,
            sky_columns: [0; CHUNK_SIZE],
        }
    }

    #[inline]
    pub fn block(&self, x: usize, y: usize, z: usize) -> Block {
        self.blocks[local_index(x, y, z)]
    }

    /// Writes a block and returns the previous one. Light is left to the caller.
    #[inline]
    pub fn set_block(&mut self, x: usize, y: usize, z: usize, b: Block) -> Block {
        let i = local_index(x, y, z);
        let old = self.blocks[i];
        self.blocks[i] = b;
        old
    }

    #[inline]
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Replaces the whole block array, resetting light and pending light work.
    pub fn replace_blocks(&mut self, blocks: Box<[Block]>) {
        assert_eq!(blocks.len(), CHUNK_VOLUME, "chunk {} block array has wrong size", self.coord);
        self.blocks = blocks;
        self.light.fill(0);
        self.sky_columns = [0; CHUNK_SIZE];
        self.tainted = true;
    }

    #[inline]
    pub fn light(&self, channel: LightChannel, x: usize, y: usize, z: usize) -> u8 {
        channel.unpack(self.light[local_index(x, y, z)])
    }

    #[inline]
    pub fn set_light(&mut self, channel: LightChannel, x: usize, y: usize, z: usize, v: u8) {
        let i = local_index(x, y, z);
        self.light[i] = channel.pack(self.light[i], v);
    }

    /// Packed light bytes: high nibble sky, low nibble torch.
    #[inline]
    pub fn light_bytes(&self) -> &[u8] {
        &self.light
    }

    pub fn clear_light(&mut self) {
        self.light.fill(0);
        self.sky_columns = [0; CHUNK_SIZE];
        for q in &mut self.queues {
            q.clear();
        }
    }

    #[inline]
    pub fn queue(&self, channel: LightChannel, pass: LightPass) -> &LightQueue {
        &self.queues[queue_slot(channel, pass)]
    }

    #[inline]
    pub fn queue_mut(&mut self, channel: LightChannel, pass: LightPass) -> &mut LightQueue {
        &mut self.queues[queue_slot(channel, pass)]
    }

    pub fn has_pending_light(&self) -> bool {
        self.queues.iter().any(|q| !q.is_empty())
    }

    #[inline]
    pub fn rng(&self) -> &ChaCha8Rng {
        &self.rng
    }

    #[inline]
    pub fn rng_mut(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    #[inline]
    pub fn set_rng(&mut self, rng: ChaCha8Rng) {
        self.rng = rng;
    }

    #[inline]
    pub fn is_tainted(&self) -> bool {
        self.tainted
    }

    #[inline]
    pub fn mark_tainted(&mut self) {
        self.tainted = true;
    }

    #[inline]
    pub fn clear_tainted(&mut self) {
        self.tainted = false;
    }

    /// Set when the block array diverges from generated terrain through a
    /// user edit; such chunks are persisted on unload.
    #[inline]
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    #[inline]
    pub fn mark_modified(&mut self) {
        self.modified = true;
    }

    #[inline]
    pub fn clear_modified(&mut self) {
        self.modified = false;
    }

    #[inline]
    pub fn sky_column(&self, x: usize, z: usize) -> bool {
        self.sky_columns[z] & (1 << x) != 0
    }

    #[inline]
    pub fn set_sky_column(&mut self, x: usize, z: usize, open: bool) {
        if open {
            self.sky_columns[z] |= 1 << x;
        } else {
            self.sky_columns[z] &= !(1 << x);
        }
    }

    pub fn non_air_count(&self) -> usize {
        self.blocks.iter().filter(|b| !b.is_air()).count()
    }
}

/// Resolves the face neighbor of a chunk-local cell, stepping into the
/// adjacent chunk when the cell lies on the boundary.
#[inline]
pub fn neighbor_cell(
    coord: ChunkCoord,
    x: usize,
    y: usize,
    z: usize,
    face: Face,
) -> (ChunkCoord, usize, usize, usize) {
    let (dx, dy, dz) = face.delta();
    let n = CHUNK_SIZE as i32;
    let (nx, ny, nz) = (x as i32 + dx, y as i32 + dy, z as i32 + dz);
    let c = coord.offset(nx.div_euclid(n), ny.div_euclid(n), nz.div_euclid(n));
    (
        c,
        nx.rem_euclid(n) as usize,
        ny.rem_euclid(n) as usize,
        nz.rem_euclid(n) as usize,
    )
}

/// Terrain for `coord` as a chunk block array.
pub fn generate_blocks(generator: &TerrainGen, coord: ChunkCoord) -> Box<[Block]> {
    let mut blocks = vec![Block::Air; CHUNK_VOLUME].into_boxed_slice();
    generator.fill_chunk(coord, &mut blocks);
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn nibbles_are_independent() {
        let mut c = Chunk::new(ChunkCoord::new(0, 0, 0), 1);
        c.set_light(LightChannel::Sky, 1, 2, 3, 15);
        c.set_light(LightChannel::Torch, 1, 2, 3, 7);
        assert_eq!(c.light(LightChannel::Sky, 1, 2, 3), 15);
        assert_eq!(c.light(LightChannel::Torch, 1, 2, 3), 7);
        c.set_light(LightChannel::Sky, 1, 2, 3, 0);
        assert_eq!(c.light(LightChannel::Torch, 1, 2, 3), 7);
        assert_eq!(c.light_bytes()[local_index(1, 2, 3)], 0x07);
    }

    #[test]
    fn neighbor_cell_crosses_boundaries() {
        let c = ChunkCoord::new(0, 0, 0);
        assert_eq!(neighbor_cell(c, 15, 4, 4, Face::PosX), (ChunkCoord::new(1, 0, 0), 0, 4, 4));
        assert_eq!(neighbor_cell(c, 0, 4, 4, Face::NegX), (ChunkCoord::new(-1, 0, 0), 15, 4, 4));
        assert_eq!(neighbor_cell(c, 3, 0, 4, Face::NegY), (ChunkCoord::new(0, -1, 0), 3, 15, 4));
        assert_eq!(neighbor_cell(c, 3, 7, 4, Face::PosY), (c, 3, 8, 4));
    }

    #[test]
    fn rng_stream_is_per_chunk() {
        let mut a = Chunk::new(ChunkCoord::new(3, 0, 1), 99);
        let mut b = Chunk::new(ChunkCoord::new(3, 0, 1), 99);
        let mut c = Chunk::new(ChunkCoord::new(3, 0, 2), 99);
        let (va, vb, vc): (u64, u64, u64) = (a.rng_mut().random(), b.rng_mut().random(), c.rng_mut().random());
        assert_eq!(va, vb);
        assert_ne!(va, vc);
    }

    #[test]
    fn queues_are_separate() {
        let mut c = Chunk::new(ChunkCoord::new(0, 0, 0), 1);
        c.queue_mut(LightChannel::Sky, LightPass::Insert)
            .push(LightQueueItem::new(0, 0, 0, 15));
        assert!(c.queue(LightChannel::Torch, LightPass::Insert).is_empty());
        assert!(c.queue(LightChannel::Sky, LightPass::Delete).is_empty());
        assert!(c.has_pending_light());
        c.clear_light();
        assert!(!c.has_pending_light());
    }
}
