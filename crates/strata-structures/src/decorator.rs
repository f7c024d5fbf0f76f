use rand::Rng;
use strata_blocks::Block;
use strata_cluster::{ChunkHandle, ChunkSource, ChunkStore, LoadLevel};
use strata_geom::BlockPos;
use strata_world::{CHUNK_SIZE, CHUNK_SIZE_I32, ChunkCoord};

use crate::{StructureCatalog, StructureTemplate};

const WINDOW: usize = 27;

/// Cursor for stamping one structure around an origin chunk. Neighbor chunks
/// are resolved lazily on first touch, generated if needed and recorded as
/// decoration children of the origin.
pub struct Decorator<'a> {
    store: &'a mut ChunkStore,
    source: &'a dyn ChunkSource,
    origin: ChunkHandle,
    center: ChunkCoord,
    window: [Option<ChunkHandle>; WINDOW],
    anchor: BlockPos,
}

impl<'a> Decorator<'a> {
    pub fn new(store: &'a mut ChunkStore, source: &'a dyn ChunkSource, origin: ChunkHandle) -> Option<Self> {
        let center = store.chunk(origin)?.coord;
        let mut window = [None; WINDOW];
        window[WINDOW / 2] = Some(origin);
        Some(Self {
            store,
            source,
            origin,
            center,
            window,
            anchor: center.origin(),
        })
    }

    #[inline]
    pub fn anchor(&self) -> BlockPos {
        self.anchor
    }

    pub fn set_anchor(&mut self, anchor: BlockPos) {
        self.anchor = anchor;
    }

    /// Chunks resolved so far, origin included.
    pub fn touched(&self) -> usize {
        self.window.iter().filter(|s| s.is_some()).count()
    }

    /// Window slot of the chunk holding `p`, or `None` outside the 3x3x3 window.
    fn slot_of(&self, p: BlockPos) -> Option<(usize, ChunkCoord)> {
        let o = self.center.origin();
        let cx = (p.x - o.x).div_euclid(CHUNK_SIZE_I32) + 1;
        let cy = (p.y - o.y).div_euclid(CHUNK_SIZE_I32) + 1;
        let cz = (p.z - o.z).div_euclid(CHUNK_SIZE_I32) + 1;
        if !(0..3).contains(&cx) || !(0..3).contains(&cy) || !(0..3).contains(&cz) {
            return None;
        }
        let i = ((cy * 3 + cz) * 3 + cx) as usize;
        Some((i, self.center.offset(cx - 1, cy - 1, cz - 1)))
    }

    fn resolve(&mut self, p: BlockPos) -> Option<ChunkHandle> {
        let (i, coord) = self.slot_of(p)?;
        if let Some(h) = self.window[i].filter(|h| self.store.contains(*h)) {
            return Some(h);
        }
        let h = self.store.get_or_create(coord, true)?;
        self.store.populate(h, self.source);
        if self.store.adopt(self.origin, h) {
            log::trace!("chunk {coord} now depends on {}", self.center);
        }
        self.window[i] = Some(h);
        Some(h)
    }

    /// Block at `offset` from the anchor.
    pub fn get(&mut self, offset: [i32; 3]) -> Option<Block> {
        let p = self.at(offset);
        let h = self.resolve(p)?;
        let (_, (x, y, z)) = ChunkCoord::split(p);
        self.store
            .value(h)
            .filter(|v| v.load_level() >= LoadLevel::Partial)
            .map(|v| v.chunk.block(x, y, z))
    }

    /// Writes `b` at `offset` from the anchor.
    pub fn set(&mut self, offset: [i32; 3], b: Block) -> bool {
        let p = self.at(offset);
        if self.resolve(p).is_none() {
            return false;
        }
        strata_edit::write_block(self.store, p, b).is_some()
    }

    #[inline]
    fn at(&self, offset: [i32; 3]) -> BlockPos {
        BlockPos::new(
            self.anchor.x + offset[0],
            self.anchor.y + offset[1],
            self.anchor.z + offset[2],
        )
    }

    /// True when every target cell is air, or already holds the template's
    /// own block where overlap is allowed.
    pub fn fits(&mut self, template: &StructureTemplate) -> bool {
        template.blocks.iter().all(|tb| match self.get(tb.offset) {
            Some(b) => b.is_air() || (tb.allow_overlap && b == tb.block),
            None => false,
        })
    }

    /// Writes each template block that wins its own probability roll.
    /// Returns the number written.
    pub fn stamp<R: Rng>(&mut self, template: &StructureTemplate, rng: &mut R) -> usize {
        let mut written = 0;
        for tb in &template.blocks {
            if rng.random::<f32>() < tb.probability && self.set(tb.offset, tb.block) {
                written += 1;
            }
        }
        written
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DecorationStats {
    /// Columns whose roll selected a structure.
    pub attempts: usize,
    pub placed: usize,
    pub blocks: usize,
}

/// Topmost `base` block in a column of the origin chunk.
fn topmost(store: &ChunkStore, h: ChunkHandle, x: usize, z: usize, base: Block) -> Option<usize> {
    let chunk = store.chunk(h)?;
    (0..CHUNK_SIZE).rev().find(|y| chunk.block(x, *y, z) == base)
}

/// Stamps the structures of the chunk's biome and promotes it to
/// [`LoadLevel::Total`]. Does nothing unless the chunk is at
/// [`LoadLevel::Partial`].
pub fn decorate_chunk(
    store: &mut ChunkStore,
    source: &dyn ChunkSource,
    catalog: &StructureCatalog,
    origin: ChunkHandle,
) -> Option<DecorationStats> {
    if store.level(origin)? != LoadLevel::Partial {
        return None;
    }
    let (coord, mut rng) = {
        let chunk = store.chunk(origin)?;
        (chunk.coord, chunk.rng().clone())
    };
    let o = coord.origin();
    let half = CHUNK_SIZE_I32 / 2;
    let biome = source.biome_at(o.x + half, o.z + half);
    let templates: Vec<&StructureTemplate> = catalog.for_biome(biome).collect();
    let mut stats = DecorationStats::default();

    if !templates.is_empty() {
        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                for t in &templates {
                    if rng.random::<f32>() >= t.chance {
                        continue;
                    }
                    let Some(y) = topmost(store, origin, x, z, t.base) else {
                        continue;
                    };
                    stats.attempts += 1;
                    let Some(mut d) = Decorator::new(store, source, origin) else {
                        return None;
                    };
                    d.set_anchor(coord.world_pos(x, y, z));
                    if d.fits(t) {
                        stats.blocks += d.stamp(t, &mut rng);
                        stats.placed += 1;
                        log::debug!(target: "events", "{} placed at {:?} in {}", t.name, d.anchor(), coord);
                    }
                }
            }
        }
    }

    if let Some(chunk) = store.chunk_mut(origin) {
        chunk.set_rng(rng);
    }
    store.raise_level(origin, LoadLevel::Total);
    Some(stats)
}
