//! Block placement and removal with light and remesh bookkeeping.
#![forbid(unsafe_code)]

use strata_blocks::Block;
use strata_cluster::{ChunkHandle, ChunkStore, LoadLevel};
use strata_geom::BlockPos;
use strata_world::{CHUNK_SIZE, ChunkCoord};

/// Chunks whose meshes depend on the cell at `p`: its own chunk plus each
/// face neighbor the cell touches.
pub fn affected_chunks(p: BlockPos) -> Vec<ChunkCoord> {
    let (c, (lx, ly, lz)) = ChunkCoord::split(p);
    let last = CHUNK_SIZE - 1;
    let mut affected = vec![c];
    for (l, neg, pos) in [
        (lx, c.offset(-1, 0, 0), c.offset(1, 0, 0)),
        (ly, c.offset(0, -1, 0), c.offset(0, 1, 0)),
        (lz, c.offset(0, 0, -1), c.offset(0, 0, 1)),
    ] {
        if l == 0 {
            affected.push(neg);
        }
        if l == last {
            affected.push(pos);
        }
    }
    affected
}

/// Marks every loaded chunk affected by an edit at `p` for remeshing.
pub fn taint_around(store: &mut ChunkStore, p: BlockPos) {
    for c in affected_chunks(p) {
        if let Some(chunk) = store.lookup(c).and_then(|h| store.chunk_mut(h)) {
            chunk.mark_tainted();
        }
    }
}

/// Resolves `p` to a fully loaded chunk. Edits never touch chunks that are
/// still generating.
fn editable(store: &ChunkStore, p: BlockPos) -> Option<(ChunkHandle, (usize, usize, usize))> {
    let (h, local) = store.locate(p)?;
    (store.level(h) == Some(LoadLevel::Total)).then_some((h, local))
}

/// Writes a block into a chunk that has terrain, updating light queues when
/// the chunk is lightable and tainting affected meshes. Returns the previous
/// block, or `None` if the chunk is missing or has no terrain yet.
pub fn write_block(store: &mut ChunkStore, p: BlockPos, b: Block) -> Option<Block> {
    let (h, (x, y, z)) = store.locate(p)?;
    let level = store.level(h)?;
    if level < LoadLevel::Partial {
        return None;
    }
    let old = store.chunk_mut(h)?.set_block(x, y, z, b);
    if old != b {
        if level == LoadLevel::Total {
            strata_lighting::apply_block_change(store, h, x, y, z, old, b);
        }
        taint_around(store, p);
    }
    Some(old)
}

/// Places `b` into an empty cell of a fully loaded chunk. Fails when the
/// cell is occupied, the chunk is not loaded, or `b` is air.
pub fn place_block(store: &mut ChunkStore, p: BlockPos, b: Block) -> bool {
    if b.is_air() {
        return false;
    }
    let Some((h, (x, y, z))) = editable(store, p) else {
        return false;
    };
    if store.chunk(h).is_none_or(|c| !c.block(x, y, z).is_air()) {
        return false;
    }
    if write_block(store, p, b).is_none() {
        return false;
    }
    if let Some(c) = store.chunk_mut(h) {
        c.mark_modified();
    }
    true
}

/// Clears a non-air cell of a fully loaded chunk, returning what was there.
pub fn remove_block(store: &mut ChunkStore, p: BlockPos) -> Option<Block> {
    let (h, (x, y, z)) = editable(store, p)?;
    let current = store.chunk(h)?.block(x, y, z);
    if current.is_air() {
        return None;
    }
    let old = write_block(store, p, Block::Air)?;
    if let Some(c) = store.chunk_mut(h) {
        c.mark_modified();
    }
    Some(old)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertical_seam_edits_include_neighbors() {
        let c = ChunkCoord::new(4, 7, -2);
        let o = c.origin();

        // Edit on the top face -> chunk and +Y neighbor only.
        let mut top = affected_chunks(BlockPos::new(o.x + 5, o.y + 15, o.z + 11));
        top.sort();
        assert_eq!(top, vec![c, c.offset(0, 1, 0)]);

        // Edit on the bottom face -> chunk and -Y neighbor only.
        let mut bottom = affected_chunks(BlockPos::new(o.x + 9, o.y, o.z + 3));
        bottom.sort();
        assert_eq!(bottom, vec![c.offset(0, -1, 0), c]);
    }

    #[test]
    fn corner_edit_touches_three_faces() {
        let c = ChunkCoord::new(0, 0, 0);
        let mut a = affected_chunks(BlockPos::new(0, 15, 0));
        a.sort();
        let mut expected = vec![c, c.offset(-1, 0, 0), c.offset(0, 1, 0), c.offset(0, 0, -1)];
        expected.sort();
        assert_eq!(a, expected);
    }

    #[test]
    fn interior_edit_touches_only_own_chunk() {
        assert_eq!(affected_chunks(BlockPos::new(-8, 40, 3)), vec![ChunkCoord::new(-1, 2, 0)]);
    }
}
