//! Face-counting stub mesher. Counts the faces a real mesher would emit so
//! the driver can exercise taint tracking and mesh hand-off.

use strata_chunk::{LightChannel, neighbor_cell};
use strata_geom::Face;
use strata_runtime::World;
use strata_world::{CHUNK_SIZE, ChunkCoord};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MeshStats {
    pub faces: usize,
    /// Faces whose outside cell has no light on either channel.
    pub dark_faces: usize,
}

/// Counts visible faces of a fully loaded chunk. A face is visible when the
/// cell in front of it is transparent; cells in chunks that are not fully
/// loaded count as opaque.
pub fn count_faces(world: &World, coord: ChunkCoord) -> Option<MeshStats> {
    let chunk = world.chunk(coord)?;
    let mut stats = MeshStats::default();
    for y in 0..CHUNK_SIZE {
        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                if chunk.block(x, y, z).is_air() {
                    continue;
                }
                for face in Face::ALL {
                    let (nc, nx, ny, nz) = neighbor_cell(coord, x, y, z, face);
                    let outside = if nc == coord { Some(chunk) } else { world.chunk(nc) };
                    let Some(n) = outside else {
                        continue;
                    };
                    if n.block(nx, ny, nz).is_opaque() {
                        continue;
                    }
                    stats.faces += 1;
                    let lit = LightChannel::ALL.iter().any(|c| n.light(*c, nx, ny, nz) > 0);
                    if !lit {
                        stats.dark_faces += 1;
                    }
                }
            }
        }
    }
    Some(stats)
}
