//! Dual-channel (sky + torch) flood-fill lighting across chunk boundaries.
//!
//! Light values live only in fully loaded chunks. Work items aimed at a chunk
//! that is not yet lightable are parked in that chunk's insertion queue and
//! replayed when it is seeded.
#![forbid(unsafe_code)]

use strata_blocks::{Block, MAX_LIGHT};
use strata_chunk::{LightChannel, LightPass, LightQueueItem, neighbor_cell};
use strata_cluster::{ChunkHandle, ChunkSource, ChunkStore};
use strata_geom::Face;
use strata_world::{CHUNK_SIZE, ChunkCoord};

const TOP: usize = CHUNK_SIZE - 1;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LightStats {
    /// Deletion items processed.
    pub deleted: usize,
    /// Insertion items processed.
    pub inserted: usize,
    /// Sweeps over pending chunks across both phases.
    pub rounds: usize,
}

/// Value carried into the next cell when light of `v` travels in `dir`.
#[inline]
fn carried(channel: LightChannel, dir: Face, v: u8) -> u8 {
    if channel == LightChannel::Sky && dir == Face::NegY && v == MAX_LIGHT {
        MAX_LIGHT
    } else {
        v.saturating_sub(1)
    }
}

/// Cell on side `side` of a chunk, addressed by two in-plane coordinates.
#[inline]
fn boundary_cell(side: Face, a: usize, b: usize) -> (usize, usize, usize) {
    match side {
        Face::PosX => (TOP, a, b),
        Face::NegX => (0, a, b),
        Face::PosY => (a, TOP, b),
        Face::NegY => (a, 0, b),
        Face::PosZ => (a, b, TOP),
        Face::NegZ => (a, b, 0),
    }
}

#[inline]
fn coord_of(store: &ChunkStore, h: ChunkHandle) -> Option<ChunkCoord> {
    store.chunk(h).map(|c| c.coord)
}

#[inline]
fn is_total(store: &ChunkStore, h: ChunkHandle) -> bool {
    store.value(h).is_some_and(|v| v.is_total())
}

/// Fully loaded chunk at `nc`, short-circuiting when it is the current chunk.
#[inline]
fn resolve_total(store: &ChunkStore, h: ChunkHandle, coord: ChunkCoord, nc: ChunkCoord) -> Option<ChunkHandle> {
    if nc == coord {
        Some(h)
    } else {
        store.fully_loaded_handle(nc)
    }
}

/// Whether cell (x, 15, z) receives light straight from the open sky.
fn is_sky_source(store: &ChunkStore, h: ChunkHandle, x: usize, y: usize, z: usize) -> bool {
    if y != TOP {
        return false;
    }
    let Some(chunk) = store.chunk(h) else {
        return false;
    };
    chunk.sky_column(x, z) && store.fully_loaded_handle(chunk.coord.offset(0, 1, 0)).is_none()
}

/// Raises a cell to `v` and queues it for spreading. On a chunk that is not
/// lightable yet the item is parked instead. Returns true if light changed.
pub fn offer_insert(
    store: &mut ChunkStore,
    h: ChunkHandle,
    x: usize,
    y: usize,
    z: usize,
    channel: LightChannel,
    v: u8,
) -> bool {
    if v == 0 {
        return false;
    }
    let Some(cv) = store.value_mut(h) else {
        return false;
    };
    let item = LightQueueItem::new(x, y, z, v);
    if !cv.is_total() {
        cv.chunk.queue_mut(channel, LightPass::Insert).push(item);
        return false;
    }
    let chunk = &mut cv.chunk;
    if chunk.block(x, y, z).is_opaque() || chunk.light(channel, x, y, z) >= v {
        return false;
    }
    chunk.set_light(channel, x, y, z, v);
    chunk.queue_mut(channel, LightPass::Insert).push(item);
    chunk.mark_tainted();
    true
}

/// Zeroes a lit cell and queues a deletion carrying its former value.
pub fn enqueue_removal(
    store: &mut ChunkStore,
    h: ChunkHandle,
    x: usize,
    y: usize,
    z: usize,
    channel: LightChannel,
) -> bool {
    let Some(cv) = store.value_mut(h).filter(|v| v.is_total()) else {
        return false;
    };
    let chunk = &mut cv.chunk;
    let old = chunk.light(channel, x, y, z);
    if old == 0 {
        return false;
    }
    chunk.set_light(channel, x, y, z, 0);
    chunk
        .queue_mut(channel, LightPass::Delete)
        .push(LightQueueItem::new(x, y, z, old));
    chunk.mark_tainted();
    true
}

/// Queues an already-lit cell to spread its current value again.
fn push_reinsert(store: &mut ChunkStore, h: ChunkHandle, x: usize, y: usize, z: usize, channel: LightChannel, v: u8) {
    if let Some(chunk) = store.chunk_mut(h) {
        chunk
            .queue_mut(channel, LightPass::Insert)
            .push(LightQueueItem::new(x, y, z, v));
    }
}

fn drain_deletions(store: &mut ChunkStore, h: ChunkHandle, channel: LightChannel) -> usize {
    let Some(coord) = coord_of(store, h) else {
        return 0;
    };
    let mut processed = 0;
    while let Some(item) = store
        .chunk_mut(h)
        .and_then(|c| c.queue_mut(channel, LightPass::Delete).pop())
    {
        processed += 1;
        let (x, y, z) = item.pos();
        for face in Face::ALL {
            let (nc, nx, ny, nz) = neighbor_cell(coord, x, y, z, face);
            let Some(nh) = resolve_total(store, h, coord, nc) else {
                continue;
            };
            let Some(n) = store.chunk(nh) else {
                continue;
            };
            let nl = n.light(channel, nx, ny, nz);
            if nl == 0 || n.block(nx, ny, nz).is_opaque() {
                continue;
            }
            let fed_by_column = carried(channel, face, item.value) == MAX_LIGHT && nl == MAX_LIGHT;
            if nl < item.value || fed_by_column {
                enqueue_removal(store, nh, nx, ny, nz, channel);
            } else {
                push_reinsert(store, nh, nx, ny, nz, channel, nl);
            }
        }
    }
    processed
}

fn drain_insertions(store: &mut ChunkStore, h: ChunkHandle, channel: LightChannel) -> usize {
    let Some(coord) = coord_of(store, h) else {
        return 0;
    };
    let mut processed = 0;
    while let Some(item) = store
        .chunk_mut(h)
        .and_then(|c| c.queue_mut(channel, LightPass::Insert).pop())
    {
        processed += 1;
        let (x, y, z) = item.pos();
        let stale = store
            .chunk(h)
            .is_none_or(|c| c.light(channel, x, y, z) != item.value || c.block(x, y, z).is_opaque());
        if stale {
            continue;
        }
        for face in Face::ALL {
            let nv = carried(channel, face, item.value);
            if nv == 0 {
                continue;
            }
            let (nc, nx, ny, nz) = neighbor_cell(coord, x, y, z, face);
            let nh = if nc == coord {
                Some(h)
            } else {
                store.get_or_create(nc, true)
            };
            if let Some(nh) = nh {
                offer_insert(store, nh, nx, ny, nz, channel, nv);
            }
        }
    }
    processed
}

fn pending(store: &ChunkStore, pass: LightPass) -> Vec<ChunkHandle> {
    store
        .iter()
        .filter(|(_, v)| {
            v.is_total()
                && LightChannel::ALL
                    .iter()
                    .any(|c| !v.chunk.queue(*c, pass).is_empty())
        })
        .map(|(h, _)| h)
        .collect()
}

/// Drains every deletion queue of every fully loaded chunk to a fixed point,
/// then every insertion queue.
pub fn propagate(store: &mut ChunkStore) -> LightStats {
    let mut stats = LightStats::default();
    for pass in [LightPass::Delete, LightPass::Insert] {
        loop {
            let work = pending(store, pass);
            if work.is_empty() {
                break;
            }
            stats.rounds += 1;
            for h in work {
                for channel in LightChannel::ALL {
                    match pass {
                        LightPass::Delete => stats.deleted += drain_deletions(store, h, channel),
                        LightPass::Insert => stats.inserted += drain_insertions(store, h, channel),
                    }
                }
            }
        }
    }
    if stats.deleted + stats.inserted > 0 {
        log::trace!(
            "light settled: {} deletions, {} insertions, {} rounds",
            stats.deleted,
            stats.inserted,
            stats.rounds
        );
    }
    stats
}

/// Brightest value the lit neighbors of a cell can supply to it.
fn neighbor_support(store: &ChunkStore, h: ChunkHandle, x: usize, y: usize, z: usize, channel: LightChannel) -> u8 {
    let Some(coord) = coord_of(store, h) else {
        return 0;
    };
    let mut best = 0;
    for face in Face::ALL {
        let (nc, nx, ny, nz) = neighbor_cell(coord, x, y, z, face);
        let Some(n) = resolve_total(store, h, coord, nc).and_then(|nh| store.chunk(nh)) else {
            continue;
        };
        best = best.max(carried(channel, face.opposite(), n.light(channel, nx, ny, nz)));
    }
    best
}

/// Initial lighting for a chunk that just became fully loaded: open-sky
/// columns, emitters, parked items and light flowing in from lit neighbors.
pub fn seed_chunk(store: &mut ChunkStore, h: ChunkHandle, source: &dyn ChunkSource) {
    let Some(coord) = coord_of(store, h) else {
        return;
    };
    if !is_total(store, h) {
        return;
    }
    let origin = coord.origin();

    // The chunk below stops treating its top layer as open sky.
    if let Some(below) = store
        .fully_loaded_handle(coord.offset(0, -1, 0))
        .filter(|b| store.value(*b).is_some_and(|v| v.lit))
    {
        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                let was_open = store.chunk(below).is_some_and(|c| c.sky_column(x, z));
                if was_open {
                    if let Some(c) = store.chunk_mut(below) {
                        c.set_sky_column(x, z, false);
                    }
                    enqueue_removal(store, below, x, TOP, z, LightChannel::Sky);
                }
            }
        }
    }

    if store.fully_loaded_handle(coord.offset(0, 1, 0)).is_none() {
        let top_y = origin.y + TOP as i32;
        for z in 0..CHUNK_SIZE {
            for x in 0..CHUNK_SIZE {
                let open = top_y >= source.surface_height(origin.x + x as i32, origin.z + z as i32);
                if let Some(c) = store.chunk_mut(h) {
                    c.set_sky_column(x, z, open);
                }
                if open {
                    offer_insert(store, h, x, TOP, z, LightChannel::Sky, MAX_LIGHT);
                }
            }
        }
    }

    let emitters: Vec<(usize, usize, usize, u8)> = store
        .chunk(h)
        .map(|c| {
            c.blocks()
                .iter()
                .enumerate()
                .filter(|(_, b)| b.is_emitter())
                .map(|(i, b)| {
                    let (x, y, z) = strata_world::local_coords(i);
                    (x, y, z, b.emission())
                })
                .collect()
        })
        .unwrap_or_default();
    for (x, y, z, e) in emitters {
        offer_insert(store, h, x, y, z, LightChannel::Torch, e);
    }

    // Parked items may predate later deletions; trust only what the
    // neighbors still support.
    for channel in LightChannel::ALL {
        let parked = store
            .chunk_mut(h)
            .map(|c| {
                c.queue_mut(channel, LightPass::Delete).clear();
                c.queue_mut(channel, LightPass::Insert).take_all()
            })
            .unwrap_or_default();
        for item in parked {
            let (x, y, z) = item.pos();
            let v = item.value.min(neighbor_support(store, h, x, y, z, channel));
            offer_insert(store, h, x, y, z, channel, v);
        }
    }

    for face in Face::ALL {
        let (dx, dy, dz) = face.delta();
        let Some(nh) = store.fully_loaded_handle(coord.offset(dx, dy, dz)) else {
            continue;
        };
        let side = face.opposite();
        for a in 0..CHUNK_SIZE {
            for b in 0..CHUNK_SIZE {
                let (x, y, z) = boundary_cell(side, a, b);
                for channel in LightChannel::ALL {
                    let lit = store
                        .chunk(nh)
                        .map(|c| c.light(channel, x, y, z))
                        .unwrap_or(0);
                    if lit > 0 {
                        push_reinsert(store, nh, x, y, z, channel, lit);
                    }
                }
            }
        }
    }

    if let Some(v) = store.value_mut(h) {
        v.lit = true;
        v.chunk.mark_tainted();
    }
}

/// Re-derives light along the faces of lit neighbors of a chunk that has
/// just been freed, so light that flowed out of it does not linger.
pub fn forget_chunk(store: &mut ChunkStore, coord: ChunkCoord, source: &dyn ChunkSource) {
    for face in Face::ALL {
        let (dx, dy, dz) = face.delta();
        let nc = coord.offset(dx, dy, dz);
        let Some(nh) = store
            .fully_loaded_handle(nc)
            .filter(|n| store.value(*n).is_some_and(|v| v.lit))
        else {
            continue;
        };
        let side = face.opposite();
        for a in 0..CHUNK_SIZE {
            for b in 0..CHUNK_SIZE {
                let (x, y, z) = boundary_cell(side, a, b);
                for channel in LightChannel::ALL {
                    enqueue_removal(store, nh, x, y, z, channel);
                }
            }
        }
        if face == Face::NegY {
            // The freed chunk was the roof; the top layer below may see sky again.
            let origin = nc.origin();
            let top_y = origin.y + TOP as i32;
            for z in 0..CHUNK_SIZE {
                for x in 0..CHUNK_SIZE {
                    let open = top_y >= source.surface_height(origin.x + x as i32, origin.z + z as i32);
                    if let Some(c) = store.chunk_mut(nh) {
                        c.set_sky_column(x, z, open);
                    }
                }
            }
        }
        for a in 0..CHUNK_SIZE {
            for b in 0..CHUNK_SIZE {
                let (x, y, z) = boundary_cell(side, a, b);
                let block = store.chunk(nh).map(|c| c.block(x, y, z)).unwrap_or(Block::Air);
                if block.is_emitter() {
                    offer_insert(store, nh, x, y, z, LightChannel::Torch, block.emission());
                }
                if is_sky_source(store, nh, x, y, z) {
                    offer_insert(store, nh, x, y, z, LightChannel::Sky, MAX_LIGHT);
                }
            }
        }
    }
}

/// Light bookkeeping for a block change already written to a fully loaded chunk.
pub fn apply_block_change(
    store: &mut ChunkStore,
    h: ChunkHandle,
    x: usize,
    y: usize,
    z: usize,
    old: Block,
    new: Block,
) {
    if old == new || !is_total(store, h) {
        return;
    }
    let Some(coord) = coord_of(store, h) else {
        return;
    };
    if old.is_emitter() {
        enqueue_removal(store, h, x, y, z, LightChannel::Torch);
    }
    if new.is_opaque() {
        for channel in LightChannel::ALL {
            enqueue_removal(store, h, x, y, z, channel);
        }
    }
    if new.is_emitter() {
        offer_insert(store, h, x, y, z, LightChannel::Torch, new.emission());
    }
    if old.is_opaque() && new.is_transparent() {
        for face in Face::ALL {
            let (nc, nx, ny, nz) = neighbor_cell(coord, x, y, z, face);
            let Some(nh) = resolve_total(store, h, coord, nc) else {
                continue;
            };
            for channel in LightChannel::ALL {
                let nl = store
                    .chunk(nh)
                    .filter(|c| c.block(nx, ny, nz).is_transparent())
                    .map(|c| c.light(channel, nx, ny, nz))
                    .unwrap_or(0);
                if nl > 0 {
                    push_reinsert(store, nh, nx, ny, nz, channel, nl);
                }
            }
        }
        if is_sky_source(store, h, x, y, z) {
            offer_insert(store, h, x, y, z, LightChannel::Sky, MAX_LIGHT);
        }
    }
    if let Some(c) = store.chunk_mut(h) {
        c.mark_tainted();
    }
}
