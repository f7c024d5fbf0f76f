//! Clustered chunk table: coordinate addressing, load levels and the
//! mark-and-sweep retention protocol.
#![forbid(unsafe_code)]

pub mod arena;
pub mod value;

pub use arena::{ChunkArena, ChunkHandle};
pub use value::{ChunkValue, LoadLevel, MAX_CHILDREN, ReloadState};

use hashbrown::HashMap;
use strata_blocks::Block;
use strata_chunk::Chunk;
use strata_geom::BlockPos;
use strata_world::{Biome, CLUSTER_SLOTS, ChunkCoord, ClusterKey, TerrainGen};

/// Output of generating (or restoring) a chunk's blocks.
pub struct Populated {
    pub blocks: Box<[Block]>,
    /// Blocks came from a save rather than the generator; the chunk is
    /// already decorated.
    pub restored: bool,
}

/// Where chunk contents come from. Shared across generation workers.
pub trait ChunkSource: Sync {
    fn populate(&self, coord: ChunkCoord) -> Populated;
    fn surface_height(&self, x: i32, z: i32) -> i32;
    fn biome_at(&self, x: i32, z: i32) -> Biome;
}

impl ChunkSource for TerrainGen {
    fn populate(&self, coord: ChunkCoord) -> Populated {
        Populated {
            blocks: strata_chunk::generate_blocks(self, coord),
            restored: false,
        }
    }

    fn surface_height(&self, x: i32, z: i32) -> i32 {
        TerrainGen::surface_height(self, x, z)
    }

    fn biome_at(&self, x: i32, z: i32) -> Biome {
        TerrainGen::biome_at(self, x, z)
    }
}

/// 8x8x8 block of chunk slots plus the count of occupied slots.
pub struct Cluster {
    slots: Box<[Option<ChunkHandle>]>,
    live: usize,
}

impl Cluster {
    fn new() -> Self {
        Self {
            slots: vec![None; CLUSTER_SLOTS].into_boxed_slice(),
            live: 0,
        }
    }

    #[inline]
    pub fn live(&self) -> usize {
        self.live
    }

    #[inline]
    pub fn slot(&self, i: usize) -> Option<ChunkHandle> {
        self.slots[i]
    }
}

pub struct ChunkStore {
    seed: i32,
    clusters: HashMap<ClusterKey, Cluster>,
    arena: ChunkArena,
}

impl ChunkStore {
    pub fn new(seed: i32) -> Self {
        Self {
            seed,
            clusters: HashMap::new(),
            arena: ChunkArena::new(),
        }
    }

    #[inline]
    pub fn seed(&self) -> i32 {
        self.seed
    }

    /// Number of live chunks.
    #[inline]
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    #[inline]
    pub fn cluster_count(&self) -> usize {
        self.clusters.len()
    }

    #[inline]
    pub fn cluster(&self, key: ClusterKey) -> Option<&Cluster> {
        self.clusters.get(&key)
    }

    /// Resolves a chunk coordinate to its slot. With `create` an empty
    /// chunk at [`LoadLevel::None`] is allocated when the slot is vacant.
    pub fn get_or_create(&mut self, coord: ChunkCoord, create: bool) -> Option<ChunkHandle> {
        let key = coord.cluster_key();
        let slot = coord.slot_index();
        if let Some(h) = self.clusters.get(&key).and_then(|c| c.slots[slot]) {
            return Some(h);
        }
        if !create {
            return None;
        }
        let h = self.arena.insert(ChunkValue::new(Chunk::new(coord, self.seed)));
        let cluster = self.clusters.entry(key).or_insert_with(|| {
            log::debug!("cluster ({}, {}, {}) created", key.x, key.y, key.z);
            Cluster::new()
        });
        cluster.slots[slot] = Some(h);
        cluster.live += 1;
        Some(h)
    }

    #[inline]
    pub fn lookup(&self, coord: ChunkCoord) -> Option<ChunkHandle> {
        self.clusters
            .get(&coord.cluster_key())
            .and_then(|c| c.slots[coord.slot_index()])
    }

    /// Handle of the chunk at `coord` only if it is decorated and lightable.
    pub fn fully_loaded_handle(&self, coord: ChunkCoord) -> Option<ChunkHandle> {
        self.lookup(coord)
            .filter(|h| self.arena.get(*h).is_some_and(|v| v.is_total()))
    }

    pub fn fully_loaded(&self, coord: ChunkCoord) -> Option<&Chunk> {
        self.fully_loaded_handle(coord)
            .and_then(|h| self.arena.get(h))
            .map(|v| &v.chunk)
    }

    #[inline]
    pub fn contains(&self, h: ChunkHandle) -> bool {
        self.arena.contains(h)
    }

    #[inline]
    pub fn value(&self, h: ChunkHandle) -> Option<&ChunkValue> {
        self.arena.get(h)
    }

    #[inline]
    pub fn value_mut(&mut self, h: ChunkHandle) -> Option<&mut ChunkValue> {
        self.arena.get_mut(h)
    }

    #[inline]
    pub fn chunk(&self, h: ChunkHandle) -> Option<&Chunk> {
        self.arena.get(h).map(|v| &v.chunk)
    }

    #[inline]
    pub fn chunk_mut(&mut self, h: ChunkHandle) -> Option<&mut Chunk> {
        self.arena.get_mut(h).map(|v| &mut v.chunk)
    }

    #[inline]
    pub fn level(&self, h: ChunkHandle) -> Option<LoadLevel> {
        self.arena.get(h).map(|v| v.load_level())
    }

    /// Raises a chunk's load level. Panics on a stale handle or a downward move.
    pub fn raise_level(&mut self, h: ChunkHandle, level: LoadLevel) {
        match self.arena.get_mut(h) {
            Some(v) => v.raise_level(level),
            None => panic!("raise_level on stale chunk handle {h:?}"),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ChunkHandle, &ChunkValue)> + '_ {
        self.arena.iter()
    }

    /// Live handles at exactly `level`, ordered by coordinate.
    pub fn handles_at(&self, level: LoadLevel) -> Vec<ChunkHandle> {
        let mut v: Vec<(ChunkCoord, ChunkHandle)> = self
            .arena
            .iter()
            .filter(|(_, cv)| cv.load_level() == level)
            .map(|(h, cv)| (cv.chunk.coord, h))
            .collect();
        v.sort_unstable();
        v.into_iter().map(|(_, h)| h).collect()
    }

    /// Installs generated or restored blocks into a chunk at [`LoadLevel::None`].
    /// Restored chunks skip decoration and become [`LoadLevel::Total`].
    pub fn apply_populated(&mut self, h: ChunkHandle, populated: Populated) {
        let Some(v) = self.arena.get_mut(h) else {
            panic!("apply_populated on stale chunk handle {h:?}");
        };
        assert_eq!(
            v.load_level(),
            LoadLevel::None,
            "chunk {} populated twice",
            v.chunk.coord
        );
        v.chunk.replace_blocks(populated.blocks);
        v.lit = false;
        if populated.restored {
            v.raise_level(LoadLevel::Total);
        } else {
            v.raise_level(LoadLevel::Partial);
        }
    }

    /// Generates a chunk in place if it has no terrain yet.
    pub fn populate(&mut self, h: ChunkHandle, source: &dyn ChunkSource) {
        let Some(coord) = self
            .arena
            .get(h)
            .filter(|v| v.load_level() == LoadLevel::None)
            .map(|v| v.chunk.coord)
        else {
            return;
        };
        let populated = source.populate(coord);
        self.apply_populated(h, populated);
    }

    /// Whether `ancestor` is on the parent chain of `h`.
    fn descends_from(&self, h: ChunkHandle, ancestor: ChunkHandle) -> bool {
        let mut cur = self.arena.get(h).and_then(|v| v.parent());
        let mut hops = 0;
        while let Some(p) = cur {
            if p == ancestor {
                return true;
            }
            hops += 1;
            assert!(hops <= self.arena.len(), "decoration parent chain of {h:?} loops");
            cur = self.arena.get(p).and_then(|v| v.parent());
        }
        false
    }

    /// Makes `child` a decoration dependent of `origin` when nothing else is
    /// keeping it alive. Returns true if the link was made. A chunk never
    /// adopts one of its own ancestors.
    pub fn adopt(&mut self, origin: ChunkHandle, child: ChunkHandle) -> bool {
        if origin == child || !self.arena.contains(origin) || self.descends_from(origin, child) {
            return false;
        }
        let Some(cv) = self.arena.get_mut(child) else {
            return false;
        };
        if cv.reload_state != ReloadState::TopUnload || cv.parent().is_some() {
            return false;
        }
        cv.reload_state = ReloadState::Child;
        cv.set_parent(Some(origin));
        if let Some(ov) = self.arena.get_mut(origin) {
            ov.add_child(child);
        }
        true
    }

    /// Removes a single chunk from its cluster and the arena, dropping the
    /// cluster once it is empty. Dependency links are left to the caller.
    fn remove_slot(&mut self, h: ChunkHandle) -> Option<ChunkValue> {
        let value = self.arena.remove(h)?;
        let coord = value.chunk.coord;
        let key = coord.cluster_key();
        let mut empty = false;
        if let Some(cluster) = self.clusters.get_mut(&key) {
            let slot = &mut cluster.slots[coord.slot_index()];
            assert_eq!(*slot, Some(h), "cluster slot for {coord} does not hold its chunk");
            *slot = None;
            cluster.live -= 1;
            empty = cluster.live == 0;
        }
        if empty {
            self.clusters.remove(&key);
            log::debug!("cluster ({}, {}, {}) removed", key.x, key.y, key.z);
        }
        Some(value)
    }

    /// Frees a chunk and, transitively, every decoration child it alone was
    /// keeping alive. Returns all freed values.
    pub fn unload(&mut self, h: ChunkHandle) -> Vec<(ChunkHandle, ChunkValue)> {
        let mut freed = Vec::new();
        let mut work = vec![h];
        while let Some(h) = work.pop() {
            let Some(mut value) = self.remove_slot(h) else {
                continue;
            };
            if let Some(p) = value.parent() {
                if let Some(pv) = self.arena.get_mut(p) {
                    pv.remove_child(h);
                }
            }
            for c in value.take_children() {
                let Some(cv) = self.arena.get_mut(c) else {
                    continue;
                };
                if cv.parent() != Some(h) {
                    continue;
                }
                cv.set_parent(None);
                if cv.reload_state == ReloadState::Child {
                    cv.reload_state = ReloadState::Tombstone;
                    work.push(c);
                }
            }
            freed.push((h, value));
        }
        freed
    }

    /// Frees every chunk no loader or live parent claimed since the last
    /// sweep, then resets this tick's claims so they lapse next sweep.
    pub fn sweep(&mut self) -> Vec<(ChunkHandle, ChunkValue)> {
        let doomed: Vec<ChunkHandle> = self
            .arena
            .iter()
            .filter(|(_, v)| {
                matches!(
                    v.reload_state,
                    ReloadState::TopUnload | ReloadState::Tombstone
                )
            })
            .map(|(h, _)| h)
            .collect();
        let mut freed = Vec::new();
        for h in doomed {
            freed.extend(self.unload(h));
        }

        let survivors: Vec<(ChunkHandle, ReloadState, Option<ChunkHandle>)> = self
            .arena
            .iter()
            .map(|(h, v)| (h, v.reload_state, v.parent()))
            .collect();
        for (h, state, parent) in survivors {
            let parent_alive = parent.is_some_and(|p| self.arena.contains(p));
            let next = match state {
                ReloadState::TopReload | ReloadState::Child if parent_alive => ReloadState::Child,
                ReloadState::TopReload | ReloadState::Child => ReloadState::TopUnload,
                other => other,
            };
            if let Some(v) = self.arena.get_mut(h) {
                v.reload_state = next;
            }
        }
        freed
    }

    /// Locates an existing chunk and chunk-local cell for a world position.
    pub fn locate(&self, p: BlockPos) -> Option<(ChunkHandle, (usize, usize, usize))> {
        let (coord, local) = ChunkCoord::split(p);
        self.lookup(coord).map(|h| (h, local))
    }

    /// Block at a world position if its chunk has terrain.
    pub fn block_at(&self, p: BlockPos) -> Option<Block> {
        let (h, (x, y, z)) = self.locate(p)?;
        let v = self.arena.get(h)?;
        (v.load_level() >= LoadLevel::Partial).then(|| v.chunk.block(x, y, z))
    }

    /// Panics if any cluster's live count disagrees with its occupied slots or
    /// a slot points at a chunk with another coordinate.
    pub fn check_invariants(&self) {
        let mut total = 0;
        for (key, cluster) in &self.clusters {
            let occupied = cluster.slots.iter().filter(|s| s.is_some()).count();
            assert_eq!(occupied, cluster.live, "cluster {key:?} live count drifted");
            assert!(cluster.live > 0, "empty cluster {key:?} left in table");
            for (i, slot) in cluster.slots.iter().enumerate() {
                if let Some(h) = slot {
                    let v = self
                        .arena
                        .get(*h)
                        .unwrap_or_else(|| panic!("cluster {key:?} slot {i} holds a stale handle"));
                    assert_eq!(v.chunk.coord, key.chunk_at(i));
                    assert!(v.children().len() <= MAX_CHILDREN);
                }
            }
            total += cluster.live;
        }
        assert_eq!(total, self.arena.len(), "arena holds chunks no cluster references");
        for (h, _) in self.arena.iter() {
            assert!(!self.descends_from(h, h), "chunk {h:?} is its own decoration ancestor");
        }
    }
}

#[cfg(test)]
mod tests;
