use std::collections::VecDeque;

use hashbrown::HashMap;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use strata_blocks::Block;
use strata_chunk::{Chunk, LightChannel};
use strata_cluster::{ChunkHandle, ChunkSource, ChunkStore, LoadLevel, Populated, ReloadState};
use strata_geom::{BlockPos, RayHit, Vec3};
use strata_io::{PersistError, SaveDir};
use strata_lighting::LightStats;
use strata_structures::StructureCatalog;
use strata_world::{ChunkCoord, TerrainGen, WorldConfig};

use crate::entities::EntityList;
use crate::loaders::{ChunkLoaders, LoaderId};
use crate::shared::SharedHandle;
use crate::source::WorldSource;
use crate::spsc::{self, Consumer, MeshId, Producer, TeardownRequest};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockInfo {
    pub pos: BlockPos,
    pub block: Block,
    pub sky: u8,
    pub torch: u8,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TickStats {
    pub tick: u64,
    pub claimed: usize,
    pub generated: usize,
    pub restored: usize,
    pub decorated: usize,
    pub structures: usize,
    pub freed: usize,
    pub saved: usize,
    pub seeded: usize,
    pub light: LightStats,
    pub expired_items: usize,
    pub teardown_backlog: usize,
}

/// Streaming voxel world. Owns every chunk; the render side only reads chunk
/// data between ticks and receives teardown requests over the SPSC ring.
pub struct World {
    cfg: WorldConfig,
    store: ChunkStore,
    source: WorldSource,
    catalog: StructureCatalog,
    loaders: ChunkLoaders,
    entities: EntityList,
    rng: ChaCha8Rng,
    tick: u64,
    meshes: HashMap<ChunkCoord, SharedHandle<MeshId>>,
    teardown: Producer<TeardownRequest>,
    backlog: VecDeque<TeardownRequest>,
    /// Edited chunks that were unloaded but could not be written yet.
    unsaved: HashMap<ChunkCoord, Box<[Block]>>,
}

impl World {
    /// Builds an empty world and the render-side end of its teardown ring.
    pub fn new(cfg: WorldConfig, catalog: StructureCatalog) -> (Self, Consumer<TeardownRequest>) {
        let terrain = TerrainGen::new(cfg.seed, cfg.terrain.clone());
        let save = cfg.save_dir.clone().map(SaveDir::new);
        let (teardown, consumer) = spsc::channel(cfg.render.teardown_capacity);
        let world = Self {
            store: ChunkStore::new(cfg.seed),
            source: WorldSource::new(terrain, save),
            catalog,
            loaders: ChunkLoaders::new(cfg.streaming.max_loaders),
            entities: EntityList::new(cfg.entities.capacity),
            rng: ChaCha8Rng::seed_from_u64(u64::from(cfg.seed as u32)),
            tick: 0,
            meshes: HashMap::new(),
            teardown,
            backlog: VecDeque::new(),
            unsaved: HashMap::new(),
            cfg,
        };
        (world, consumer)
    }

    #[inline]
    pub fn config(&self) -> &WorldConfig {
        &self.cfg
    }

    #[inline]
    pub fn store(&self) -> &ChunkStore {
        &self.store
    }

    #[inline]
    pub fn source(&self) -> &WorldSource {
        &self.source
    }

    #[inline]
    pub fn entities(&self) -> &EntityList {
        &self.entities
    }

    #[inline]
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    #[inline]
    pub fn teardown_backlog(&self) -> usize {
        self.backlog.len()
    }

    /// Unloaded chunks whose edits still wait for a successful write.
    #[inline]
    pub fn unsaved_count(&self) -> usize {
        self.unsaved.len()
    }

    #[inline]
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn create_loader(&mut self, pos: BlockPos) -> Option<LoaderId> {
        self.loaders.create(pos)
    }

    pub fn update_loader(&mut self, id: LoaderId, pos: BlockPos) -> bool {
        self.loaders.update(id, pos)
    }

    pub fn remove_loader(&mut self, id: LoaderId) -> bool {
        self.loaders.remove(id)
    }

    #[inline]
    pub fn loaders(&self) -> &ChunkLoaders {
        &self.loaders
    }

    pub fn spawn_player(&mut self, pos: Vec3) -> Option<u64> {
        self.entities.spawn_player(pos)
    }

    /// One simulation step: claim, generate, decorate, sweep, light,
    /// entities, then hand queued teardowns to the render side.
    pub fn tick(&mut self) -> TickStats {
        let mut stats = TickStats {
            tick: self.tick,
            ..TickStats::default()
        };
        let claimed = self.claim();
        stats.claimed = claimed.len();
        self.generate(&claimed, &mut stats);
        self.decorate(&claimed, &mut stats);
        self.sweep(&mut stats);
        self.relight(&mut stats);
        stats.expired_items = self.step_entities();
        self.flush_teardown();
        stats.teardown_backlog = self.backlog.len();

        if stats.generated + stats.freed + stats.saved > 0 {
            log::info!(
                target: "events",
                "[tick {}] claimed={} generated={} restored={} decorated={} structures={} freed={} saved={} live={}",
                self.tick,
                stats.claimed,
                stats.generated,
                stats.restored,
                stats.decorated,
                stats.structures,
                stats.freed,
                stats.saved,
                self.store.len()
            );
        }
        log::debug!(
            target: "events",
            "[tick {}] light seeded={} deleted={} inserted={} items_expired={} backlog={}",
            self.tick,
            stats.seeded,
            stats.light.deleted,
            stats.light.inserted,
            stats.expired_items,
            stats.teardown_backlog
        );
        self.tick += 1;
        stats
    }

    /// Marks every chunk inside a loader's ball as claimed this tick.
    fn claim(&mut self) -> Vec<ChunkHandle> {
        let coords = self.loaders.footprint(self.cfg.streaming.radius);
        let mut claimed = Vec::with_capacity(coords.len());
        for c in coords {
            let Some(h) = self.store.get_or_create(c, true) else {
                continue;
            };
            if let Some(v) = self.store.value_mut(h) {
                v.reload_state = ReloadState::TopReload;
            }
            claimed.push(h);
        }
        claimed
    }

    fn generate(&mut self, claimed: &[ChunkHandle], stats: &mut TickStats) {
        let jobs: Vec<(ChunkHandle, ChunkCoord)> = claimed
            .iter()
            .filter_map(|h| {
                self.store
                    .value(*h)
                    .filter(|v| v.load_level() == LoadLevel::None)
                    .map(|v| (*h, v.chunk.coord))
            })
            .collect();
        // Edits that never reached disk come back as they were left.
        let (pending, jobs): (Vec<_>, Vec<_>) = jobs
            .into_iter()
            .partition(|(_, coord)| self.unsaved.contains_key(coord));
        for (h, coord) in pending {
            let Some(blocks) = self.unsaved.remove(&coord) else {
                continue;
            };
            self.store.apply_populated(h, Populated { blocks, restored: true });
            if let Some(c) = self.store.chunk_mut(h) {
                c.mark_modified();
            }
            stats.restored += 1;
        }
        if jobs.is_empty() {
            return;
        }
        let source = &self.source;
        let populated: Vec<(ChunkHandle, Populated)> = jobs
            .par_iter()
            .map(|&(h, coord)| (h, source.populate(coord)))
            .collect();
        for (h, p) in populated {
            if p.restored {
                stats.restored += 1;
            } else {
                stats.generated += 1;
            }
            self.store.apply_populated(h, p);
        }
    }

    fn decorate(&mut self, claimed: &[ChunkHandle], stats: &mut TickStats) {
        for &h in claimed {
            if self.store.level(h) != Some(LoadLevel::Partial) {
                continue;
            }
            if !self.cfg.decoration.enabled {
                self.store.raise_level(h, LoadLevel::Total);
                stats.decorated += 1;
                continue;
            }
            if let Some(s) = strata_structures::decorate_chunk(&mut self.store, &self.source, &self.catalog, h) {
                stats.decorated += 1;
                stats.structures += s.placed;
            }
        }
    }

    fn sweep(&mut self, stats: &mut TickStats) {
        let freed = self.store.sweep();
        if freed.is_empty() {
            return;
        }
        stats.freed = freed.len();
        for (_, v) in &freed {
            let coord = v.chunk.coord;
            if let Some(handle) = self.meshes.remove(&coord) {
                self.backlog.push_back(TeardownRequest { coord, handle });
            }
        }
        for (_, v) in &freed {
            if v.is_total() && v.lit {
                strata_lighting::forget_chunk(&mut self.store, v.chunk.coord, &self.source);
            }
        }
        for (_, v) in &freed {
            if v.chunk.is_modified() {
                self.unsaved.insert(v.chunk.coord, v.chunk.blocks().into());
            }
        }
        if self.unsaved.is_empty() {
            return;
        }
        let dirty: Vec<(ChunkCoord, &[Block])> = self.unsaved.iter().map(|(c, b)| (*c, &b[..])).collect();
        match self.source.store(&dirty) {
            Ok(n) => {
                stats.saved = n;
                self.unsaved.clear();
            }
            Err(e) => log::warn!(
                target: "events",
                "[tick {}] failed to save {} unloaded chunks, keeping them in memory: {e}",
                self.tick,
                self.unsaved.len()
            ),
        }
    }

    fn relight(&mut self, stats: &mut TickStats) {
        let unlit: Vec<ChunkHandle> = self
            .store
            .handles_at(LoadLevel::Total)
            .into_iter()
            .filter(|h| self.store.value(*h).is_some_and(|v| !v.lit))
            .collect();
        for &h in &unlit {
            strata_lighting::seed_chunk(&mut self.store, h, &self.source);
        }
        stats.seeded = unlit.len();
        stats.light = strata_lighting::propagate(&mut self.store);
    }

    /// Drains pending light work without running a full tick.
    pub fn settle_light(&mut self) -> LightStats {
        strata_lighting::propagate(&mut self.store)
    }

    fn step_entities(&mut self) -> usize {
        let store = &self.store;
        let lifetime = self.cfg.entities.item_lifetime_ticks;
        self.entities.step(lifetime, |p| {
            let (coord, (x, y, z)) = ChunkCoord::split(p);
            store.fully_loaded(coord).map(|c| c.block(x, y, z).is_opaque())
        })
    }

    fn flush_teardown(&mut self) {
        while let Some(req) = self.backlog.pop_front() {
            if let Err(req) = self.teardown.offer(req) {
                self.backlog.push_front(req);
                break;
            }
        }
    }

    /// Block and light at `pos` if its chunk is fully loaded.
    pub fn get_block(&self, pos: BlockPos) -> Option<BlockInfo> {
        let (coord, (x, y, z)) = ChunkCoord::split(pos);
        let c = self.store.fully_loaded(coord)?;
        Some(BlockInfo {
            pos,
            block: c.block(x, y, z),
            sky: c.light(LightChannel::Sky, x, y, z),
            torch: c.light(LightChannel::Torch, x, y, z),
        })
    }

    /// Loaded cells of the inclusive box spanned by two corners.
    pub fn blocks_in_range(&self, a: BlockPos, b: BlockPos) -> Vec<BlockInfo> {
        let (lo, hi) = (
            BlockPos::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            BlockPos::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        );
        let mut out = Vec::new();
        for y in lo.y..=hi.y {
            for z in lo.z..=hi.z {
                for x in lo.x..=hi.x {
                    if let Some(info) = self.get_block(BlockPos::new(x, y, z)) {
                        out.push(info);
                    }
                }
            }
        }
        out
    }

    pub fn place_block(&mut self, pos: BlockPos, block: Block) -> bool {
        let placed = strata_edit::place_block(&mut self.store, pos, block);
        if placed {
            log::debug!(target: "events", "[tick {}] placed {} at {:?}", self.tick, block, pos);
        }
        placed
    }

    /// Clears a block and drops it as an item entity.
    pub fn remove_block(&mut self, pos: BlockPos) -> bool {
        let Some(old) = strata_edit::remove_block(&mut self.store, pos) else {
            return false;
        };
        let vel = Vec3::new(self.rng.random_range(-1.0..1.0), 4.0, self.rng.random_range(-1.0..1.0));
        if self.entities.spawn_item(old, pos.center(), vel).is_none() {
            log::debug!("no room to drop {old}");
        }
        log::debug!(target: "events", "[tick {}] removed {} at {:?}", self.tick, old, pos);
        true
    }

    /// First non-air cell along a ray through fully loaded chunks.
    pub fn raycast(&self, origin: Vec3, dir: Vec3, max_dist: f32) -> Option<RayHit> {
        let store = &self.store;
        strata_geom::raycast(origin, dir, max_dist, |p| {
            let (coord, (x, y, z)) = ChunkCoord::split(p);
            store.fully_loaded(coord).is_some_and(|c| !c.block(x, y, z).is_air())
        })
    }

    /// Fully loaded chunks whose mesh is stale, ordered by coordinate.
    pub fn tainted_chunks(&self) -> Vec<ChunkCoord> {
        let mut out: Vec<ChunkCoord> = self
            .store
            .iter()
            .filter(|(_, v)| v.is_total() && v.chunk.is_tainted())
            .map(|(_, v)| v.chunk.coord)
            .collect();
        out.sort_unstable();
        out
    }

    #[inline]
    pub fn chunk(&self, coord: ChunkCoord) -> Option<&Chunk> {
        self.store.fully_loaded(coord)
    }

    /// Records the outcome of meshing a chunk and clears its taint. A replaced
    /// mesh, or a mesh for a chunk that is gone, is queued for teardown.
    pub fn finish_mesh(&mut self, coord: ChunkCoord, mesh: Option<SharedHandle<MeshId>>) {
        let Some(h) = self.store.fully_loaded_handle(coord) else {
            if let Some(handle) = mesh {
                self.backlog.push_back(TeardownRequest { coord, handle });
            }
            return;
        };
        if let Some(c) = self.store.chunk_mut(h) {
            c.clear_tainted();
        }
        let old = match mesh {
            Some(handle) => self.meshes.insert(coord, handle),
            None => self.meshes.remove(&coord),
        };
        if let Some(handle) = old {
            self.backlog.push_back(TeardownRequest { coord, handle });
        }
    }

    /// Writes every edited chunk still in memory. Returns the number written.
    pub fn save(&mut self) -> Result<usize, PersistError> {
        if self.source.save_dir().is_none() {
            return Ok(0);
        }
        let handles: Vec<ChunkHandle> = self
            .store
            .iter()
            .filter(|(_, v)| v.is_total() && v.chunk.is_modified())
            .map(|(h, _)| h)
            .collect();
        let written = {
            let dirty: Vec<(ChunkCoord, &[Block])> = handles
                .iter()
                .filter_map(|h| self.store.chunk(*h))
                .map(|c| (c.coord, c.blocks()))
                .chain(self.unsaved.iter().map(|(c, b)| (*c, &b[..])))
                .collect();
            self.source.store(&dirty)?
        };
        self.unsaved.clear();
        for h in handles {
            if let Some(c) = self.store.chunk_mut(h) {
                c.clear_modified();
            }
        }
        log::info!(target: "events", "[tick {}] saved {} chunks", self.tick, written);
        Ok(written)
    }
}
