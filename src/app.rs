use std::error::Error;

use strata_blocks::Block;
use strata_geom::Vec3;
use strata_runtime::{LoaderId, World};

use crate::mesher;
use crate::render_thread::MeshPool;

#[derive(Clone, Copy, Debug, Default)]
pub struct RunSummary {
    pub ticks: u64,
    pub generated: usize,
    pub freed: usize,
    pub structures: usize,
    pub placed: usize,
    pub removed: usize,
    pub meshed: usize,
    pub faces: usize,
    pub saved: usize,
    pub recycled: u64,
}

/// Drives the world headlessly: a loader hovering over the terrain moves
/// along +X, raycast edits happen at a fixed cadence and tainted chunks are
/// meshed between ticks.
pub struct App {
    world: World,
    loader: LoaderId,
    pos: Vec3,
    speed: f32,
    edit_every: u64,
    edits: u64,
    meshes: MeshPool,
    summary: RunSummary,
}

/// Eight blocks above the terrain surface at (x, z).
fn hover(world: &World, x: f32, z: f32) -> Vec3 {
    let h = world
        .source()
        .terrain()
        .surface_height(x.floor() as i32, z.floor() as i32);
    Vec3::new(x, h as f32 + 8.5, z)
}

impl App {
    pub fn new(mut world: World, speed: f32, edit_every: u64) -> Result<Self, Box<dyn Error>> {
        let pos = hover(&world, 8.5, 8.5);
        let loader = world
            .create_loader(pos.block())
            .ok_or("no free chunk loader slot")?;
        if world.spawn_player(pos).is_none() {
            log::warn!("entity list full; running without a player");
        }
        Ok(Self {
            world,
            loader,
            pos,
            speed,
            edit_every,
            edits: 0,
            meshes: MeshPool::new(),
            summary: RunSummary::default(),
        })
    }

    #[inline]
    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn step(&mut self) {
        let stats = self.world.tick();
        self.summary.ticks += 1;
        self.summary.generated += stats.generated;
        self.summary.freed += stats.freed;
        self.summary.structures += stats.structures;
        self.summary.saved += stats.saved;

        if self.edit_every > 0 && (stats.tick + 1) % self.edit_every == 0 {
            self.edit(stats.tick);
        }
        self.mesh();

        self.pos = hover(&self.world, self.pos.x + self.speed, self.pos.z);
        self.world.update_loader(self.loader, self.pos.block());
    }

    /// Looks down and ahead; alternates digging the hit block and placing a
    /// lamp against the face that was hit.
    fn edit(&mut self, tick: u64) {
        let dir = Vec3::new(0.4, -1.0, 0.25);
        let Some(hit) = self.world.raycast(self.pos, dir, 32.0) else {
            log::debug!(target: "events", "[tick {}] RaycastEdit missed from {:?}", tick, self.pos);
            return;
        };
        self.edits += 1;
        if self.edits % 2 == 1 {
            if self.world.remove_block(hit.block) {
                self.summary.removed += 1;
                log::info!(target: "events", "[tick {}] RaycastEdit remove at {:?}", tick, hit.block);
            }
        } else if hit.prev != hit.block && self.world.place_block(hit.prev, Block::Glowstone) {
            self.summary.placed += 1;
            log::info!(
                target: "events",
                "[tick {}] RaycastEdit place {} at {:?} face={:?}",
                tick,
                Block::Glowstone,
                hit.prev,
                hit.face
            );
        }
    }

    fn mesh(&mut self) {
        for coord in self.world.tainted_chunks() {
            let Some(stats) = mesher::count_faces(&self.world, coord) else {
                continue;
            };
            let mesh = (stats.faces > 0).then(|| self.meshes.allocate());
            self.world.finish_mesh(coord, mesh);
            self.summary.meshed += 1;
            self.summary.faces += stats.faces;
        }
    }

    pub fn run(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.step();
        }
    }

    /// Saves edited chunks and returns the run totals.
    pub fn finish(mut self) -> Result<RunSummary, Box<dyn Error>> {
        self.summary.saved += self.world.save()?;
        self.summary.recycled = self.meshes.recycled();
        Ok(self.summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_structures::StructureCatalog;
    use strata_world::{TerrainConfig, TerrainMode, WorldConfig};

    fn flat_world(radius: i32) -> World {
        let mut cfg = WorldConfig::default();
        cfg.streaming.radius = radius;
        cfg.terrain = TerrainConfig {
            mode: TerrainMode::Flat,
            flat_thickness: 3,
            ..TerrainConfig::default()
        };
        World::new(cfg, StructureCatalog::empty()).0
    }

    #[test]
    fn moving_loader_streams_and_frees() {
        let mut app = App::new(flat_world(1), 16.0, 0).expect("loader slot");
        app.run(6);
        let s = app.finish().expect("no save dir");
        assert_eq!(s.ticks, 6);
        assert!(s.generated > 7);
        assert!(s.freed > 0);
        assert!(s.meshed > 0);
        assert_eq!(s.placed + s.removed, 0);
    }

    #[test]
    fn edits_alternate_dig_and_place() {
        let mut app = App::new(flat_world(1), 0.0, 1).expect("loader slot");
        app.run(4);
        let s = app.finish().expect("no save dir");
        assert_eq!(s.removed, 2);
        assert_eq!(s.placed, 2);
    }
}
