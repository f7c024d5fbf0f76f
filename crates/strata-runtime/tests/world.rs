use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use strata_blocks::Block;
use strata_cluster::LoadLevel;
use strata_geom::{BlockPos, Face, Vec3};
use strata_runtime::{EntityKind, MeshId, SharedHandle, World, ball_offsets};
use strata_structures::StructureCatalog;
use strata_world::{ChunkCoord, TerrainConfig, TerrainMode, WorldConfig};

/// Flat world with grass at y = 3 and no structures.
fn flat_config(radius: i32) -> WorldConfig {
    let mut cfg = WorldConfig::default();
    cfg.seed = 99;
    cfg.streaming.radius = radius;
    cfg.terrain = TerrainConfig {
        mode: TerrainMode::Flat,
        flat_thickness: 3,
        ..TerrainConfig::default()
    };
    cfg.decoration.enabled = false;
    cfg
}

fn total_chunks(world: &World) -> usize {
    world.store().handles_at(LoadLevel::Total).len()
}

#[test]
fn loader_ball_is_loaded_and_lit() {
    let (mut world, _rx) = World::new(flat_config(1), StructureCatalog::empty());
    world.create_loader(BlockPos::new(8, 8, 8)).expect("slot");
    let stats = world.tick();
    assert_eq!(stats.claimed, ball_offsets(1).len());
    assert_eq!(total_chunks(&world), 7);
    // Open sky above the grass.
    let above = world.get_block(BlockPos::new(4, 10, 4)).expect("loaded");
    assert_eq!(above.block, Block::Air);
    assert_eq!(above.sky, 15);
    assert_eq!(world.get_block(BlockPos::new(4, 3, 4)).map(|b| b.block), Some(Block::Grass));
    world.store().check_invariants();
}

#[test]
fn removed_loader_frees_chunks_one_tick_later() {
    let (mut world, _rx) = World::new(flat_config(1), StructureCatalog::empty());
    let id = world.create_loader(BlockPos::new(8, 8, 8)).expect("slot");
    world.tick();
    world.tick();
    assert_eq!(total_chunks(&world), 7);

    assert!(world.remove_loader(id));
    let stats = world.tick();
    assert!(stats.freed >= 7);
    assert_eq!(total_chunks(&world), 0);
    world.tick();
    assert!(world.store().is_empty());
    world.store().check_invariants();
}

#[test]
fn moving_loader_keeps_overlap_and_frees_the_rest() {
    let (mut world, _rx) = World::new(flat_config(1), StructureCatalog::empty());
    let id = world.create_loader(BlockPos::new(8, 8, 8)).expect("slot");
    world.tick();
    world.update_loader(id, BlockPos::new(24, 8, 8));
    world.tick();
    let live: Vec<ChunkCoord> = world
        .store()
        .handles_at(LoadLevel::Total)
        .into_iter()
        .filter_map(|h| world.store().chunk(h).map(|c| c.coord))
        .collect();
    assert_eq!(live.len(), 7);
    assert!(live.contains(&ChunkCoord::new(2, 0, 0)));
    assert!(!live.contains(&ChunkCoord::new(-1, 0, 0)));
}

#[test]
fn remove_drops_item_and_place_restores() {
    let (mut world, _rx) = World::new(flat_config(1), StructureCatalog::empty());
    world.create_loader(BlockPos::new(8, 8, 8)).expect("slot");
    world.tick();
    let p = BlockPos::new(6, 3, 6);
    let before: Vec<Block> = world.chunk(ChunkCoord::new(0, 0, 0)).expect("loaded").blocks().to_vec();

    assert!(world.remove_block(p));
    assert!(!world.remove_block(p));
    assert_eq!(world.entities().items().count(), 1);
    let item = world.entities().items().next().expect("item");
    assert_eq!(item.kind, EntityKind::Item(Block::Grass));

    assert!(world.place_block(p, Block::Grass));
    assert!(!world.place_block(p, Block::Stone));
    world.tick();
    let after = world.chunk(ChunkCoord::new(0, 0, 0)).expect("loaded").blocks();
    assert_eq!(before.as_slice(), after);
}

#[test]
fn glowstone_lights_and_unlights_after_tick() {
    let (mut world, _rx) = World::new(flat_config(1), StructureCatalog::empty());
    world.create_loader(BlockPos::new(8, 8, 8)).expect("slot");
    world.tick();
    let lamp = BlockPos::new(8, 4, 8);
    assert!(world.place_block(lamp, Block::Glowstone));
    world.tick();
    assert_eq!(world.get_block(BlockPos::new(8, 4, 11)).map(|b| b.torch), Some(12));
    assert!(world.remove_block(lamp));
    world.tick();
    assert!(
        world
            .blocks_in_range(BlockPos::new(0, 4, 0), BlockPos::new(15, 8, 15))
            .iter()
            .all(|b| b.torch == 0)
    );
}

#[test]
fn raycast_hits_the_ground_from_above() {
    let (mut world, _rx) = World::new(flat_config(1), StructureCatalog::empty());
    world.create_loader(BlockPos::new(8, 8, 8)).expect("slot");
    world.tick();
    let hit = world
        .raycast(Vec3::new(5.5, 12.5, 5.5), Vec3::new(0.0, -1.0, 0.0), 20.0)
        .expect("hit");
    assert_eq!(hit.block, BlockPos::new(5, 3, 5));
    assert_eq!(hit.face, Some(Face::PosY));
    assert!(world.raycast(Vec3::new(5.5, 12.5, 5.5), Vec3::UP, 3.0).is_none());
}

#[test]
fn unloaded_mesh_is_handed_to_render_side() {
    let (mut world, rx) = World::new(flat_config(0), StructureCatalog::empty());
    let id = world.create_loader(BlockPos::new(8, 8, 8)).expect("slot");
    world.tick();
    let c = ChunkCoord::new(0, 0, 0);
    assert_eq!(world.tainted_chunks(), vec![c]);

    let freed = Arc::new(AtomicU32::new(0));
    let f = Arc::clone(&freed);
    world.finish_mesh(c, Some(SharedHandle::new(MeshId(3), move |_| {
        f.fetch_add(1, Ordering::SeqCst);
    })));
    assert!(world.tainted_chunks().is_empty());
    assert_eq!(world.mesh_count(), 1);

    world.remove_loader(id);
    world.tick();
    assert_eq!(world.mesh_count(), 0);
    let req = rx.poll().expect("teardown queued");
    assert_eq!(req.coord, c);
    assert_eq!(*req.handle.get(), MeshId(3));
    assert_eq!(freed.load(Ordering::SeqCst), 0);
    drop(req);
    assert_eq!(freed.load(Ordering::SeqCst), 1);
}

#[test]
fn full_ring_keeps_backlog_until_drained() {
    let mut cfg = flat_config(0);
    cfg.render.teardown_capacity = 1;
    let (mut world, rx) = World::new(cfg, StructureCatalog::empty());
    world.create_loader(BlockPos::new(8, 8, 8)).expect("slot");
    world.tick();
    let c = ChunkCoord::new(0, 0, 0);
    for i in 0..3 {
        world.finish_mesh(c, Some(SharedHandle::new(MeshId(i), |_| {})));
    }
    world.tick();
    // Two replaced meshes, one fits in the ring.
    assert_eq!(world.teardown_backlog(), 1);
    assert_eq!(rx.poll().map(|r| *r.handle.get()), Some(MeshId(0)));
    world.tick();
    assert_eq!(world.teardown_backlog(), 0);
    assert_eq!(rx.poll().map(|r| *r.handle.get()), Some(MeshId(1)));
}

#[test]
fn decorated_world_is_deterministic() {
    let mut cfg = WorldConfig::default();
    cfg.seed = 4242;
    cfg.streaming.radius = 1;
    let run = || {
        let (mut world, _rx) = World::new(cfg.clone(), StructureCatalog::builtin());
        world.create_loader(BlockPos::new(0, 24, 0)).expect("slot");
        world.tick();
        world.store().check_invariants();
        let mut chunks: Vec<(ChunkCoord, Vec<Block>)> = world
            .store()
            .iter()
            .filter(|(_, v)| v.load_level() >= LoadLevel::Partial)
            .map(|(_, v)| (v.chunk.coord, v.chunk.blocks().to_vec()))
            .collect();
        chunks.sort_by_key(|(c, _)| *c);
        chunks
    };
    assert_eq!(run(), run());
}

/// Two planks flanking every grass column, so decoration reaches into the
/// chunks on both x sides.
fn bar_catalog() -> StructureCatalog {
    StructureCatalog::from_toml_str(
        r#"
        [[structure]]
        name = "bar"
        base = "grass"
        chance = 1.0
        biomes = ["plains", "forest", "desert", "tundra"]
        blocks = [
            { offset = [1, 1, 0], block = "planks" },
            { offset = [-1, 1, 0], block = "planks" },
        ]
        "#,
    )
    .expect("catalog")
}

#[test]
fn decorated_chunks_drain_after_loader_moves_away() {
    let mut cfg = flat_config(2);
    cfg.decoration.enabled = true;
    let (mut world, _rx) = World::new(cfg, bar_catalog());
    let id = world.create_loader(BlockPos::new(8, -24, 8)).expect("slot");
    world.tick();
    world.update_loader(id, BlockPos::new(24, -24, 8));
    world.tick();
    world.store().check_invariants();
    assert!(world.get_block(BlockPos::new(17, 4, 8)).is_some_and(|b| b.block == Block::Planks));

    assert!(world.remove_loader(id));
    for _ in 0..6 {
        world.tick();
    }
    assert!(world.store().is_empty(), "{} chunks leaked", world.store().len());
}

