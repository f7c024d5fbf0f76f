use super::*;
use strata_world::{TerrainConfig, TerrainMode};

fn flat_gen() -> TerrainGen {
    TerrainGen::new(
        3,
        TerrainConfig {
            mode: TerrainMode::Flat,
            flat_thickness: 2,
            ..TerrainConfig::default()
        },
    )
}

fn claim(store: &mut ChunkStore, coord: ChunkCoord) -> ChunkHandle {
    let h = store.get_or_create(coord, true).expect("created");
    store.value_mut(h).expect("live").reload_state = ReloadState::TopReload;
    h
}

#[test]
fn addressing_is_idempotent() {
    let mut s = ChunkStore::new(1);
    let c = ChunkCoord::new(-9, 3, 17);
    let a = s.get_or_create(c, true).expect("created");
    let b = s.get_or_create(c, true).expect("found");
    assert_eq!(a, b);
    assert_eq!(s.len(), 1);
    assert_eq!(s.lookup(c), Some(a));
    assert_eq!(s.chunk(a).map(|ch| ch.coord), Some(c));
}

#[test]
fn lookup_without_create_reports_absence() {
    let mut s = ChunkStore::new(1);
    assert!(s.get_or_create(ChunkCoord::new(0, 0, 0), false).is_none());
    assert_eq!(s.cluster_count(), 0);
}

#[test]
fn chunks_share_cluster_by_shifted_key() {
    let mut s = ChunkStore::new(1);
    s.get_or_create(ChunkCoord::new(0, 0, 0), true);
    s.get_or_create(ChunkCoord::new(7, 7, 7), true);
    s.get_or_create(ChunkCoord::new(-1, 0, 0), true);
    assert_eq!(s.cluster_count(), 2);
    let k = ChunkCoord::new(0, 0, 0).cluster_key();
    assert_eq!(s.cluster(k).map(|c| c.live()), Some(2));
    s.check_invariants();
}

#[test]
fn fully_loaded_requires_total() {
    let mut s = ChunkStore::new(1);
    let g = flat_gen();
    let c = ChunkCoord::new(0, 0, 0);
    let h = s.get_or_create(c, true).expect("created");
    assert!(s.fully_loaded(c).is_none());
    s.populate(h, &g);
    assert_eq!(s.level(h), Some(LoadLevel::Partial));
    assert!(s.fully_loaded(c).is_none());
    s.raise_level(h, LoadLevel::Total);
    assert!(s.fully_loaded(c).is_some());
}

#[test]
#[should_panic(expected = "cannot drop")]
fn load_level_never_drops() {
    let mut s = ChunkStore::new(1);
    let h = s.get_or_create(ChunkCoord::new(0, 0, 0), true).expect("created");
    s.raise_level(h, LoadLevel::Total);
    s.raise_level(h, LoadLevel::Partial);
}

#[test]
fn restored_chunks_enter_total() {
    let mut s = ChunkStore::new(1);
    let h = s.get_or_create(ChunkCoord::new(0, 0, 0), true).expect("created");
    s.apply_populated(
        h,
        Populated {
            blocks: vec![Block::Stone; strata_world::CHUNK_VOLUME].into_boxed_slice(),
            restored: true,
        },
    );
    assert_eq!(s.level(h), Some(LoadLevel::Total));
}

#[test]
fn unclaimed_chunk_survives_one_sweep() {
    let mut s = ChunkStore::new(1);
    let c = ChunkCoord::new(2, 0, 2);
    let h = claim(&mut s, c);
    assert!(s.sweep().is_empty());
    assert_eq!(s.value(h).map(|v| v.reload_state), Some(ReloadState::TopUnload));
    let freed = s.sweep();
    assert_eq!(freed.len(), 1);
    assert_eq!(freed[0].0, h);
    assert!(s.lookup(c).is_none());
    assert!(!s.contains(h));
    assert_eq!(s.cluster_count(), 0);
}

#[test]
fn reclaimed_chunk_is_retained() {
    let mut s = ChunkStore::new(1);
    let c = ChunkCoord::new(0, 0, 0);
    let h = claim(&mut s, c);
    for _ in 0..5 {
        assert_eq!(claim(&mut s, c), h);
        assert!(s.sweep().is_empty());
    }
}

#[test]
fn freeing_parent_tombstones_children() {
    let mut s = ChunkStore::new(1);
    let origin = claim(&mut s, ChunkCoord::new(0, 0, 0));
    let child = s.get_or_create(ChunkCoord::new(1, 0, 0), true).expect("created");
    let grandchild = s.get_or_create(ChunkCoord::new(2, 0, 0), true).expect("created");
    assert!(s.adopt(origin, child));
    assert!(s.adopt(child, grandchild));
    assert!(!s.adopt(origin, child), "already parented");

    // Children outlive the claim lapse as long as the origin lives.
    assert!(s.sweep().is_empty());
    assert_eq!(s.value(child).map(|v| v.reload_state), Some(ReloadState::Child));

    let freed = s.sweep();
    let mut freed_handles: Vec<ChunkHandle> = freed.iter().map(|(h, _)| *h).collect();
    freed_handles.sort();
    let mut expected = vec![origin, child, grandchild];
    expected.sort();
    assert_eq!(freed_handles, expected);
    assert!(s.is_empty());
    s.check_invariants();
}

#[test]
fn parent_is_never_adopted_by_its_child() {
    let mut s = ChunkStore::new(1);
    let a = claim(&mut s, ChunkCoord::new(0, 0, 0));
    let b = s.get_or_create(ChunkCoord::new(1, 0, 0), true).expect("created");
    let c = s.get_or_create(ChunkCoord::new(2, 0, 0), true).expect("created");
    assert!(s.adopt(a, b));
    assert!(s.adopt(b, c));
    // The claim on `a` lapses, leaving it unclaimed and parentless.
    s.sweep();
    assert_eq!(s.value(a).map(|v| v.reload_state), Some(ReloadState::TopUnload));
    assert!(!s.adopt(b, a), "direct cycle");
    assert!(!s.adopt(c, a), "cycle through a grandchild");
    s.check_invariants();

    let freed = s.sweep();
    assert_eq!(freed.len(), 3);
    assert!(s.is_empty());
}

#[test]
fn claimed_child_outlives_parent() {
    let mut s = ChunkStore::new(1);
    let origin = claim(&mut s, ChunkCoord::new(0, 0, 0));
    let child = s.get_or_create(ChunkCoord::new(0, 0, 1), true).expect("created");
    assert!(s.adopt(origin, child));
    s.sweep();
    // Only the child is claimed from now on.
    claim(&mut s, ChunkCoord::new(0, 0, 1));
    let freed = s.sweep();
    assert_eq!(freed.len(), 1);
    assert_eq!(freed[0].0, origin);
    assert!(s.contains(child));
    assert_eq!(s.value(child).and_then(|v| v.parent()), None);
    // Next sweep it lapses to an ordinary unclaimed chunk.
    assert_eq!(s.value(child).map(|v| v.reload_state), Some(ReloadState::TopUnload));
}

#[test]
fn stale_handles_do_not_resolve() {
    let mut s = ChunkStore::new(1);
    let c = ChunkCoord::new(0, 0, 0);
    let h = s.get_or_create(c, true).expect("created");
    s.sweep();
    let h2 = s.get_or_create(c, true).expect("recreated");
    assert_ne!(h, h2);
    assert!(s.value(h).is_none());
}

#[test]
fn block_at_needs_terrain() {
    let mut s = ChunkStore::new(1);
    let g = flat_gen();
    let h = s.get_or_create(ChunkCoord::new(0, 0, 0), true).expect("created");
    assert_eq!(s.block_at(BlockPos::new(1, 0, 1)), None);
    s.populate(h, &g);
    assert_eq!(s.block_at(BlockPos::new(1, 0, 1)), Some(Block::Bedrock));
    assert_eq!(s.block_at(BlockPos::new(1, 2, 1)), Some(Block::Grass));
    assert_eq!(s.block_at(BlockPos::new(1, 3, 1)), Some(Block::Air));
    assert_eq!(s.block_at(BlockPos::new(1, -1, 1)), None);
}
