use proptest::prelude::*;
use strata_blocks::Block;
use strata_world::{CHUNK_VOLUME, ChunkCoord, TerrainConfig, TerrainGen};

fn arb_coord() -> impl Strategy<Value = ChunkCoord> {
    (-64i32..64, -4i32..4, -64i32..64).prop_map(|(x, y, z)| ChunkCoord::new(x, y, z))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    // Same seed and config produce identical chunks from independent generators.
    #[test]
    fn generation_is_deterministic(seed in any::<i32>(), coord in arb_coord()) {
        let a = TerrainGen::new(seed, TerrainConfig::default());
        let b = TerrainGen::new(seed, TerrainConfig::default());
        let mut ba = vec![Block::Air; CHUNK_VOLUME];
        let mut bb = vec![Block::Air; CHUNK_VOLUME];
        a.fill_chunk(coord, &mut ba);
        b.fill_chunk(coord, &mut bb);
        prop_assert_eq!(ba, bb);
    }

    // Columns are air strictly above the reported surface.
    #[test]
    fn nothing_above_surface(seed in any::<i32>(), x in -5000i32..5000, z in -5000i32..5000, dy in 1i32..40) {
        let g = TerrainGen::new(seed, TerrainConfig::default());
        let h = g.surface_height(x, z);
        prop_assert_eq!(g.block_at(x, h + dy, z), Block::Air);
    }
}
