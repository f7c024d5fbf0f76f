use proptest::prelude::*;
use strata_blocks::Block;
use strata_cluster::ChunkStore;
use strata_geom::BlockPos;
use strata_structures::{Decorator, StructureTemplate, TemplateBlock};
use strata_world::{ChunkCoord, TerrainConfig, TerrainGen, TerrainMode};

fn flat() -> TerrainGen {
    TerrainGen::new(
        4,
        TerrainConfig {
            mode: TerrainMode::Flat,
            flat_thickness: 3,
            ..TerrainConfig::default()
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// A single blocked target leaves every template cell untouched.
    #[test]
    fn blocked_template_writes_nothing(
        offsets in proptest::collection::hash_set((-3i32..=3, 1i32..=6, -3i32..=3), 1..12),
        pick in any::<prop::sample::Index>(),
        ax in 0i32..16,
        az in 0i32..16,
    ) {
        let src = flat();
        let mut store = ChunkStore::new(4);
        let origin = store.get_or_create(ChunkCoord::new(0, 0, 0), true).expect("created");
        store.populate(origin, &src);

        let offsets: Vec<[i32; 3]> = offsets.into_iter().map(|(x, y, z)| [x, y, z]).collect();
        let blocked = offsets[pick.index(offsets.len())];
        let anchor = BlockPos::new(ax, 3, az);
        let blocked_pos = BlockPos::new(ax + blocked[0], 3 + blocked[1], az + blocked[2]);
        let t = StructureTemplate {
            name: "blob".into(),
            base: Block::Grass,
            chance: 1.0,
            biomes: vec![],
            blocks: offsets.iter().map(|o| TemplateBlock::new(*o, Block::Planks)).collect(),
        };

        let mut d = Decorator::new(&mut store, &src, origin).expect("live origin");
        d.set_anchor(anchor);
        prop_assert!(d.fits(&t));
        drop(d);

        strata_edit::write_block(&mut store, blocked_pos, Block::Stone);
        let mut d = Decorator::new(&mut store, &src, origin).expect("live origin");
        d.set_anchor(anchor);
        prop_assert!(!d.fits(&t));
        drop(d);

        for o in &offsets {
            let p = BlockPos::new(ax + o[0], 3 + o[1], az + o[2]);
            if p != blocked_pos {
                prop_assert_eq!(store.block_at(p), Some(Block::Air));
            }
        }
    }
}
