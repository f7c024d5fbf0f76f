use proptest::prelude::*;
use strata_blocks::{Block, MAX_LIGHT};

#[test]
fn ids_are_dense_and_stable() {
    for (i, b) in Block::ALL.into_iter().enumerate() {
        assert_eq!(b.id() as usize, i);
        assert_eq!(Block::from_id(b.id()), Some(b));
    }
    assert_eq!(Block::Air.id(), 0);
    assert_eq!(Block::from_id(Block::ALL.len() as u8), None);
}

#[test]
fn emitters_are_transparent() {
    for b in Block::ALL {
        if b.is_emitter() {
            assert!(b.is_transparent(), "{b} emits but blocks light");
            assert!(b.emission() <= MAX_LIGHT);
        }
    }
    assert!(Block::Air.is_transparent());
    assert!(Block::Stone.is_opaque());
}

#[test]
fn serde_names_match_display() {
    #[derive(serde::Deserialize)]
    struct Row {
        block: Block,
    }
    for b in Block::ALL {
        let row: Row = toml::from_str(&format!("block = \"{}\"", b.name())).expect("parse");
        assert_eq!(row.block, b);
        assert_eq!(Block::from_name(&b.to_string()), Some(b));
    }
}

proptest! {
    #[test]
    fn unknown_ids_rejected(id in 12u8..=255) {
        prop_assert!(Block::from_id(id).is_none());
    }
}
