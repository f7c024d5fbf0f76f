use strata_geom::BlockPos;
use strata_world::ChunkCoord;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LoaderId(usize);

/// Fixed set of loader slots, each an optional streaming center.
pub struct ChunkLoaders {
    slots: Vec<Option<BlockPos>>,
}

/// Chunk offsets inside the ball of `radius` chunks.
pub fn ball_offsets(radius: i32) -> Vec<(i32, i32, i32)> {
    let r = radius.max(0);
    let r2 = i64::from(r) * i64::from(r);
    let sq = |v: i32| i64::from(v) * i64::from(v);
    let mut out = Vec::new();
    for dy in -r..=r {
        for dz in -r..=r {
            for dx in -r..=r {
                if sq(dx) + sq(dy) + sq(dz) <= r2 {
                    out.push((dx, dy, dz));
                }
            }
        }
    }
    out
}

impl ChunkLoaders {
    pub fn new(max: usize) -> Self {
        Self { slots: vec![None; max] }
    }

    pub fn create(&mut self, pos: BlockPos) -> Option<LoaderId> {
        let i = self.slots.iter().position(Option::is_none)?;
        self.slots[i] = Some(pos);
        Some(LoaderId(i))
    }

    pub fn update(&mut self, id: LoaderId, pos: BlockPos) -> bool {
        match self.slots.get_mut(id.0) {
            Some(Some(p)) => {
                *p = pos;
                true
            }
            _ => false,
        }
    }

    pub fn remove(&mut self, id: LoaderId) -> bool {
        self.slots.get_mut(id.0).and_then(Option::take).is_some()
    }

    pub fn position(&self, id: LoaderId) -> Option<BlockPos> {
        self.slots.get(id.0).copied().flatten()
    }

    pub fn active(&self) -> impl Iterator<Item = BlockPos> + '_ {
        self.slots.iter().flatten().copied()
    }

    pub fn len(&self) -> usize {
        self.active().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every chunk some active loader claims, sorted and deduplicated.
    pub fn footprint(&self, radius: i32) -> Vec<ChunkCoord> {
        let offsets = ball_offsets(radius);
        let mut out: Vec<ChunkCoord> = self
            .active()
            .flat_map(|p| {
                let center = ChunkCoord::containing(p);
                offsets.iter().map(move |&(dx, dy, dz)| center.offset(dx, dy, dz))
            })
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ball_is_not_a_cube() {
        assert_eq!(ball_offsets(0), vec![(0, 0, 0)]);
        assert_eq!(ball_offsets(1).len(), 7);
        let r2 = ball_offsets(2);
        assert_eq!(r2.len(), 33);
        assert!(!r2.contains(&(2, 2, 0)));
        assert!(r2.contains(&(2, 0, 0)));
    }

    #[test]
    fn ball_at_max_radius_stays_inside_the_sphere() {
        let r = strata_world::MAX_RADIUS;
        let ball = ball_offsets(r);
        assert!(ball.contains(&(r, 0, 0)) && ball.contains(&(0, -r, 0)));
        assert!(!ball.contains(&(r, 1, 0)));
        assert!(ball.iter().all(|&(x, y, z)| x * x + y * y + z * z <= r * r));
    }

    #[test]
    fn slots_are_reused() {
        let mut l = ChunkLoaders::new(2);
        let a = l.create(BlockPos::new(0, 0, 0)).expect("slot");
        let b = l.create(BlockPos::new(1, 0, 0)).expect("slot");
        assert!(l.create(BlockPos::new(2, 0, 0)).is_none());
        assert!(l.remove(a));
        assert!(!l.remove(a));
        assert!(!l.update(a, BlockPos::new(5, 5, 5)));
        let c = l.create(BlockPos::new(3, 0, 0)).expect("slot");
        assert_eq!(c, a);
        assert!(l.update(b, BlockPos::new(40, 0, 0)));
        assert_eq!(l.position(b), Some(BlockPos::new(40, 0, 0)));
    }

    #[test]
    fn overlapping_footprints_dedupe() {
        let mut l = ChunkLoaders::new(4);
        l.create(BlockPos::new(1, 1, 1));
        l.create(BlockPos::new(2, 2, 2));
        assert_eq!(l.footprint(1).len(), 7);
        l.create(BlockPos::new(17, 1, 1));
        // Two 7-chunk balls one chunk apart share two chunks.
        assert_eq!(l.footprint(1).len(), 12);
    }
}
