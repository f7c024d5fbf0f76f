use strata_blocks::Block;
use strata_geom::{BlockPos, Vec3};

/// Seconds per world tick.
pub const TICK_DT: f32 = 1.0 / 20.0;
pub const GRAVITY: f32 = 20.0;
pub const TERMINAL_SPEED: f32 = 40.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityKind {
    Player,
    /// Dropped block waiting to be picked up.
    Item(Block),
}

#[derive(Clone, Debug)]
pub struct Entity {
    pub id: u64,
    pub kind: EntityKind,
    pub pos: Vec3,
    pub vel: Vec3,
    pub age: u32,
    pub on_ground: bool,
}

impl Entity {
    #[inline]
    pub fn is_item(&self) -> bool {
        matches!(self.kind, EntityKind::Item(_))
    }
}

/// Bounded entity list kept in spawn order. When full, spawning evicts the
/// oldest dropped item; players are never evicted.
pub struct EntityList {
    capacity: usize,
    entities: Vec<Entity>,
    next_id: u64,
}

impl EntityList {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "entity capacity must be positive");
        Self {
            capacity,
            entities: Vec::with_capacity(capacity),
            next_id: 1,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.entities.iter()
    }

    pub fn get(&self, id: u64) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }

    pub fn items(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.entities.iter().filter(|e| e.is_item())
    }

    /// Makes room for one entity. Returns false when the list is full of
    /// players.
    fn make_room(&mut self) -> bool {
        if self.entities.len() < self.capacity {
            return true;
        }
        match self.entities.iter().position(Entity::is_item) {
            Some(i) => {
                let evicted = self.entities.remove(i);
                log::debug!("entity list full, evicted item {}", evicted.id);
                true
            }
            None => false,
        }
    }

    fn push(&mut self, kind: EntityKind, pos: Vec3, vel: Vec3) -> Option<u64> {
        if !self.make_room() {
            return None;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.entities.push(Entity {
            id,
            kind,
            pos,
            vel,
            age: 0,
            on_ground: false,
        });
        Some(id)
    }

    pub fn spawn_player(&mut self, pos: Vec3) -> Option<u64> {
        self.push(EntityKind::Player, pos, Vec3::ZERO)
    }

    pub fn spawn_item(&mut self, block: Block, pos: Vec3, vel: Vec3) -> Option<u64> {
        self.push(EntityKind::Item(block), pos, vel)
    }

    pub fn remove(&mut self, id: u64) -> Option<Entity> {
        let i = self.entities.iter().position(|e| e.id == id)?;
        Some(self.entities.remove(i))
    }

    /// Advances items one tick. `ground` reports whether a cell is solid, or
    /// `None` where the world is not loaded; items there hold still.
    /// Returns the number of items that expired.
    pub fn step(&mut self, lifetime: u32, ground: impl Fn(BlockPos) -> Option<bool>) -> usize {
        let before = self.entities.len();
        for e in self.entities.iter_mut().filter(|e| e.is_item()) {
            e.age = e.age.saturating_add(1);
            let below = BlockPos::new(e.pos.x.floor() as i32, (e.pos.y - 0.01).floor() as i32, e.pos.z.floor() as i32);
            match ground(below) {
                None => continue,
                Some(true) if e.on_ground => continue,
                Some(false) => e.on_ground = false,
                Some(true) => {}
            }
            e.vel.y = (e.vel.y - GRAVITY * TICK_DT).max(-TERMINAL_SPEED);
            let next = e.pos + e.vel * TICK_DT;
            let cell = next.block();
            if e.vel.y < 0.0 && ground(cell) != Some(false) {
                e.pos = Vec3::new(next.x, (cell.y + 1) as f32, next.z);
                e.vel = Vec3::ZERO;
                e.on_ground = true;
            } else {
                e.pos = next;
            }
        }
        self.entities
            .retain(|e| !(e.is_item() && e.age >= lifetime));
        before - self.entities.len()
    }
}
