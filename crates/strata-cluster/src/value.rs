use strata_chunk::Chunk;

use crate::arena::ChunkHandle;

/// How far generation of a chunk has progressed. Only ever moves upward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LoadLevel {
    /// Slot exists so light work can be queued; blocks are not generated.
    None,
    /// Terrain generated, not decorated.
    Partial,
    /// Decorated and lightable.
    Total,
}

/// Why a chunk is being retained across the current tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReloadState {
    /// Kept alive by the origin chunk whose decoration reached into it.
    Child,
    /// Claimed by a loader this tick.
    TopReload,
    /// Unclaimed; freed by the next sweep unless claimed first.
    TopUnload,
    /// Parent was freed; freed in the same sweep.
    Tombstone,
}

/// Upper bound on decoration dependents: every other chunk of a 3x3x3 window.
pub const MAX_CHILDREN: usize = 26;

pub struct ChunkValue {
    pub chunk: Chunk,
    load_level: LoadLevel,
    pub reload_state: ReloadState,
    children: Vec<ChunkHandle>,
    parent: Option<ChunkHandle>,
    /// Initial light seeding has run for this chunk.
    pub lit: bool,
}

impl ChunkValue {
    pub fn new(chunk: Chunk) -> Self {
        Self {
            chunk,
            load_level: LoadLevel::None,
            reload_state: ReloadState::TopUnload,
            children: Vec::new(),
            parent: None,
            lit: false,
        }
    }

    #[inline]
    pub fn load_level(&self) -> LoadLevel {
        self.load_level
    }

    /// Raises the load level. Panics if asked to move downward.
    pub fn raise_level(&mut self, level: LoadLevel) {
        assert!(
            level >= self.load_level,
            "chunk {} load level cannot drop from {:?} to {:?}",
            self.chunk.coord,
            self.load_level,
            level
        );
        self.load_level = level;
    }

    #[inline]
    pub fn is_total(&self) -> bool {
        self.load_level == LoadLevel::Total
    }

    #[inline]
    pub fn children(&self) -> &[ChunkHandle] {
        &self.children
    }

    #[inline]
    pub fn parent(&self) -> Option<ChunkHandle> {
        self.parent
    }

    pub(crate) fn set_parent(&mut self, parent: Option<ChunkHandle>) {
        self.parent = parent;
    }

    /// Records a decoration dependent. Duplicate handles are ignored; more
    /// than [`MAX_CHILDREN`] distinct dependents is a broken invariant.
    pub(crate) fn add_child(&mut self, h: ChunkHandle) {
        if self.children.contains(&h) {
            return;
        }
        assert!(
            self.children.len() < MAX_CHILDREN,
            "chunk {} exceeded {} decoration children",
            self.chunk.coord,
            MAX_CHILDREN
        );
        self.children.push(h);
    }

    pub(crate) fn remove_child(&mut self, h: ChunkHandle) {
        self.children.retain(|c| *c != h);
    }

    pub(crate) fn take_children(&mut self) -> Vec<ChunkHandle> {
        std::mem::take(&mut self.children)
    }
}
