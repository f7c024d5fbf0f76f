use std::sync::{Arc, Mutex, MutexGuard};

use hashbrown::HashMap;
use strata_blocks::Block;
use strata_cluster::{ChunkSource, Populated};
use strata_io::{ClusterFile, PersistError, SaveDir};
use strata_world::{Biome, ChunkCoord, ClusterKey, TerrainGen};

/// Terrain generator layered under an optional save directory. Chunks found
/// in a cluster file are restored instead of generated.
pub struct WorldSource {
    terrain: TerrainGen,
    save: Option<SaveDir>,
    clusters: Mutex<HashMap<ClusterKey, Option<Arc<ClusterFile>>>>,
}

impl WorldSource {
    pub fn new(terrain: TerrainGen, save: Option<SaveDir>) -> Self {
        Self {
            terrain,
            save,
            clusters: Mutex::new(HashMap::new()),
        }
    }

    #[inline]
    pub fn terrain(&self) -> &TerrainGen {
        &self.terrain
    }

    #[inline]
    pub fn save_dir(&self) -> Option<&SaveDir> {
        self.save.as_ref()
    }

    fn cache(&self) -> MutexGuard<'_, HashMap<ClusterKey, Option<Arc<ClusterFile>>>> {
        self.clusters.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn cluster(&self, save: &SaveDir, key: ClusterKey) -> Option<Arc<ClusterFile>> {
        if let Some(hit) = self.cache().get(&key) {
            return hit.clone();
        }
        let loaded = match save.read(key) {
            Ok(f) => f.map(Arc::new),
            Err(e) => {
                log::warn!("ignoring unreadable cluster ({}, {}, {}): {e}", key.x, key.y, key.z);
                None
            }
        };
        self.cache().insert(key, loaded.clone());
        loaded
    }

    fn restore(&self, coord: ChunkCoord) -> Option<Box<[Block]>> {
        let save = self.save.as_ref()?;
        let file = self.cluster(save, coord.cluster_key())?;
        file.get(coord.slot_index()).map(Into::into)
    }

    /// Writes chunks to their cluster files and refreshes the read cache.
    /// Returns the number of chunks written; zero without a save directory.
    pub fn store(&self, chunks: &[(ChunkCoord, &[Block])]) -> Result<usize, PersistError> {
        let Some(save) = self.save.as_ref() else {
            return Ok(0);
        };
        if chunks.is_empty() {
            return Ok(0);
        }
        let written = save.save_chunks(chunks.iter().copied())?;
        let mut cache = self.cache();
        for (key, file) in written {
            cache.insert(key, Some(Arc::new(file)));
        }
        Ok(chunks.len())
    }
}

impl ChunkSource for WorldSource {
    fn populate(&self, coord: ChunkCoord) -> Populated {
        match self.restore(coord) {
            Some(blocks) => Populated {
                blocks,
                restored: true,
            },
            None => self.terrain.populate(coord),
        }
    }

    fn surface_height(&self, x: i32, z: i32) -> i32 {
        self.terrain.surface_height(x, z)
    }

    fn biome_at(&self, x: i32, z: i32) -> Biome {
        self.terrain.biome_at(x, z)
    }
}
