//! Per-cluster save files.
//!
//! Layout (little endian): `STCL` magic, `u16` version, `u16` reserved, then
//! one record per cluster slot: a validity byte followed by the chunk's block
//! ids, or zeros when the slot is empty.
#![forbid(unsafe_code)]

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use hashbrown::HashMap;
use strata_blocks::Block;
use strata_world::{CHUNK_VOLUME, CLUSTER_SLOTS, ChunkCoord, ClusterKey};
use thiserror::Error;

pub const MAGIC: [u8; 4] = *b"STCL";
pub const VERSION: u16 = 1;
pub const HEADER_LEN: usize = 8;
pub const RECORD_LEN: usize = 1 + CHUNK_VOLUME;
pub const FILE_LEN: usize = HEADER_LEN + CLUSTER_SLOTS * RECORD_LEN;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("not a cluster file (magic {0:?})")]
    BadMagic([u8; 4]),
    #[error("unsupported cluster file version {0}")]
    UnsupportedVersion(u16),
    #[error("cluster file truncated: expected {expected} bytes, found {found}")]
    Truncated { expected: usize, found: usize },
    #[error("unknown block id {id} in slot {slot}")]
    UnknownBlock { id: u8, slot: usize },
}

impl PersistError {
    /// The file exists but its contents cannot be decoded.
    pub fn is_corrupt(&self) -> bool {
        !matches!(self, PersistError::Io { .. })
    }
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> PersistError + '_ {
    move |source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Decoded contents of one cluster's save file.
#[derive(Clone, Debug, PartialEq)]
pub struct ClusterFile {
    slots: Vec<Option<Box<[Block]>>>,
}

impl Default for ClusterFile {
    fn default() -> Self {
        Self::new()
    }
}

impl ClusterFile {
    pub fn new() -> Self {
        Self {
            slots: vec![None; CLUSTER_SLOTS],
        }
    }

    pub fn get(&self, slot: usize) -> Option<&[Block]> {
        self.slots[slot].as_deref()
    }

    pub fn set(&mut self, slot: usize, blocks: &[Block]) {
        assert_eq!(blocks.len(), CHUNK_VOLUME, "chunk block array has wrong length");
        self.slots[slot] = Some(blocks.into());
    }

    pub fn clear(&mut self, slot: usize) {
        self.slots[slot] = None;
    }

    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(FILE_LEN);
        out.extend_from_slice(&MAGIC);
        out.extend_from_slice(&VERSION.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        for slot in &self.slots {
            match slot {
                Some(blocks) => {
                    out.push(1);
                    out.extend(blocks.iter().map(|b| b.id()));
                }
                None => {
                    out.push(0);
                    out.resize(out.len() + CHUNK_VOLUME, 0);
                }
            }
        }
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, PersistError> {
        if bytes.len() < HEADER_LEN {
            return Err(PersistError::Truncated {
                expected: FILE_LEN,
                found: bytes.len(),
            });
        }
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[..4]);
        if magic != MAGIC {
            return Err(PersistError::BadMagic(magic));
        }
        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != VERSION {
            return Err(PersistError::UnsupportedVersion(version));
        }
        if bytes.len() < FILE_LEN {
            return Err(PersistError::Truncated {
                expected: FILE_LEN,
                found: bytes.len(),
            });
        }
        let mut file = Self::new();
        for (slot, record) in bytes[HEADER_LEN..FILE_LEN].chunks_exact(RECORD_LEN).enumerate() {
            if record[0] == 0 {
                continue;
            }
            let blocks = record[1..]
                .iter()
                .map(|id| Block::from_id(*id).ok_or(PersistError::UnknownBlock { id: *id, slot }))
                .collect::<Result<Box<[Block]>, _>>()?;
            file.slots[slot] = Some(blocks);
        }
        Ok(file)
    }
}

pub fn cluster_path(dir: &Path, key: ClusterKey) -> PathBuf {
    dir.join(format!("cluster_{}_{}_{}.bin", key.x, key.y, key.z))
}

/// Reads a cluster file; a missing file is `Ok(None)`.
pub fn read_cluster(dir: &Path, key: ClusterKey) -> Result<Option<ClusterFile>, PersistError> {
    let path = cluster_path(dir, key);
    let bytes = match fs::read(&path) {
        Ok(b) => b,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(io_err(&path)(e)),
    };
    ClusterFile::decode(&bytes).map(Some)
}

/// Writes through a temporary sibling and renames it into place.
pub fn write_cluster(dir: &Path, key: ClusterKey, file: &ClusterFile) -> Result<(), PersistError> {
    fs::create_dir_all(dir).map_err(io_err(dir))?;
    let path = cluster_path(dir, key);
    let tmp = path.with_extension("bin.tmp");
    fs::write(&tmp, file.encode()).map_err(io_err(&tmp))?;
    fs::rename(&tmp, &path).map_err(io_err(&path))?;
    Ok(())
}

/// Save directory holding one file per cluster.
#[derive(Clone, Debug)]
pub struct SaveDir {
    root: PathBuf,
}

impl SaveDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn read(&self, key: ClusterKey) -> Result<Option<ClusterFile>, PersistError> {
        read_cluster(&self.root, key)
    }

    pub fn load_chunk(&self, coord: ChunkCoord) -> Result<Option<Box<[Block]>>, PersistError> {
        Ok(self
            .read(coord.cluster_key())?
            .and_then(|f| f.get(coord.slot_index()).map(Into::into)))
    }

    /// Renames an undecodable cluster file out of the way so a fresh one can
    /// be written in its place.
    fn set_aside(&self, key: ClusterKey, err: &PersistError) -> Result<ClusterFile, PersistError> {
        let path = cluster_path(&self.root, key);
        let aside = path.with_extension("bin.corrupt");
        log::warn!(
            "replacing unreadable cluster file {} ({err}); old copy kept as {}",
            path.display(),
            aside.display()
        );
        fs::rename(&path, &aside).map_err(io_err(&path))?;
        Ok(ClusterFile::new())
    }

    /// Merges chunks into their cluster files, one read-modify-write per
    /// cluster. Returns the updated files.
    pub fn save_chunks<'b>(
        &self,
        chunks: impl IntoIterator<Item = (ChunkCoord, &'b [Block])>,
    ) -> Result<Vec<(ClusterKey, ClusterFile)>, PersistError> {
        let mut by_cluster: HashMap<ClusterKey, Vec<(usize, &[Block])>> = HashMap::new();
        for (coord, blocks) in chunks {
            by_cluster
                .entry(coord.cluster_key())
                .or_default()
                .push((coord.slot_index(), blocks));
        }
        let mut written = Vec::with_capacity(by_cluster.len());
        for (key, slots) in by_cluster {
            let mut file = match self.read(key) {
                Ok(f) => f.unwrap_or_default(),
                Err(e) if e.is_corrupt() => self.set_aside(key, &e)?,
                Err(e) => return Err(e),
            };
            for (slot, blocks) in slots {
                file.set(slot, blocks);
            }
            write_cluster(&self.root, key, &file)?;
            log::debug!("wrote cluster ({}, {}, {}) with {} chunks", key.x, key.y, key.z, file.occupied());
            written.push((key, file));
        }
        Ok(written)
    }
}
