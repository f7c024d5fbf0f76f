//! Generational slot storage for chunk values.

use crate::value::ChunkValue;

/// Stable identity of a live chunk. A handle outlives its chunk safely: once
/// the slot is reused the generation no longer matches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkHandle {
    index: u32,
    generation: u32,
}

impl ChunkHandle {
    #[inline]
    pub fn index(self) -> usize {
        self.index as usize
    }
}

struct Entry {
    generation: u32,
    value: Option<ChunkValue>,
}

#[derive(Default)]
pub struct ChunkArena {
    entries: Vec<Entry>,
    free: Vec<u32>,
    len: usize,
}

impl ChunkArena {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn insert(&mut self, value: ChunkValue) -> ChunkHandle {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let e = &mut self.entries[index as usize];
            debug_assert!(e.value.is_none());
            e.value = Some(value);
            return ChunkHandle {
                index,
                generation: e.generation,
            };
        }
        let index = u32::try_from(self.entries.len()).unwrap_or_else(|_| panic!("chunk arena exhausted"));
        self.entries.push(Entry {
            generation: 0,
            value: Some(value),
        });
        ChunkHandle {
            index,
            generation: 0,
        }
    }

    #[inline]
    pub fn contains(&self, h: ChunkHandle) -> bool {
        self.get(h).is_some()
    }

    #[inline]
    pub fn get(&self, h: ChunkHandle) -> Option<&ChunkValue> {
        self.entries
            .get(h.index as usize)
            .filter(|e| e.generation == h.generation)
            .and_then(|e| e.value.as_ref())
    }

    #[inline]
    pub fn get_mut(&mut self, h: ChunkHandle) -> Option<&mut ChunkValue> {
        self.entries
            .get_mut(h.index as usize)
            .filter(|e| e.generation == h.generation)
            .and_then(|e| e.value.as_mut())
    }

    pub fn remove(&mut self, h: ChunkHandle) -> Option<ChunkValue> {
        let e = self.entries.get_mut(h.index as usize)?;
        if e.generation != h.generation {
            return None;
        }
        let value = e.value.take()?;
        e.generation = e.generation.wrapping_add(1);
        self.free.push(h.index);
        self.len -= 1;
        Some(value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ChunkHandle, &ChunkValue)> + '_ {
        self.entries.iter().enumerate().filter_map(|(i, e)| {
            e.value.as_ref().map(|v| {
                (
                    ChunkHandle {
                        index: i as u32,
                        generation: e.generation,
                    },
                    v,
                )
            })
        })
    }
}
