//! Bounded single-producer/single-consumer handoff from the world thread to
//! the render thread. Both ends are non-blocking.

use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError, bounded};
use strata_world::ChunkCoord;

use crate::shared::SharedHandle;

/// GPU-side buffer id owned by the render thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshId(pub u32);

/// Asks the render thread to drop its mesh for an unloaded chunk.
#[derive(Debug)]
pub struct TeardownRequest {
    pub coord: ChunkCoord,
    pub handle: SharedHandle<MeshId>,
}

pub struct Producer<T> {
    tx: Sender<T>,
}

pub struct Consumer<T> {
    rx: Receiver<T>,
}

/// Creates a ring of `capacity` slots. Panics unless `capacity` is a power
/// of two.
pub fn channel<T>(capacity: usize) -> (Producer<T>, Consumer<T>) {
    assert!(
        capacity.is_power_of_two(),
        "spsc capacity must be a power of two, got {capacity}"
    );
    let (tx, rx) = bounded(capacity);
    (Producer { tx }, Consumer { rx })
}

impl<T> Producer<T> {
    /// Publishes `item`, handing it back when the ring is full or the
    /// consumer is gone.
    pub fn offer(&self, item: T) -> Result<(), T> {
        self.tx.try_send(item).map_err(|e| match e {
            TrySendError::Full(v) | TrySendError::Disconnected(v) => v,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tx.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.tx.capacity().unwrap_or(0)
    }
}

impl<T> Consumer<T> {
    pub fn poll(&self) -> Option<T> {
        match self.rx.try_recv() {
            Ok(v) => Some(v),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Everything currently available.
    pub fn drain(&self) -> Vec<T> {
        self.rx.try_iter().collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
