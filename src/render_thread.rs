use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, bounded, select, unbounded};
use strata_runtime::{Consumer, MeshId, SharedHandle, TeardownRequest};

#[derive(Clone, Copy, Debug, Default)]
pub struct RenderStats {
    pub frames: u64,
    pub teardowns: u64,
}

/// Stand-in for the render thread: once per frame it drains teardown
/// requests and drops their handles, returning buffers to the pool when it
/// holds the last reference.
pub struct RenderThread {
    stop: Sender<()>,
    join: JoinHandle<RenderStats>,
}

fn drain(rx: &Consumer<TeardownRequest>, stats: &mut RenderStats) {
    for req in rx.drain() {
        log::trace!("teardown mesh {:?} for chunk {}", req.handle.get(), req.coord);
        stats.teardowns += 1;
    }
}

impl RenderThread {
    pub fn spawn(rx: Consumer<TeardownRequest>, frame: Duration) -> Self {
        let (stop, stop_rx) = bounded::<()>(1);
        let join = thread::Builder::new()
            .name("strata-render".into())
            .spawn(move || {
                let mut stats = RenderStats::default();
                loop {
                    select! {
                        recv(stop_rx) -> _ => {
                            drain(&rx, &mut stats);
                            break;
                        },
                        default(frame) => {
                            stats.frames += 1;
                            drain(&rx, &mut stats);
                        },
                    }
                }
                stats
            })
            .expect("render thread");
        Self { stop, join }
    }

    /// Stops the thread after a final drain.
    pub fn finish(self) -> RenderStats {
        let _ = self.stop.send(());
        match self.join.join() {
            Ok(stats) => stats,
            Err(_) => {
                log::error!("render thread panicked");
                RenderStats::default()
            }
        }
    }
}

/// Buffer ids handed out to meshes. Released ids come back over a channel
/// from whichever thread drops the last handle.
pub struct MeshPool {
    next: u32,
    free_tx: Sender<u32>,
    free_rx: Receiver<u32>,
    recycled: u64,
}

impl Default for MeshPool {
    fn default() -> Self {
        Self::new()
    }
}

impl MeshPool {
    pub fn new() -> Self {
        let (free_tx, free_rx) = unbounded();
        Self {
            next: 0,
            free_tx,
            free_rx,
            recycled: 0,
        }
    }

    pub fn allocate(&mut self) -> SharedHandle<MeshId> {
        let id = match self.free_rx.try_recv() {
            Ok(id) => {
                self.recycled += 1;
                id
            }
            Err(_) => {
                let id = self.next;
                self.next += 1;
                id
            }
        };
        let tx = self.free_tx.clone();
        SharedHandle::new(MeshId(id), move |m: &MeshId| {
            let _ = tx.send(m.0);
        })
    }

    #[inline]
    pub fn recycled(&self) -> u64 {
        self.recycled
    }

    /// Ids ever created.
    #[inline]
    pub fn allocated(&self) -> u32 {
        self.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_world::ChunkCoord;

    #[test]
    fn released_ids_are_reused() {
        let mut pool = MeshPool::new();
        let a = pool.allocate();
        let b = pool.allocate();
        assert_eq!((*a.get(), *b.get()), (MeshId(0), MeshId(1)));
        drop(a);
        let c = pool.allocate();
        assert_eq!(*c.get(), MeshId(0));
        assert_eq!(pool.recycled(), 1);
        assert_eq!(pool.allocated(), 2);
    }

    #[test]
    fn render_thread_releases_handles() {
        let mut pool = MeshPool::new();
        let (tx, rx) = strata_runtime::spsc::channel(4);
        let render = RenderThread::spawn(rx, Duration::from_millis(1));
        for i in 0..3 {
            let req = TeardownRequest {
                coord: ChunkCoord::new(i, 0, 0),
                handle: pool.allocate(),
            };
            assert!(tx.offer(req).is_ok());
        }
        let stats = render.finish();
        assert_eq!(stats.teardowns, 3);
        let reused: Vec<u32> = (0..3).map(|_| pool.allocate().get().0).collect();
        assert_eq!(pool.recycled(), 3);
        assert!(reused.iter().all(|id| *id < 3));
    }
}
