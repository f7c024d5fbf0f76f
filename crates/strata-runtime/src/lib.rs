//! World driver: chunk streaming, edits, entities and the hand-off of render
//! resources to the render thread.
#![forbid(unsafe_code)]

pub mod entities;
pub mod loaders;
pub mod shared;
pub mod source;
pub mod spsc;
pub mod world;

pub use entities::{Entity, EntityKind, EntityList};
pub use loaders::{ChunkLoaders, LoaderId, ball_offsets};
pub use shared::SharedHandle;
pub use source::WorldSource;
pub use spsc::{Consumer, MeshId, Producer, TeardownRequest};
pub use world::{BlockInfo, TickStats, World};
