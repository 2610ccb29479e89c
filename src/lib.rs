//! Siltbox - a chunked, destructible 2D sandbox world engine.
//!
//! The world is an unbounded grid of material cells, split into 64x64
//! chunks that are generated on demand from a seed, simulated by a
//! falling-sand cellular automaton, and rendered through a cached
//! marching-squares contour extractor. Player edits are the only state
//! that persists: they live in a modification overlay replayed on top
//! of regenerated terrain.
//!
//! [`world::World`] is the single entry point for embedding:
//!
//! ```
//! use glam::IVec2;
//! use siltbox::prelude::*;
//!
//! let mut world = World::new(42);
//! world.set_view_window(IVec2::ZERO, 2);
//! world.apply_modification(IVec2::new(11, 101), MaterialId::SAND)?;
//! while !world.is_settled() {
//!     world.tick()?;
//! }
//! # Ok::<(), siltbox::WorldError>(())
//! ```

pub mod error;
pub mod render;
pub mod simulation;
pub mod world;

pub use error::WorldError;

pub mod prelude {
    pub use crate::error::WorldError;
    pub use crate::render::{ContourCache, ContourMesh};
    pub use crate::simulation::{MaterialId, MaterialKind, Materials, TickStats};
    pub use crate::world::{Cell, Chunk, ChunkStore, World, CHUNK_SIZE};
}
