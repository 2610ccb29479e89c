//! World state: chunks, generation, the modification overlay and its
//! persistence

pub mod chunk;
pub mod generation;
pub mod overlay;
pub mod persistence;
pub mod store;
#[allow(clippy::module_inception)]
pub mod world;

pub use chunk::{Cell, Chunk, CHUNK_SIZE};
pub use generation::TerrainGenerator;
pub use overlay::ModificationOverlay;
pub use persistence::{OverlayStore, WorldMetadata};
pub use store::ChunkStore;
pub use world::World;
