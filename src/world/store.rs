//! Chunk store - chunk lifecycle: lazy creation, overlay replay,
//! modification recording, and radius-based eviction
//!
//! The store is the sole owner of chunk membership. The automaton and
//! the contour cache only borrow chunks for the duration of an
//! operation.

use ahash::AHashMap;
use glam::IVec2;

use super::chunk::{world_to_chunk, Cell, Chunk};
use super::generation::TerrainGenerator;
use super::overlay::ModificationOverlay;
use super::persistence::OverlayStore;

/// Chunks this far beyond the load radius are kept to avoid
/// load/evict thrash at the boundary
pub const EVICTION_HYSTERESIS: i32 = 1;

pub struct ChunkStore {
    /// Loaded chunks, keyed by chunk coordinates
    chunks: AHashMap<IVec2, Chunk>,

    generator: TerrainGenerator,

    /// Authoritative record of player-caused deltas. Disk flushes are
    /// durability only; eviction never loses an edit held here.
    overlay: ModificationOverlay,

    /// Monotonic access clock for last-access stamping
    clock: u64,
}

impl ChunkStore {
    pub fn new(seed: u64) -> Self {
        Self::with_overlay(seed, ModificationOverlay::new())
    }

    pub fn with_overlay(seed: u64, overlay: ModificationOverlay) -> Self {
        Self {
            chunks: AHashMap::new(),
            generator: TerrainGenerator::new(seed),
            overlay,
            clock: 0,
        }
    }

    pub fn seed(&self) -> u64 {
        self.generator.seed
    }

    pub fn overlay(&self) -> &ModificationOverlay {
        &self.overlay
    }

    pub fn chunks(&self) -> &AHashMap<IVec2, Chunk> {
        &self.chunks
    }

    pub fn chunks_mut(&mut self) -> &mut AHashMap<IVec2, Chunk> {
        &mut self.chunks
    }

    pub fn get(&self, coord: IVec2) -> Option<&Chunk> {
        self.chunks.get(&coord)
    }

    pub fn contains(&self, coord: IVec2) -> bool {
        self.chunks.contains_key(&coord)
    }

    pub fn loaded_count(&self) -> usize {
        self.chunks.len()
    }

    /// Get the live chunk for a coordinate, creating it on demand by
    /// generating terrain and replaying the overlay deltas for it
    pub fn acquire(&mut self, coord: IVec2) -> &mut Chunk {
        self.clock += 1;
        let clock = self.clock;
        let generator = &self.generator;
        let overlay = &self.overlay;

        let chunk = self.chunks.entry(coord).or_insert_with(|| {
            let mut chunk = generator.generate_chunk(coord);
            let mut replayed = 0;
            for (world, material_id) in overlay.entries_for_chunk(coord) {
                let (_, local_x, local_y) = world_to_chunk(world);
                chunk.set_material(local_x, local_y, material_id);
                replayed += 1;
            }
            log::debug!(
                "[GEN] chunk ({}, {}) generated, {} overlay cells replayed",
                coord.x,
                coord.y,
                replayed
            );
            chunk
        });

        chunk.last_access = clock;
        chunk
    }

    /// Material at a world coordinate, loading the owning chunk if
    /// necessary
    pub fn query_material(&mut self, world: IVec2) -> u16 {
        let (coord, local_x, local_y) = world_to_chunk(world);
        self.acquire(coord).material(local_x, local_y)
    }

    /// Whole cell at a world coordinate (material + flags)
    pub fn cell_at(&mut self, world: IVec2) -> Cell {
        let (coord, local_x, local_y) = world_to_chunk(world);
        self.acquire(coord).get(local_x, local_y)
    }

    /// The single mutation entry point for mining/placing. Records the
    /// delta in the overlay when the cell now differs from its natural
    /// value, or drops the entry when the write restores it.
    pub fn apply_modification(&mut self, world: IVec2, material_id: u16) {
        let natural = self.generator.material_at(world.x, world.y);
        let (coord, local_x, local_y) = world_to_chunk(world);

        let chunk = self.acquire(coord);
        if chunk.material(local_x, local_y) == material_id {
            return;
        }
        chunk.set_material(local_x, local_y, material_id);
        chunk.dirty = true;

        if material_id == natural {
            self.overlay.remove(world);
        } else {
            self.overlay.set(world, material_id);
        }
    }

    /// Evict every loaded chunk farther (Chebyshev) than
    /// radius + hysteresis from the center chunk, flushing overlay
    /// deltas first. Returns the evicted coordinates so render caches
    /// can drop their entries.
    ///
    /// A flush failure is a soft fail: dirty chunks stay loaded and the
    /// flush is retried on the next eviction opportunity.
    pub fn release_outside(
        &mut self,
        center_chunk: IVec2,
        radius: i32,
        persistence: Option<&OverlayStore>,
    ) -> Vec<IVec2> {
        let limit = radius + EVICTION_HYSTERESIS;
        let to_evict: Vec<IVec2> = self
            .chunks
            .keys()
            .filter(|coord| {
                let dx = (coord.x - center_chunk.x).abs();
                let dy = (coord.y - center_chunk.y).abs();
                dx.max(dy) > limit
            })
            .copied()
            .collect();

        if to_evict.is_empty() {
            return Vec::new();
        }

        let any_dirty = to_evict
            .iter()
            .any(|coord| self.chunks.get(coord).is_some_and(|c| c.dirty));

        let mut flushed = true;
        if any_dirty {
            if let Some(persistence) = persistence {
                match persistence.save_overlay(self.generator.seed, &self.overlay) {
                    Ok(()) => {
                        // The overlay file now reflects every delta
                        for chunk in self.chunks.values_mut() {
                            chunk.dirty = false;
                        }
                    }
                    Err(e) => {
                        log::error!("[SAVE] overlay flush failed, keeping dirty chunks: {:#}", e);
                        flushed = false;
                    }
                }
            }
            // Without persistence the in-memory overlay already retains
            // the deltas; eviction loses nothing.
        }

        let mut evicted = Vec::new();
        for coord in to_evict {
            if !flushed && self.chunks.get(&coord).is_some_and(|c| c.dirty) {
                continue;
            }
            self.chunks.remove(&coord);
            log::debug!("[EVICT] chunk ({}, {})", coord.x, coord.y);
            evicted.push(coord);
        }
        evicted
    }
}
