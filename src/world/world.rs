//! World facade - ties the store, automaton, contour cache and
//! persistence together behind one handle

use glam::IVec2;

use crate::error::WorldError;
use crate::render::contour::{ContourCache, ContourMesh};
use crate::simulation::automaton::{MaterialAutomaton, TickStats};
use crate::simulation::materials::{MaterialKind, Materials};
use crate::world::chunk::chunk_of;
use crate::world::persistence::{OverlayStore, WorldMetadata};
use crate::world::store::ChunkStore;

pub struct World {
    pub materials: Materials,
    store: ChunkStore,
    automaton: MaterialAutomaton,
    contours: ContourCache,
    /// None for ephemeral worlds (tests, scratch sessions)
    persistence: Option<OverlayStore>,
    pub metadata: WorldMetadata,
}

impl World {
    /// Ephemeral world: nothing ever touches disk
    pub fn new(seed: u64) -> Self {
        Self {
            materials: Materials::new(),
            store: ChunkStore::new(seed),
            automaton: MaterialAutomaton::new(seed),
            contours: ContourCache::new(),
            persistence: None,
            metadata: WorldMetadata::new(seed),
        }
    }

    /// Open a named world, loading its overlay and metadata from disk.
    /// An existing world keeps its stored seed; `seed` only applies to
    /// a world created by this call.
    pub fn open(world_name: &str, seed: u64) -> Result<Self, WorldError> {
        let persistence = OverlayStore::new(world_name).map_err(WorldError::Persistence)?;
        let metadata = persistence.load_metadata(seed);
        let overlay = persistence.load_overlay(metadata.seed);
        let seed = metadata.seed;

        Ok(Self {
            materials: Materials::new(),
            store: ChunkStore::with_overlay(seed, overlay),
            automaton: MaterialAutomaton::new(seed),
            contours: ContourCache::new(),
            persistence: Some(persistence),
            metadata,
        })
    }

    pub fn seed(&self) -> u64 {
        self.store.seed()
    }

    /// Material at a world cell, loading the owning chunk on demand
    pub fn query_material(&mut self, world: IVec2) -> u16 {
        self.store.query_material(world)
    }

    /// True when an entity could stand in this cell (gas-class
    /// materials only; air included)
    pub fn is_occupiable(&mut self, world: IVec2) -> bool {
        let id = self.store.query_material(world);
        self.materials
            .get(id)
            .map_or(false, |def| def.kind == MaterialKind::Gas)
    }

    /// Mine (write air) or place a material at a world cell. The write
    /// is recorded in the overlay and the neighborhood is woken so
    /// unsupported material responds on the next tick.
    pub fn apply_modification(&mut self, world: IVec2, material_id: u16) -> Result<(), WorldError> {
        if self.materials.get(material_id).is_none() {
            return Err(WorldError::InvalidMaterial {
                id: material_id,
                x: world.x,
                y: world.y,
            });
        }
        self.store.apply_modification(world, material_id);
        self.automaton.wake_area(world);
        Ok(())
    }

    /// Keep a square of chunks around a center cell loaded and evict
    /// everything beyond it (plus hysteresis), dropping contour cache
    /// entries for whatever leaves memory
    pub fn set_view_window(&mut self, center: IVec2, radius_chunks: i32) {
        let center_chunk = chunk_of(center);
        for dy in -radius_chunks..=radius_chunks {
            for dx in -radius_chunks..=radius_chunks {
                self.store.acquire(center_chunk + IVec2::new(dx, dy));
            }
        }
        let evicted =
            self.store
                .release_outside(center_chunk, radius_chunks, self.persistence.as_ref());
        for coord in evicted {
            self.contours.evict_chunk(coord);
        }
    }

    /// Advance the simulation one tick
    pub fn tick(&mut self) -> Result<TickStats, WorldError> {
        self.automaton.step(&mut self.store, &self.materials)
    }

    /// True when no cell is scheduled for the next tick
    pub fn is_settled(&self) -> bool {
        self.automaton.is_settled()
    }

    /// Contour geometry for a chunk at a scale, loading the chunk if
    /// needed. Served from cache while the chunk's materials are
    /// unchanged.
    pub fn get_geometry(
        &mut self,
        chunk_coord: IVec2,
        scale: f32,
    ) -> Result<&ContourMesh, WorldError> {
        let chunk = self.store.acquire(chunk_coord);
        self.contours.get_geometry(chunk, &self.materials, scale)
    }

    /// Flush the overlay and metadata to disk. No-op for ephemeral
    /// worlds.
    pub fn save(&mut self) -> Result<(), WorldError> {
        let Some(persistence) = &self.persistence else {
            return Ok(());
        };
        persistence
            .save_overlay(self.store.seed(), self.store.overlay())
            .map_err(WorldError::Persistence)?;
        self.metadata.last_played = chrono::Local::now().to_rfc3339();
        persistence
            .save_metadata(&self.metadata)
            .map_err(WorldError::Persistence)?;
        for chunk in self.store.chunks_mut().values_mut() {
            chunk.dirty = false;
        }
        Ok(())
    }

    pub fn store(&self) -> &ChunkStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ChunkStore {
        &mut self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::MaterialId;

    #[test]
    fn test_is_occupiable() {
        let mut world = World::new(42);
        // Far above the surface: air
        assert!(world.is_occupiable(IVec2::new(0, 100)));
        // Deep underground, below the bedrock floor
        assert!(!world.is_occupiable(IVec2::new(0, -100)));
    }

    #[test]
    fn test_invalid_material_rejected_before_any_write() {
        let mut world = World::new(42);
        let target = IVec2::new(3, 100);

        let err = world.apply_modification(target, 999).unwrap_err();
        assert!(matches!(err, WorldError::InvalidMaterial { id: 999, .. }));
        assert!(world.store().overlay().is_empty());
    }

    #[test]
    fn test_view_window_loads_square_and_evicts_rest() {
        let mut world = World::new(42);
        world.set_view_window(IVec2::new(32, 32), 2);
        assert_eq!(world.store().loaded_count(), 25);

        // Recenter far away: the old window is gone, a new one loaded
        world.set_view_window(IVec2::new(32 + 64 * 100, 32), 2);
        assert_eq!(world.store().loaded_count(), 25);
        assert!(!world.store().contains(IVec2::ZERO));
        assert!(world.store().contains(IVec2::new(100, 0)));
    }

    #[test]
    fn test_mining_changes_geometry() {
        let mut world = World::new(42);
        let target = IVec2::new(5, -50);
        // Deep underground the cell is stone unless a cave crosses it;
        // toggle solidity either way
        let replacement = if world.query_material(target) == MaterialId::AIR {
            MaterialId::STONE
        } else {
            MaterialId::AIR
        };
        let before = world.get_geometry(IVec2::new(0, -1), 1.0).unwrap().clone();

        world.apply_modification(target, replacement).unwrap();
        let after = world.get_geometry(IVec2::new(0, -1), 1.0).unwrap().clone();

        assert_ne!(before, after);
    }

    #[test]
    fn test_placed_sand_falls_on_tick() {
        let mut world = World::new(42);
        let target = IVec2::new(11, 101);
        world.apply_modification(target, MaterialId::SAND).unwrap();

        world.tick().unwrap();
        assert_eq!(world.query_material(target), MaterialId::AIR);
        assert_eq!(world.query_material(IVec2::new(11, 100)), MaterialId::SAND);
        assert!(!world.is_settled());
    }
}
