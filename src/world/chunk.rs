//! Chunk - 64x64 region of cells
//!
//! Coordinate convention, used everywhere in the crate: world y
//! increases upward. "Down" is `y - 1`; powders and fluids fall toward
//! smaller y, gases rise toward larger y. Chunk (0,0) spans world cells
//! (0,0)..(63,63).

use crate::simulation::MaterialId;
use glam::IVec2;

pub const CHUNK_SIZE: usize = 64;
pub const CHUNK_AREA: usize = CHUNK_SIZE * CHUNK_SIZE;

/// A single cell in the world
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct Cell {
    /// Material type (0 = air)
    pub material_id: u16,
    /// State flags (active, updated this tick)
    pub flags: u8,
}

impl Cell {
    pub const AIR: Cell = Cell {
        material_id: 0,
        flags: 0,
    };

    pub fn new(material_id: u16) -> Self {
        Self {
            material_id,
            flags: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.material_id == MaterialId::AIR
    }

    pub fn is_active(&self) -> bool {
        self.flags & cell_flags::ACTIVE != 0
    }

    pub fn has_flag(&self, flag: u8) -> bool {
        self.flags & flag != 0
    }
}

/// Flag bits for cell state
pub mod cell_flags {
    /// Needs evaluation this tick; cleared when no legal move exists
    pub const ACTIVE: u8 = 1 << 0;
    /// Already moved this tick
    pub const UPDATED: u8 = 1 << 1;
}

/// Convert world cell coordinates to chunk coordinate + local offset
pub fn world_to_chunk(world: IVec2) -> (IVec2, usize, usize) {
    let chunk_x = world.x.div_euclid(CHUNK_SIZE as i32);
    let chunk_y = world.y.div_euclid(CHUNK_SIZE as i32);
    let local_x = world.x.rem_euclid(CHUNK_SIZE as i32) as usize;
    let local_y = world.y.rem_euclid(CHUNK_SIZE as i32) as usize;
    (IVec2::new(chunk_x, chunk_y), local_x, local_y)
}

/// Chunk coordinate owning a world cell coordinate
pub fn chunk_of(world: IVec2) -> IVec2 {
    world_to_chunk(world).0
}

/// A 64x64 region of the world
#[derive(Clone)]
pub struct Chunk {
    /// Chunk coordinates (in chunk space, not cell space)
    pub coord: IVec2,

    /// Cell data, row-major order. Index = y * CHUNK_SIZE + x
    cells: [Cell; CHUNK_AREA],

    /// Version stamp, incremented on every material mutation.
    /// Flag-only writes do not bump it, so render caches survive
    /// activity bookkeeping.
    pub generation: u64,

    /// Store clock value of the last acquire (eviction ordering)
    pub last_access: u64,

    /// Whether this chunk carries overlay deltas not yet flushed to disk
    pub dirty: bool,
}

impl Chunk {
    pub fn new(coord: IVec2) -> Self {
        Self {
            coord,
            cells: [Cell::AIR; CHUNK_AREA],
            generation: 0,
            last_access: 0,
            dirty: false,
        }
    }

    /// Get cell at local coordinates (0-63, 0-63)
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Cell {
        debug_assert!(x < CHUNK_SIZE && y < CHUNK_SIZE);
        self.cells[y * CHUNK_SIZE + x]
    }

    /// Get material ID at local coordinates
    #[inline]
    pub fn material(&self, x: usize, y: usize) -> u16 {
        self.get(x, y).material_id
    }

    /// Replace a whole cell (material + flags)
    #[inline]
    pub fn set_cell(&mut self, x: usize, y: usize, cell: Cell) {
        debug_assert!(x < CHUNK_SIZE && y < CHUNK_SIZE);
        self.cells[y * CHUNK_SIZE + x] = cell;
        self.generation += 1;
    }

    /// Set the material at local coordinates, preserving flags
    #[inline]
    pub fn set_material(&mut self, x: usize, y: usize, material_id: u16) {
        debug_assert!(x < CHUNK_SIZE && y < CHUNK_SIZE);
        self.cells[y * CHUNK_SIZE + x].material_id = material_id;
        self.generation += 1;
    }

    /// Swap two cells (the automaton's move/displacement primitive)
    #[inline]
    pub fn swap_cells(&mut self, x1: usize, y1: usize, x2: usize, y2: usize) {
        let idx1 = y1 * CHUNK_SIZE + x1;
        let idx2 = y2 * CHUNK_SIZE + x2;
        self.cells.swap(idx1, idx2);
        self.generation += 1;
    }

    /// Set or clear the ACTIVE flag. Does not bump the generation
    /// counter: activity bookkeeping must not invalidate render caches.
    #[inline]
    pub fn set_active(&mut self, x: usize, y: usize, active: bool) {
        let cell = &mut self.cells[y * CHUNK_SIZE + x];
        if active {
            cell.flags |= cell_flags::ACTIVE;
        } else {
            cell.flags &= !cell_flags::ACTIVE;
        }
    }

    /// Add flag bits to a cell without touching the generation counter
    #[inline]
    pub fn add_flags(&mut self, x: usize, y: usize, flags: u8) {
        self.cells[y * CHUNK_SIZE + x].flags |= flags;
    }

    /// Clear all "moved this tick" flags
    pub fn clear_update_flags(&mut self) {
        for cell in &mut self.cells {
            cell.flags &= !cell_flags::UPDATED;
        }
    }

    /// Count non-air cells (for save/load logging)
    pub fn count_non_air(&self) -> usize {
        self.cells
            .iter()
            .filter(|c| c.material_id != MaterialId::AIR)
            .count()
    }

    /// Raw cell slice for bulk readers
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_access() {
        let mut chunk = Chunk::new(IVec2::ZERO);

        chunk.set_material(10, 20, 5);
        assert_eq!(chunk.get(10, 20).material_id, 5);

        chunk.set_material(0, 0, 1);
        chunk.set_material(63, 63, 2);
        assert_eq!(chunk.get(0, 0).material_id, 1);
        assert_eq!(chunk.get(63, 63).material_id, 2);
    }

    #[test]
    fn test_generation_counter_bumps_on_material_writes() {
        let mut chunk = Chunk::new(IVec2::ZERO);
        let before = chunk.generation;

        chunk.set_material(5, 5, 1);
        assert_eq!(chunk.generation, before + 1);

        chunk.swap_cells(5, 5, 6, 5);
        assert_eq!(chunk.generation, before + 2);

        chunk.set_cell(7, 7, Cell::new(2));
        assert_eq!(chunk.generation, before + 3);
    }

    #[test]
    fn test_flag_writes_do_not_bump_generation() {
        let mut chunk = Chunk::new(IVec2::ZERO);
        chunk.set_material(5, 5, 1);
        let gen = chunk.generation;

        chunk.set_active(5, 5, true);
        chunk.add_flags(5, 5, cell_flags::UPDATED);
        chunk.set_active(5, 5, false);
        chunk.clear_update_flags();

        assert_eq!(chunk.generation, gen);
        assert!(!chunk.get(5, 5).is_active());
    }

    #[test]
    fn test_world_to_chunk_positive() {
        let (chunk, lx, ly) = world_to_chunk(IVec2::new(100, 200));
        assert_eq!(chunk, IVec2::new(1, 3));
        assert_eq!(lx, 36);
        assert_eq!(ly, 8);
    }

    #[test]
    fn test_world_to_chunk_negative() {
        let (chunk, lx, ly) = world_to_chunk(IVec2::new(-100, -200));
        assert_eq!(chunk, IVec2::new(-2, -4));
        assert_eq!(lx, 28);
        assert_eq!(ly, 56);
    }

    #[test]
    fn test_world_to_chunk_boundary() {
        let (chunk, lx, ly) = world_to_chunk(IVec2::new(64, 128));
        assert_eq!(chunk, IVec2::new(1, 2));
        assert_eq!(lx, 0);
        assert_eq!(ly, 0);
    }
}
