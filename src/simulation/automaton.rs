//! Falling-sand cellular automaton
//!
//! One `step` advances every loaded chunk by a single tick. Powders
//! fall and pile, fluids fall and spread, gases rise and dissipate,
//! statics never move. Activity is tracked per cell so a settled world
//! costs nothing: only woken cells are evaluated, and a cell with no
//! legal move deactivates itself.
//!
//! Lateral symmetry: each tick visits only columns of one x-parity,
//! alternating between ticks, so left and right neighbors of a falling
//! column get equal treatment over any two consecutive ticks.

use ahash::AHashSet;
use glam::IVec2;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;

use crate::error::WorldError;
use crate::simulation::materials::{MaterialDef, MaterialKind, Materials};
use crate::world::chunk::{cell_flags, world_to_chunk, Cell, CHUNK_SIZE};
use crate::world::store::ChunkStore;

/// Per-tick counters for diagnostics and convergence checks
#[derive(Clone, Copy, Debug, Default)]
pub struct TickStats {
    pub tick: u64,
    /// Cells activated from the wake set at tick start
    pub woken: u64,
    /// Active cells evaluated this tick
    pub visited: u64,
    /// Cells that moved (or dissipated) this tick
    pub moved: u64,
    /// Wake entries pending for the next tick
    pub pending: u64,
}

/// The simulation driver. Owns the wake sets and the tick counter;
/// borrows chunks from the store per operation.
pub struct MaterialAutomaton {
    /// Cells to activate at the start of the next step
    wake: AHashSet<IVec2>,
    /// Cells woken by moves during the current step
    next_wake: AHashSet<IVec2>,
    tick: u64,
    seed: u64,
}

impl MaterialAutomaton {
    pub fn new(seed: u64) -> Self {
        Self {
            wake: AHashSet::new(),
            next_wake: AHashSet::new(),
            tick: 0,
            seed,
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// True when no cell is scheduled for evaluation
    pub fn is_settled(&self) -> bool {
        self.wake.is_empty()
    }

    /// Wake the 3x3 neighborhood around a cell (external writes:
    /// mining, placing)
    pub fn wake_area(&mut self, world: IVec2) {
        for dy in -1..=1 {
            for dx in -1..=1 {
                self.wake.insert(world + IVec2::new(dx, dy));
            }
        }
    }

    fn wake_area_next(&mut self, world: IVec2) {
        for dy in -1..=1 {
            for dx in -1..=1 {
                self.next_wake.insert(world + IVec2::new(dx, dy));
            }
        }
    }

    /// Advance the simulation one tick over every loaded chunk.
    ///
    /// Chunks are swept in ascending (chunk_y, chunk_x) order and rows
    /// bottom-to-top, so a falling column settles one full step per
    /// tick. The per-tick RNG is reseeded from (seed, tick), which
    /// makes an entire run a pure function of the seed and the sequence
    /// of external modifications.
    pub fn step(
        &mut self,
        store: &mut ChunkStore,
        materials: &Materials,
    ) -> Result<TickStats, WorldError> {
        self.tick += 1;
        let parity = (self.tick % 2) as i32;
        let mut rng = Xoshiro256StarStar::seed_from_u64(self.seed ^ self.tick);
        let mut stats = TickStats {
            tick: self.tick,
            ..Default::default()
        };

        for chunk in store.chunks_mut().values_mut() {
            chunk.clear_update_flags();
        }

        for world in self.wake.drain() {
            let (coord, local_x, local_y) = world_to_chunk(world);
            // Wake targets in unloaded chunks are dropped; terrain there
            // regenerates settled
            if let Some(chunk) = store.chunks_mut().get_mut(&coord) {
                chunk.set_active(local_x, local_y, true);
                stats.woken += 1;
            }
        }

        let mut coords: Vec<IVec2> = store.chunks().keys().copied().collect();
        coords.sort_by_key(|c| (c.y, c.x));

        for coord in coords {
            let base = coord * CHUNK_SIZE as i32;
            for local_y in 0..CHUNK_SIZE {
                for local_x in 0..CHUNK_SIZE {
                    let world = IVec2::new(base.x + local_x as i32, base.y + local_y as i32);
                    let Some(cell) = store.get(coord).map(|c| c.get(local_x, local_y)) else {
                        continue;
                    };
                    if !cell.is_active() || cell.has_flag(cell_flags::UPDATED) {
                        continue;
                    }
                    if world.x.rem_euclid(2) != parity {
                        // Off-parity this tick; carry it so quiescence
                        // is only reported once both parities are clear
                        self.next_wake.insert(world);
                        continue;
                    }
                    stats.visited += 1;

                    if cell.is_empty() {
                        if let Some(chunk) = store.chunks_mut().get_mut(&coord) {
                            chunk.set_active(local_x, local_y, false);
                        }
                        continue;
                    }

                    let def = materials
                        .get(cell.material_id)
                        .ok_or_else(|| invalid_material(cell.material_id, world))?;

                    let moved = match def.kind {
                        MaterialKind::Static => false,
                        MaterialKind::Powder => self.update_powder(store, materials, world)?,
                        MaterialKind::Fluid => self.update_fluid(store, materials, world, def)?,
                        MaterialKind::Gas => {
                            self.update_gas(store, materials, world, def, &mut rng)?
                        }
                    };

                    if moved {
                        stats.moved += 1;
                    } else if def.kind == MaterialKind::Gas && def.dissipation > 0.0 {
                        // A cornered gas still dissipates; keep it
                        // scheduled until the roll converts it
                        self.next_wake.insert(world);
                    } else if let Some(chunk) = store.chunks_mut().get_mut(&coord) {
                        chunk.set_active(local_x, local_y, false);
                    }
                }
            }
        }

        self.wake = std::mem::take(&mut self.next_wake);
        stats.pending = self.wake.len() as u64;
        log::trace!(
            "tick {} - {} woken, {} visited, {} moved",
            self.tick,
            stats.woken,
            stats.visited,
            stats.moved
        );
        Ok(stats)
    }

    /// Down, then the two down-diagonals. The first diagonal side
    /// alternates with the tick so piles grow symmetrically.
    fn update_powder(
        &mut self,
        store: &mut ChunkStore,
        materials: &Materials,
        pos: IVec2,
    ) -> Result<bool, WorldError> {
        if self.try_move(store, materials, pos, pos + IVec2::NEG_Y)? {
            return Ok(true);
        }
        let first = self.first_side();
        for dx in [first, -first] {
            if self.try_move(store, materials, pos, pos + IVec2::new(dx, -1))? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Down, down-diagonals, then lateral spread up to flow_range
    fn update_fluid(
        &mut self,
        store: &mut ChunkStore,
        materials: &Materials,
        pos: IVec2,
        def: &MaterialDef,
    ) -> Result<bool, WorldError> {
        if self.try_move(store, materials, pos, pos + IVec2::NEG_Y)? {
            return Ok(true);
        }
        let first = self.first_side();
        for dx in [first, -first] {
            if self.try_move(store, materials, pos, pos + IVec2::new(dx, -1))? {
                return Ok(true);
            }
        }
        self.flow_lateral(store, materials, pos, def, first, -1)
    }

    /// Dissipation roll first, then the mirror of fluid movement: up,
    /// up-diagonals, lateral spread
    fn update_gas(
        &mut self,
        store: &mut ChunkStore,
        materials: &Materials,
        pos: IVec2,
        def: &MaterialDef,
        rng: &mut Xoshiro256StarStar,
    ) -> Result<bool, WorldError> {
        if def.dissipation > 0.0 && rng.random::<f32>() < def.dissipation {
            let (coord, local_x, local_y) = world_to_chunk(pos);
            if let Some(chunk) = store.chunks_mut().get_mut(&coord) {
                chunk.set_cell(local_x, local_y, Cell::AIR);
                self.wake_area_next(pos);
                return Ok(true);
            }
            return Ok(false);
        }

        if self.try_move(store, materials, pos, pos + IVec2::Y)? {
            return Ok(true);
        }
        let first = self.first_side();
        for dx in [first, -first] {
            if self.try_move(store, materials, pos, pos + IVec2::new(dx, 1))? {
                return Ok(true);
            }
        }
        self.flow_lateral(store, materials, pos, def, first, 1)
    }

    fn first_side(&self) -> i32 {
        if self.tick % 2 == 0 {
            -1
        } else {
            1
        }
    }

    /// Walk laterally up to flow_range cells through passable space,
    /// looking for a position the material could keep falling (or
    /// rising) from. No such position within range means no lateral
    /// move at all: a fluid on a flat floor stays put and settles
    /// instead of sloshing forever.
    fn flow_lateral(
        &mut self,
        store: &mut ChunkStore,
        materials: &Materials,
        src: IVec2,
        def: &MaterialDef,
        first: i32,
        vertical: i32,
    ) -> Result<bool, WorldError> {
        for dir in [first, -first] {
            for step in 1..=def.flow_range {
                let candidate = src + IVec2::new(dir * step, 0);
                let Some(cell) = cell_at(store, candidate) else {
                    break;
                };
                let target = materials
                    .get(cell.material_id)
                    .ok_or_else(|| invalid_material(cell.material_id, candidate))?;
                let passable = cell.is_empty()
                    || (target.kind != MaterialKind::Static && target.density < def.density);
                if !passable {
                    break;
                }
                let ahead = candidate + IVec2::new(0, vertical);
                if cell_at(store, ahead).is_some_and(|c| c.is_empty()) {
                    return self.try_move(store, materials, src, candidate);
                }
            }
        }
        Ok(false)
    }

    /// Attempt a single swap. Legal when the destination chunk is
    /// loaded and the destination cell is air or a strictly lighter
    /// non-static material. Both cells are flagged as updated so
    /// neither moves twice in one tick, and both neighborhoods are
    /// woken for the next tick.
    fn try_move(
        &mut self,
        store: &mut ChunkStore,
        materials: &Materials,
        src: IVec2,
        dst: IVec2,
    ) -> Result<bool, WorldError> {
        let (src_coord, sx, sy) = world_to_chunk(src);
        let (dst_coord, dx, dy) = world_to_chunk(dst);

        let Some(src_cell) = store.get(src_coord).map(|c| c.get(sx, sy)) else {
            return Ok(false);
        };
        // Unloaded space is a wall; the cell waits at the boundary
        let Some(dst_cell) = store.get(dst_coord).map(|c| c.get(dx, dy)) else {
            return Ok(false);
        };

        if !dst_cell.is_empty() {
            let src_def = materials
                .get(src_cell.material_id)
                .ok_or_else(|| invalid_material(src_cell.material_id, src))?;
            let dst_def = materials
                .get(dst_cell.material_id)
                .ok_or_else(|| invalid_material(dst_cell.material_id, dst))?;
            if dst_def.kind == MaterialKind::Static || dst_def.density >= src_def.density {
                return Ok(false);
            }
        }

        if src_coord == dst_coord {
            if let Some(chunk) = store.chunks_mut().get_mut(&src_coord) {
                chunk.swap_cells(sx, sy, dx, dy);
                chunk.add_flags(sx, sy, cell_flags::UPDATED);
                chunk.add_flags(dx, dy, cell_flags::UPDATED);
            }
        } else {
            // Both chunks were verified loaded above; write the two
            // halves of the swap in sequence
            if let Some(chunk) = store.chunks_mut().get_mut(&src_coord) {
                let mut cell = dst_cell;
                cell.flags |= cell_flags::UPDATED;
                chunk.set_cell(sx, sy, cell);
            }
            if let Some(chunk) = store.chunks_mut().get_mut(&dst_coord) {
                let mut cell = src_cell;
                cell.flags |= cell_flags::UPDATED | cell_flags::ACTIVE;
                chunk.set_cell(dx, dy, cell);
            }
        }

        self.wake_area_next(src);
        self.wake_area_next(dst);
        Ok(true)
    }
}

fn cell_at(store: &ChunkStore, world: IVec2) -> Option<Cell> {
    let (coord, local_x, local_y) = world_to_chunk(world);
    store.get(coord).map(|c| c.get(local_x, local_y))
}

fn invalid_material(id: u16, world: IVec2) -> WorldError {
    WorldError::InvalidMaterial {
        id,
        x: world.x,
        y: world.y,
    }
}
