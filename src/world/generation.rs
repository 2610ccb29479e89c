//! Procedural terrain generation
//!
//! A pure function of (seed, coordinate): no mutable state, no global
//! RNG, so chunks can be discarded and regenerated bit-identically
//! instead of persisted.

use crate::simulation::MaterialId;
use crate::world::chunk::{Chunk, CHUNK_SIZE};
use glam::IVec2;
use noise::{Fbm, MultiFractal, NoiseFn, Perlin};

/// Mean surface elevation
const SURFACE_BASE: i32 = 32;
/// Peak-to-mean surface variation in cells
const HEIGHT_AMPLITUDE: f64 = 24.0;
/// Rows of dirt directly under the grass skin
const DIRT_BAND: i32 = 3;
/// Caves never open closer than this to the surface
const MIN_CAVE_DEPTH: i32 = 4;
/// Cave noise above this value carves air
const CAVE_THRESHOLD: f64 = 0.2;
/// Everything at or below this row is indestructible
const BEDROCK_FLOOR: i32 = -96;
/// Queries beyond this range are clamped, never rejected
const WORLD_LIMIT: i32 = 1_000_000;

/// World generator using multi-octave Perlin noise
pub struct TerrainGenerator {
    pub seed: u64,
    height_noise: Fbm<Perlin>,
    cave_noise: Fbm<Perlin>,
}

impl TerrainGenerator {
    pub fn new(seed: u64) -> Self {
        // Low-frequency ridge line for the surface elevation
        let height_noise = Fbm::<Perlin>::new(seed as u32)
            .set_octaves(4)
            .set_frequency(0.005);

        // Independent 2D field for cave carving (~50 cell wavelength)
        let cave_noise = Fbm::<Perlin>::new(seed.wrapping_add(1) as u32)
            .set_octaves(4)
            .set_frequency(0.02);

        Self {
            seed,
            height_noise,
            cave_noise,
        }
    }

    /// Surface elevation for a column (the row occupied by the skin)
    pub fn surface_height(&self, world_x: i32) -> i32 {
        let x = world_x.clamp(-WORLD_LIMIT, WORLD_LIMIT);
        let value = self.height_noise.get([x as f64, 0.0]);
        SURFACE_BASE + (value * HEIGHT_AMPLITUDE).floor() as i32
    }

    /// Material at a world coordinate
    pub fn material_at(&self, world_x: i32, world_y: i32) -> u16 {
        let x = world_x.clamp(-WORLD_LIMIT, WORLD_LIMIT);
        let y = world_y.clamp(-WORLD_LIMIT, WORLD_LIMIT);
        self.material_in_column(x, y, self.surface_height(x))
    }

    /// Generate a complete chunk. Pass one computes the surface
    /// elevation per column, pass two walks each column assigning
    /// layered materials.
    pub fn generate_chunk(&self, coord: IVec2) -> Chunk {
        let mut chunk = Chunk::new(coord);
        let base = coord * CHUNK_SIZE as i32;

        for local_x in 0..CHUNK_SIZE {
            let world_x = base.x + local_x as i32;
            let surface = self.surface_height(world_x);
            for local_y in 0..CHUNK_SIZE {
                let world_y = base.y + local_y as i32;
                let material = self.material_in_column(world_x, world_y, surface);
                chunk.set_material(local_x, local_y, material);
            }
        }

        chunk.dirty = false;
        chunk
    }

    /// True if the natural terrain leaves this cell open, given the
    /// column's surface elevation
    fn air_in_column(&self, world_x: i32, world_y: i32, surface: i32) -> bool {
        if world_y <= BEDROCK_FLOOR {
            return false;
        }
        if world_y > surface {
            return true;
        }
        let depth = surface - world_y;
        depth >= MIN_CAVE_DEPTH && self.cave_noise.get([world_x as f64, world_y as f64]) > CAVE_THRESHOLD
    }

    fn material_in_column(&self, world_x: i32, world_y: i32, surface: i32) -> u16 {
        // Indestructible floor, regardless of noise
        if world_y <= BEDROCK_FLOOR {
            return MaterialId::BEDROCK;
        }

        if world_y > surface {
            return MaterialId::AIR;
        }

        let depth = surface - world_y;
        if self.air_in_column(world_x, world_y, surface) {
            return MaterialId::AIR;
        }

        if depth == 0 {
            // Skin only where the cell above is open; a surface row with
            // a ceiling above it gets dirt, not grass
            if self.air_in_column(world_x, world_y + 1, surface) {
                return MaterialId::GRASS;
            }
            return MaterialId::DIRT;
        }

        if depth <= DIRT_BAND {
            return MaterialId::DIRT;
        }

        MaterialId::STONE
    }
}
