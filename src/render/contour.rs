//! Marching-squares contour extraction with per-chunk caching
//!
//! Geometry is derived, never stored: the cache key is
//! (chunk coordinate, scale) and each entry carries the chunk
//! generation it was built from, so a material write invalidates it on
//! the next request while flag-only writes leave it untouched.

use ahash::AHashMap;
use glam::{IVec2, Vec2};

use crate::error::WorldError;
use crate::simulation::materials::Materials;
use crate::world::chunk::{Chunk, CHUNK_SIZE};

/// Contour geometry for one chunk at one scale. Each polyline is a
/// sequence of points in scaled world space.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContourMesh {
    pub polylines: Vec<Vec<Vec2>>,
}

impl ContourMesh {
    pub fn is_empty(&self) -> bool {
        self.polylines.is_empty()
    }
}

struct CacheEntry {
    generation: u64,
    mesh: ContourMesh,
}

/// Render cache: rebuilt lazily, keyed by chunk coordinate and scale
#[derive(Default)]
pub struct ContourCache {
    entries: AHashMap<(IVec2, u32), CacheEntry>,
}

impl ContourCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Contour mesh for a chunk, rebuilding when the cached entry is
    /// missing or was built from an older chunk generation
    pub fn get_geometry(
        &mut self,
        chunk: &Chunk,
        materials: &Materials,
        scale: f32,
    ) -> Result<&ContourMesh, WorldError> {
        let key = (chunk.coord, scale.to_bits());
        let stale = self
            .entries
            .get(&key)
            .map_or(true, |e| e.generation != chunk.generation);

        if stale {
            let mesh = build_mesh(chunk, materials, scale)?;
            log::trace!(
                "contour rebuild for chunk ({}, {}) at scale {} - {} polylines",
                chunk.coord.x,
                chunk.coord.y,
                scale,
                mesh.polylines.len()
            );
            self.entries.insert(
                key,
                CacheEntry {
                    generation: chunk.generation,
                    mesh,
                },
            );
        }

        Ok(&self.entries[&key].mesh)
    }

    /// Drop every cached entry for a chunk (all scales). Called when
    /// the store evicts it.
    pub fn evict_chunk(&mut self, coord: IVec2) {
        self.entries.retain(|(c, _), _| *c != coord);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// March over the chunk's cell grid. Samples sit on cell coordinates;
/// squares one cell past each edge are included with out-of-chunk
/// samples read as open, so boundary terrain still produces closed
/// contours.
fn build_mesh(chunk: &Chunk, materials: &Materials, scale: f32) -> Result<ContourMesh, WorldError> {
    let size = CHUNK_SIZE as i32;
    let origin = (chunk.coord * size).as_vec2();
    let mut polylines = Vec::new();

    for y in -1..size {
        for x in -1..size {
            let bl = solidity(chunk, materials, x, y)?;
            let br = solidity(chunk, materials, x + 1, y)?;
            let tr = solidity(chunk, materials, x + 1, y + 1)?;
            let tl = solidity(chunk, materials, x, y + 1)?;

            let mut case = 0u8;
            if tl >= 0.5 {
                case |= 1;
            }
            if tr >= 0.5 {
                case |= 2;
            }
            if br >= 0.5 {
                case |= 4;
            }
            if bl >= 0.5 {
                case |= 8;
            }
            if case == 0 || case == 15 {
                continue;
            }

            let p_tl = Vec2::new(x as f32, (y + 1) as f32);
            let p_tr = Vec2::new((x + 1) as f32, (y + 1) as f32);
            let p_br = Vec2::new((x + 1) as f32, y as f32);
            let p_bl = Vec2::new(x as f32, y as f32);

            let top = p_tl.lerp(p_tr, crossing(tl, tr));
            let right = p_tr.lerp(p_br, crossing(tr, br));
            let bottom = p_bl.lerp(p_br, crossing(bl, br));
            let left = p_tl.lerp(p_bl, crossing(tl, bl));

            let mut emit = |a: Vec2, b: Vec2| {
                polylines.push(vec![(origin + a) * scale, (origin + b) * scale]);
            };
            match case {
                1 | 14 => emit(left, top),
                2 | 13 => emit(top, right),
                3 | 12 => emit(left, right),
                4 | 11 => emit(right, bottom),
                6 | 9 => emit(top, bottom),
                7 | 8 => emit(bottom, left),
                // Ambiguous saddles: two opposing corner cuts
                5 => {
                    emit(left, bottom);
                    emit(top, right);
                }
                10 => {
                    emit(top, left);
                    emit(right, bottom);
                }
                _ => {}
            }
        }
    }

    Ok(ContourMesh { polylines })
}

/// Solidity sample at a cell coordinate. Outside the chunk reads as
/// open so contours close at the boundary.
fn solidity(chunk: &Chunk, materials: &Materials, x: i32, y: i32) -> Result<f32, WorldError> {
    let size = CHUNK_SIZE as i32;
    if x < 0 || y < 0 || x >= size || y >= size {
        return Ok(0.0);
    }
    let id = chunk.material(x as usize, y as usize);
    let def = materials.get(id).ok_or_else(|| {
        let world = chunk.coord * size + IVec2::new(x, y);
        WorldError::InvalidMaterial {
            id,
            x: world.x,
            y: world.y,
        }
    })?;
    Ok(if def.kind.is_contour_solid() { 1.0 } else { 0.0 })
}

/// Interpolation parameter for the iso-crossing (0.5) between two
/// samples. Binary samples always cross at the midpoint.
fn crossing(a: f32, b: f32) -> f32 {
    if (b - a).abs() < f32::EPSILON {
        0.5
    } else {
        ((0.5 - a) / (b - a)).clamp(0.0, 1.0)
    }
}
