//! Material definitions and registry

use serde::{Deserialize, Serialize};

/// Built-in material IDs
pub struct MaterialId;

impl MaterialId {
    pub const AIR: u16 = 0;
    pub const STONE: u16 = 1;
    pub const SAND: u16 = 2;
    pub const WATER: u16 = 3;
    pub const DIRT: u16 = 4;
    pub const GRASS: u16 = 5;
    pub const STEAM: u16 = 6;
    pub const BEDROCK: u16 = 7;
}

/// How a material behaves physically
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaterialKind {
    /// Never attempts to move (stone, grass, bedrock)
    Static,
    /// Falls, piles up (sand, dirt)
    Powder,
    /// Flows, seeks level (water)
    Fluid,
    /// Rises, disperses, dissipates (steam); air is the zero-density gas
    Gas,
}

impl MaterialKind {
    /// Whether the contour sampler treats this class as solid.
    /// Gases (air included) leave no boundary geometry.
    pub fn is_contour_solid(self) -> bool {
        !matches!(self, MaterialKind::Gas)
    }
}

/// Definition of a material's properties
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MaterialDef {
    pub id: u16,
    pub name: String,
    pub kind: MaterialKind,

    /// Render hint (RGBA)
    pub color: [u8; 4],

    /// Density - a strictly heavier material displaces a lighter one
    pub density: f32,

    /// Maximum lateral cells a fluid/gas may travel in one tick
    pub flow_range: i32,

    /// Per-tick probability that a gas cell converts to air
    pub dissipation: f32,
}

impl Default for MaterialDef {
    fn default() -> Self {
        Self {
            id: 0,
            name: "unknown".to_string(),
            kind: MaterialKind::Static,
            color: [255, 0, 255, 255], // Magenta for missing materials
            density: 1.0,
            flow_range: 0,
            dissipation: 0.0,
        }
    }
}

/// Registry of all materials, indexed by id
pub struct Materials {
    materials: Vec<MaterialDef>,
}

impl Materials {
    pub fn new() -> Self {
        let mut materials = Self {
            materials: Vec::new(),
        };
        materials.register_defaults();
        materials
    }

    fn register_defaults(&mut self) {
        self.register(MaterialDef {
            id: MaterialId::AIR,
            name: "air".to_string(),
            kind: MaterialKind::Gas,
            color: [0, 0, 0, 0],
            density: 0.0,
            ..Default::default()
        });

        self.register(MaterialDef {
            id: MaterialId::STONE,
            name: "stone".to_string(),
            kind: MaterialKind::Static,
            color: [128, 128, 128, 255],
            density: 2.5,
            ..Default::default()
        });

        self.register(MaterialDef {
            id: MaterialId::SAND,
            name: "sand".to_string(),
            kind: MaterialKind::Powder,
            color: [194, 178, 128, 255],
            density: 1.5,
            ..Default::default()
        });

        self.register(MaterialDef {
            id: MaterialId::WATER,
            name: "water".to_string(),
            kind: MaterialKind::Fluid,
            color: [64, 164, 223, 200],
            density: 1.0,
            flow_range: 4,
            ..Default::default()
        });

        self.register(MaterialDef {
            id: MaterialId::DIRT,
            name: "dirt".to_string(),
            kind: MaterialKind::Powder,
            color: [134, 96, 67, 255],
            density: 1.6,
            ..Default::default()
        });

        self.register(MaterialDef {
            id: MaterialId::GRASS,
            name: "grass".to_string(),
            kind: MaterialKind::Static,
            color: [88, 164, 76, 255],
            density: 1.8,
            ..Default::default()
        });

        self.register(MaterialDef {
            id: MaterialId::STEAM,
            name: "steam".to_string(),
            kind: MaterialKind::Gas,
            color: [200, 200, 210, 160],
            density: 0.05,
            flow_range: 3,
            dissipation: 0.02,
            ..Default::default()
        });

        self.register(MaterialDef {
            id: MaterialId::BEDROCK,
            name: "bedrock".to_string(),
            kind: MaterialKind::Static,
            color: [40, 40, 45, 255],
            density: 1000.0,
            ..Default::default()
        });
    }

    fn register(&mut self, def: MaterialDef) {
        debug_assert_eq!(def.id as usize, self.materials.len());
        self.materials.push(def);
    }

    /// Look up a material definition. `None` means the id is invalid,
    /// which callers treat as an invariant violation.
    pub fn get(&self, id: u16) -> Option<&MaterialDef> {
        self.materials.get(id as usize)
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}

impl Default for Materials {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_ids_match_indices() {
        let materials = Materials::new();
        for id in 0..materials.len() as u16 {
            let def = materials.get(id).unwrap();
            assert_eq!(def.id, id);
        }
    }

    #[test]
    fn test_unknown_id_is_none() {
        let materials = Materials::new();
        assert!(materials.get(9999).is_none());
    }

    #[test]
    fn test_density_ordering_for_displacement() {
        let materials = Materials::new();
        let sand = materials.get(MaterialId::SAND).unwrap();
        let water = materials.get(MaterialId::WATER).unwrap();
        let air = materials.get(MaterialId::AIR).unwrap();
        assert!(sand.density > water.density);
        assert!(water.density > air.density);
    }

    #[test]
    fn test_contour_solidity_classes() {
        assert!(MaterialKind::Static.is_contour_solid());
        assert!(MaterialKind::Powder.is_contour_solid());
        assert!(MaterialKind::Fluid.is_contour_solid());
        assert!(!MaterialKind::Gas.is_contour_solid());
    }
}
