//! Derived render data (contour geometry)

pub mod contour;

pub use contour::{ContourCache, ContourMesh};
