//! Falling-sand simulation: materials and the cellular automaton

pub mod automaton;
pub mod materials;

pub use automaton::{MaterialAutomaton, TickStats};
pub use materials::{MaterialDef, MaterialId, MaterialKind, Materials};
