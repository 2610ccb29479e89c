//! Error taxonomy for the world core.

use thiserror::Error;

/// Errors surfaced by the world core.
///
/// Out-of-range queries are not represented here: they are resolved
/// locally by clamping to the boundary material and never fail.
#[derive(Debug, Error)]
pub enum WorldError {
    /// A cell references a material id the registry does not know.
    /// This indicates data corruption, so the running tick is aborted
    /// instead of silently substituting a default.
    #[error("invalid material id {id} at world ({x}, {y})")]
    InvalidMaterial { id: u16, x: i32, y: i32 },

    /// Overlay flush or metadata write failed. Recoverable: the
    /// in-memory overlay keeps every edit and the flush is retried on
    /// the next eviction or save.
    #[error("overlay persistence failed")]
    Persistence(#[source] anyhow::Error),
}
