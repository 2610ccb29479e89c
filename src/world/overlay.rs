//! Modification overlay - the durable diff between generated and
//! player-modified terrain
//!
//! Only cells whose material differs from what the generator would
//! produce are recorded; everything else is reproducible from
//! (seed, coordinate) and never stored.

use crate::world::chunk::chunk_of;
use ahash::AHashMap;
use glam::IVec2;

/// Flat persisted form: (x, y, material id), order-independent,
/// last-write-wins on duplicate coordinates
pub type OverlayEntry = (i32, i32, u16);

/// Map from absolute cell coordinate to overriding material id
#[derive(Clone, Debug, Default)]
pub struct ModificationOverlay {
    entries: AHashMap<IVec2, u16>,
}

impl ModificationOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a flat entry list, later entries replacing earlier ones
    pub fn from_entries(entries: Vec<OverlayEntry>) -> Self {
        let mut overlay = Self::new();
        for (x, y, material_id) in entries {
            overlay.set(IVec2::new(x, y), material_id);
        }
        overlay
    }

    /// Flatten for persistence. Ordering is arbitrary; replay is
    /// order-independent because each coordinate appears once.
    pub fn to_entries(&self) -> Vec<OverlayEntry> {
        self.entries
            .iter()
            .map(|(coord, id)| (coord.x, coord.y, *id))
            .collect()
    }

    pub fn get(&self, coord: IVec2) -> Option<u16> {
        self.entries.get(&coord).copied()
    }

    /// Record a delta; a later write for the same coordinate replaces
    /// the earlier one
    pub fn set(&mut self, coord: IVec2, material_id: u16) {
        self.entries.insert(coord, material_id);
    }

    /// Drop the delta for a coordinate (the cell matches the generator
    /// again)
    pub fn remove(&mut self, coord: IVec2) {
        self.entries.remove(&coord);
    }

    /// Deltas that land inside the given chunk
    pub fn entries_for_chunk(&self, chunk_coord: IVec2) -> impl Iterator<Item = (IVec2, u16)> + '_ {
        self.entries
            .iter()
            .filter(move |(coord, _)| chunk_of(**coord) == chunk_coord)
            .map(|(coord, id)| (*coord, *id))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_write_wins() {
        let mut overlay = ModificationOverlay::new();
        overlay.set(IVec2::new(3, 4), 1);
        overlay.set(IVec2::new(3, 4), 2);

        assert_eq!(overlay.len(), 1);
        assert_eq!(overlay.get(IVec2::new(3, 4)), Some(2));
    }

    #[test]
    fn test_from_entries_folds_duplicates() {
        let overlay = ModificationOverlay::from_entries(vec![(0, 0, 5), (1, 1, 3), (0, 0, 7)]);

        assert_eq!(overlay.len(), 2);
        assert_eq!(overlay.get(IVec2::ZERO), Some(7));
        assert_eq!(overlay.get(IVec2::new(1, 1)), Some(3));
    }

    #[test]
    fn test_remove_clears_delta() {
        let mut overlay = ModificationOverlay::new();
        overlay.set(IVec2::new(9, 9), 4);
        overlay.remove(IVec2::new(9, 9));

        assert!(overlay.is_empty());
        assert_eq!(overlay.get(IVec2::new(9, 9)), None);
    }

    #[test]
    fn test_entries_for_chunk() {
        let mut overlay = ModificationOverlay::new();
        overlay.set(IVec2::new(5, 5), 1); // chunk (0, 0)
        overlay.set(IVec2::new(70, 5), 2); // chunk (1, 0)
        overlay.set(IVec2::new(-1, 0), 3); // chunk (-1, 0)

        let in_origin: Vec<_> = overlay.entries_for_chunk(IVec2::ZERO).collect();
        assert_eq!(in_origin, vec![(IVec2::new(5, 5), 1)]);
    }

    #[test]
    fn test_roundtrip_entries() {
        let mut overlay = ModificationOverlay::new();
        overlay.set(IVec2::new(-3, 100), 2);
        overlay.set(IVec2::new(64, -64), 6);

        let replayed = ModificationOverlay::from_entries(overlay.to_entries());
        assert_eq!(replayed.get(IVec2::new(-3, 100)), Some(2));
        assert_eq!(replayed.get(IVec2::new(64, -64)), Some(6));
        assert_eq!(replayed.len(), 2);
    }
}
