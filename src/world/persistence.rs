//! Overlay and metadata persistence
//!
//! Only the modification overlay is durable: unmodified terrain is
//! always reproducible from (seed, coordinate). The overlay is stored
//! as a flat list of (x, y, material) entries, bincode-encoded and
//! lz4-compressed, written atomically.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::overlay::{ModificationOverlay, OverlayEntry};

/// World metadata stored in world.meta (RON format)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldMetadata {
    pub version: u32,
    pub seed: u64,
    pub spawn_point: (f32, f32),
    pub created_at: String,
    pub last_played: String,
    pub play_time_seconds: u64,
}

impl WorldMetadata {
    pub fn new(seed: u64) -> Self {
        let now = chrono::Local::now().to_rfc3339();
        Self {
            version: 1,
            seed,
            spawn_point: (0.0, 100.0), // Above any surface
            created_at: now.clone(),
            last_played: now,
            play_time_seconds: 0,
        }
    }
}

/// Manages overlay and metadata save/load for one world directory
pub struct OverlayStore {
    world_dir: PathBuf,
}

impl OverlayStore {
    /// Create a persistence manager for the given world name
    pub fn new(world_name: &str) -> Result<Self> {
        let world_dir = PathBuf::from("worlds").join(world_name);
        std::fs::create_dir_all(&world_dir).context("Failed to create world directory")?;
        Ok(Self { world_dir })
    }

    /// Save the overlay blob with compression
    pub fn save_overlay(&self, seed: u64, overlay: &ModificationOverlay) -> Result<()> {
        let path = self.overlay_path(seed);
        let entries = overlay.to_entries();

        let serialized =
            bincode_next::serde::encode_to_vec(&entries, bincode_next::config::standard())
                .context("Failed to serialize overlay")?;
        let compressed = lz4_flex::compress_prepend_size(&serialized);

        // Atomic write: temp file, then rename
        let temp_path = path.with_extension("tmp");
        std::fs::write(&temp_path, &compressed).context("Failed to write overlay temp file")?;
        std::fs::rename(&temp_path, &path).context("Failed to rename overlay file")?;

        log::info!(
            "[SAVE] overlay for seed {} - {} entries, {} bytes compressed",
            seed,
            entries.len(),
            compressed.len()
        );
        Ok(())
    }

    /// Load the overlay for a seed. A missing or unreadable file means
    /// a fresh world: generation alone still produces valid terrain, so
    /// this is a warning-level condition, never fatal.
    pub fn load_overlay(&self, seed: u64) -> ModificationOverlay {
        let path = self.overlay_path(seed);

        if !path.exists() {
            log::info!("[LOAD] no overlay for seed {}, fresh world", seed);
            return ModificationOverlay::new();
        }

        match self.load_overlay_file(&path) {
            Ok(overlay) => {
                log::info!(
                    "[LOAD] overlay for seed {} - {} entries",
                    seed,
                    overlay.len()
                );
                overlay
            }
            Err(e) => {
                log::warn!(
                    "[LOAD] failed to read overlay for seed {}: {:#}, starting fresh",
                    seed,
                    e
                );
                ModificationOverlay::new()
            }
        }
    }

    fn load_overlay_file(&self, path: &Path) -> Result<ModificationOverlay> {
        let compressed = std::fs::read(path).context("Failed to read overlay file")?;
        let serialized = lz4_flex::decompress_size_prepended(&compressed)
            .context("Failed to decompress overlay")?;
        let (entries, _): (Vec<OverlayEntry>, _) =
            bincode_next::serde::decode_from_slice(&serialized, bincode_next::config::standard())
                .context("Failed to deserialize overlay")?;
        Ok(ModificationOverlay::from_entries(entries))
    }

    fn overlay_path(&self, seed: u64) -> PathBuf {
        self.world_dir.join(format!("overlay_{}.bin", seed))
    }

    /// Save world metadata to disk
    pub fn save_metadata(&self, meta: &WorldMetadata) -> Result<()> {
        let path = self.world_dir.join("world.meta");
        let serialized = ron::ser::to_string_pretty(meta, ron::ser::PrettyConfig::default())
            .context("Failed to serialize metadata")?;
        std::fs::write(path, serialized).context("Failed to write metadata file")?;
        Ok(())
    }

    /// Load world metadata, or create a default for the given seed
    pub fn load_metadata(&self, seed: u64) -> WorldMetadata {
        let path = self.world_dir.join("world.meta");

        if !path.exists() {
            log::info!("No world metadata found, creating new world");
            return WorldMetadata::new(seed);
        }

        match std::fs::read_to_string(&path) {
            Ok(contents) => match ron::from_str(&contents) {
                Ok(meta) => meta,
                Err(e) => {
                    log::warn!("Failed to parse metadata: {}, using defaults", e);
                    WorldMetadata::new(seed)
                }
            },
            Err(e) => {
                log::warn!("Failed to read metadata: {}, using defaults", e);
                WorldMetadata::new(seed)
            }
        }
    }

    /// Delete all persisted data for a world (tests and --regenerate)
    pub fn delete_world(world_name: &str) -> Result<()> {
        let world_dir = PathBuf::from("worlds").join(world_name);
        if world_dir.exists() {
            std::fs::remove_dir_all(&world_dir).context("Failed to delete world directory")?;
            log::info!("Deleted world: {}", world_name);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::IVec2;

    #[test]
    fn test_overlay_save_load_roundtrip() -> Result<()> {
        let test_world = "test_overlay_roundtrip";
        let store = OverlayStore::new(test_world)?;

        let mut overlay = ModificationOverlay::new();
        overlay.set(IVec2::new(5, -3), 2);
        overlay.set(IVec2::new(-70, 120), 0);
        store.save_overlay(42, &overlay)?;

        let loaded = store.load_overlay(42);
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get(IVec2::new(5, -3)), Some(2));
        assert_eq!(loaded.get(IVec2::new(-70, 120)), Some(0));

        OverlayStore::delete_world(test_world)?;
        Ok(())
    }

    #[test]
    fn test_missing_overlay_is_fresh_world() -> Result<()> {
        let test_world = "test_overlay_missing";
        let store = OverlayStore::new(test_world)?;

        let loaded = store.load_overlay(7);
        assert!(loaded.is_empty());

        OverlayStore::delete_world(test_world)?;
        Ok(())
    }

    #[test]
    fn test_corrupt_overlay_is_fresh_world() -> Result<()> {
        let test_world = "test_overlay_corrupt";
        let store = OverlayStore::new(test_world)?;

        std::fs::write(store.overlay_path(9), b"not an overlay")?;
        let loaded = store.load_overlay(9);
        assert!(loaded.is_empty());

        OverlayStore::delete_world(test_world)?;
        Ok(())
    }

    #[test]
    fn test_metadata_save_load() -> Result<()> {
        let test_world = "test_metadata";
        let store = OverlayStore::new(test_world)?;

        let meta = WorldMetadata {
            version: 1,
            seed: 12345,
            spawn_point: (100.0, 200.0),
            created_at: "2024-01-01T00:00:00Z".to_string(),
            last_played: "2024-01-02T00:00:00Z".to_string(),
            play_time_seconds: 3600,
        };
        store.save_metadata(&meta)?;

        let loaded = store.load_metadata(0);
        assert_eq!(loaded.seed, 12345);
        assert_eq!(loaded.spawn_point, (100.0, 200.0));
        assert_eq!(loaded.play_time_seconds, 3600);

        OverlayStore::delete_world(test_world)?;
        Ok(())
    }
}
