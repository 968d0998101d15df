//! Asset storage for generated terrains and region definitions.
//!
//! Assets are RON documents addressed by a forward-slash path
//! (`Assets/Levels/BR/Area/Terrain/TerrainData.asset`). Heightmap sources are
//! plain byte blobs in the same namespace.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use terrain::TerrainData;

use crate::error::{RegionError, RegionResult};
use crate::level::RegionLevel;

/// Backing store for assets.
pub trait AssetDatabase {
    /// Text of the asset at `path`, or `None` if nothing is stored there.
    fn read_text(&self, path: &str) -> RegionResult<Option<String>>;

    /// Create or overwrite the asset at `path`.
    fn write_text(&mut self, path: &str, text: &str) -> RegionResult<()>;

    /// Raw bytes of a source file (heightmaps).
    fn read_bytes(&self, path: &str) -> RegionResult<Vec<u8>>;

    fn exists(&self, path: &str) -> RegionResult<bool> {
        Ok(self.read_text(path)?.is_some())
    }
}

/// Deserialize the asset at `path`, `None` if it does not exist.
pub fn load_asset<T: DeserializeOwned>(db: &dyn AssetDatabase, path: &str) -> RegionResult<Option<T>> {
    let Some(text) = db.read_text(path)? else {
        return Ok(None);
    };
    ron::from_str(&text)
        .map(Some)
        .map_err(|source| RegionError::Parse {
            path: PathBuf::from(path),
            source,
        })
}

/// Serialize `asset` to `path`, replacing whatever was there.
pub fn save_asset<T: Serialize>(db: &mut dyn AssetDatabase, path: &str, asset: &T) -> RegionResult<()> {
    let text = ron::ser::to_string_pretty(asset, ron::ser::PrettyConfig::default())?;
    db.write_text(path, &text)
}

/// Load a region definition, attach its terrain and validate it.
/// The result is ready for `RegionLoader::load_region`.
pub fn open_region_level(db: &dyn AssetDatabase, path: &str) -> RegionResult<RegionLevel> {
    let mut level: RegionLevel =
        load_asset(db, path)?.ok_or_else(|| RegionError::AssetNotFound(path.to_string()))?;
    if let Some(terrain_path) = level.terrain_asset.clone() {
        match load_asset::<TerrainData>(db, &terrain_path)? {
            Some(terrain) => level.terrain = Some(Arc::new(terrain)),
            None => log::warn!(
                "Region {} references missing terrain {}",
                level.display_id(),
                terrain_path
            ),
        }
    }
    level.ensure_valid();
    Ok(level)
}

/// In-memory database, used by tests and tools that never touch disk.
#[derive(Debug, Default)]
pub struct MemoryAssetDatabase {
    assets: HashMap<String, String>,
    blobs: HashMap<String, Vec<u8>>,
}

impl MemoryAssetDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_bytes(&mut self, path: impl Into<String>, bytes: Vec<u8>) {
        self.blobs.insert(path.into(), bytes);
    }

    pub fn asset_count(&self) -> usize {
        self.assets.len()
    }
}

impl AssetDatabase for MemoryAssetDatabase {
    fn read_text(&self, path: &str) -> RegionResult<Option<String>> {
        Ok(self.assets.get(path).cloned())
    }

    fn write_text(&mut self, path: &str, text: &str) -> RegionResult<()> {
        self.assets.insert(path.to_string(), text.to_string());
        Ok(())
    }

    fn read_bytes(&self, path: &str) -> RegionResult<Vec<u8>> {
        self.blobs
            .get(path)
            .cloned()
            .ok_or_else(|| RegionError::AssetNotFound(path.to_string()))
    }
}

/// Database rooted at a directory. Asset paths are resolved relative to it.
#[derive(Debug, Clone)]
pub struct FsAssetDatabase {
    root: PathBuf,
}

impl FsAssetDatabase {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

impl AssetDatabase for FsAssetDatabase {
    fn read_text(&self, path: &str) -> RegionResult<Option<String>> {
        let full = self.resolve(path);
        if !full.is_file() {
            return Ok(None);
        }
        fs::read_to_string(&full)
            .map(Some)
            .map_err(|source| RegionError::Io { path: full, source })
    }

    fn write_text(&mut self, path: &str, text: &str) -> RegionResult<()> {
        let full = self.resolve(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).map_err(|source| RegionError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&full, text).map_err(|source| RegionError::Io { path: full, source })
    }

    fn read_bytes(&self, path: &str) -> RegionResult<Vec<u8>> {
        let full = self.resolve(path);
        fs::read(&full).map_err(|source| RegionError::Io { path: full, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::MapMarker;
    use engine_core::SpriteRef;
    use glam::Vec3;

    #[test]
    fn memory_database_round_trips_assets() {
        let mut db = MemoryAssetDatabase::new();
        let data = TerrainData::flat(4, Vec3::new(10.0, 2.0, 10.0));
        save_asset(&mut db, "T/terrain.asset", &data).unwrap();
        assert!(db.exists("T/terrain.asset").unwrap());
        let back: TerrainData = load_asset(&db, "T/terrain.asset").unwrap().unwrap();
        assert_eq!(back, data);
        assert!(load_asset::<TerrainData>(&db, "T/other.asset").unwrap().is_none());
    }

    #[test]
    fn corrupt_asset_reports_path() {
        let mut db = MemoryAssetDatabase::new();
        db.write_text("broken.asset", "(resolution: ").unwrap();
        let err = load_asset::<TerrainData>(&db, "broken.asset").unwrap_err();
        assert!(matches!(err, RegionError::Parse { ref path, .. } if path == Path::new("broken.asset")));
    }

    #[test]
    fn open_region_level_attaches_terrain() {
        let mut db = MemoryAssetDatabase::new();
        let data = TerrainData::flat(2, Vec3::new(50.0, 5.0, 50.0));
        save_asset(&mut db, "L/terrain.asset", &data).unwrap();
        let mut level = RegionLevel::new("BR", "A1");
        level.terrain_asset = Some("L/terrain.asset".to_string());
        save_asset(&mut db, "L/level.asset", &level).unwrap();

        let opened = open_region_level(&db, "L/level.asset").unwrap();
        assert_eq!(opened.terrain.as_deref(), Some(&data));
        assert!(matches!(
            open_region_level(&db, "L/missing.asset"),
            Err(RegionError::AssetNotFound(_))
        ));
    }

    #[test]
    fn inconsistent_terrain_fails_to_open() {
        let mut db = MemoryAssetDatabase::new();
        db.write_text("L/t.asset", "(resolution: 3, size: (100.0, 10.0, 100.0), heights: [])")
            .unwrap();
        let mut level = RegionLevel::new("BR", "A1");
        level.terrain_asset = Some("L/t.asset".to_string());
        level
            .map_markers
            .push(MapMarker::new("Camp", 0.5, 0.5).with_icon(SpriteRef::new("icons/camp")));
        save_asset(&mut db, "L/level.asset", &level).unwrap();

        let err = open_region_level(&db, "L/level.asset").unwrap_err();
        assert!(matches!(err, RegionError::Parse { ref path, .. } if path == Path::new("L/t.asset")));
    }

    #[test]
    fn missing_blob_is_not_found() {
        let db = MemoryAssetDatabase::new();
        assert!(matches!(db.read_bytes("h.raw"), Err(RegionError::AssetNotFound(_))));
    }

    #[test]
    fn fs_database_creates_folders() {
        let root = std::env::temp_dir().join(format!("region-assets-{}", std::process::id()));
        let mut db = FsAssetDatabase::new(&root);
        db.write_text("Levels/BR/Config/level.asset", "()").unwrap();
        assert_eq!(
            db.read_text("Levels/BR/Config/level.asset").unwrap().as_deref(),
            Some("()")
        );
        assert!(db.read_text("Levels/BR/Config/none.asset").unwrap().is_none());
        assert!(matches!(db.read_bytes("none.raw"), Err(RegionError::Io { .. })));
        let _ = fs::remove_dir_all(&root);
    }
}
