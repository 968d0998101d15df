//! Offline generation of terrain and region assets from a RAW heightmap.
//!
//! A recipe names the RAW source, its sample layout, the physical size of the
//! terrain and the region metadata to stamp into the generated definition.
//! Running it twice updates the same two assets in place.

use std::fmt;

use engine_core::TextureRef;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use terrain::{
    build_terrain, decode_raw, rebuild_terrain, ByteOrder, RawHeightmapFormat, TerrainData,
    TerrainError, TerrainSize,
};

use crate::assets::{load_asset, save_asset, AssetDatabase};
use crate::error::{RegionError, RegionResult};
use crate::level::{clone_map_markers, MapMarker, RegionLevel};
use crate::overlay::{
    clamp_index, clone_overlay_groups, migrate_legacy_overlays, sanitize_overlay_groups,
    OverlayGroup,
};

const RAW_EXTENSIONS: [&str; 2] = [".raw", ".bytes"];
const ASSET_EXTENSION: &str = ".asset";

fn default_resolution() -> usize {
    1025
}
fn default_bit_depth() -> u32 {
    16
}
fn default_true() -> bool {
    true
}
fn default_size_xz() -> Vec2 {
    Vec2::new(10_000.0, 10_000.0)
}
fn default_max_height() -> f32 {
    200.0
}
fn default_region_name() -> String {
    "BR-Region".to_string()
}
fn default_area_ref() -> String {
    "Area10km".to_string()
}
fn default_z_max() -> f32 {
    200.0
}
fn default_output_root() -> String {
    "Assets/Levels".to_string()
}
fn default_terrain_subfolder() -> String {
    "Terrain".to_string()
}
fn default_config_subfolder() -> String {
    "Config".to_string()
}
fn default_terrain_file() -> String {
    "TerrainData.asset".to_string()
}
fn default_level_file() -> String {
    "RegionLevel.asset".to_string()
}

/// Everything needed to turn a RAW heightmap into a terrain asset and a
/// region definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionTerrainRecipe {
    /// Path of the RAW source in the asset database.
    #[serde(default)]
    pub raw_file: Option<String>,
    #[serde(default = "default_resolution")]
    pub heightmap_width: usize,
    #[serde(default = "default_resolution")]
    pub heightmap_height: usize,
    /// 8 or 16.
    #[serde(default = "default_bit_depth")]
    pub bit_depth: u32,
    #[serde(default)]
    pub byte_order: ByteOrder,
    /// GIS exports put the first row at the top.
    #[serde(default = "default_true")]
    pub flip_vertically: bool,

    #[serde(default = "default_size_xz")]
    pub terrain_size_meters_xz: Vec2,
    #[serde(default = "default_max_height")]
    pub max_terrain_height_meters: f32,

    #[serde(default = "default_region_name")]
    pub region_name: String,
    #[serde(default = "default_area_ref")]
    pub area_ref: String,
    #[serde(default = "default_size_xz")]
    pub overlay_tiling_meters: Vec2,
    #[serde(default)]
    pub overlay_groups: Vec<OverlayGroup>,
    #[serde(default)]
    pub default_overlay_group_index: i32,
    #[serde(default, rename = "overlays", skip_serializing_if = "Vec::is_empty")]
    overlays_legacy: Vec<TextureRef>,
    #[serde(default, rename = "default_overlay_index")]
    default_overlay_index_legacy: i32,
    #[serde(default)]
    pub map_markers: Vec<MapMarker>,
    /// Written back after each generation.
    #[serde(default)]
    pub z_min_meters: f32,
    #[serde(default = "default_z_max")]
    pub z_max_meters: f32,

    #[serde(default = "default_output_root")]
    pub output_root_folder: String,
    #[serde(default = "default_terrain_subfolder")]
    pub terrain_subfolder_name: String,
    #[serde(default = "default_config_subfolder")]
    pub region_level_subfolder_name: String,
    #[serde(default = "default_terrain_file")]
    pub terrain_asset_file_name: String,
    #[serde(default = "default_level_file")]
    pub region_level_asset_file_name: String,
}

impl Default for RegionTerrainRecipe {
    fn default() -> Self {
        Self {
            raw_file: None,
            heightmap_width: default_resolution(),
            heightmap_height: default_resolution(),
            bit_depth: default_bit_depth(),
            byte_order: ByteOrder::default(),
            flip_vertically: true,
            terrain_size_meters_xz: default_size_xz(),
            max_terrain_height_meters: default_max_height(),
            region_name: default_region_name(),
            area_ref: default_area_ref(),
            overlay_tiling_meters: default_size_xz(),
            overlay_groups: Vec::new(),
            default_overlay_group_index: 0,
            overlays_legacy: Vec::new(),
            default_overlay_index_legacy: 0,
            map_markers: Vec::new(),
            z_min_meters: 0.0,
            z_max_meters: default_z_max(),
            output_root_folder: default_output_root(),
            terrain_subfolder_name: default_terrain_subfolder(),
            region_level_subfolder_name: default_config_subfolder(),
            terrain_asset_file_name: default_terrain_file(),
            region_level_asset_file_name: default_level_file(),
        }
    }
}

/// Outcome of a successful generation.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationResult {
    pub terrain_asset_path: String,
    pub terrain_created: bool,
    pub region_level_asset_path: String,
    pub region_level_created: bool,
    pub min_height_meters: f32,
    pub max_height_meters: f32,
}

fn created_or_updated(created: bool) -> &'static str {
    if created {
        "created"
    } else {
        "updated"
    }
}

impl fmt::Display for GenerationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Terrain data {} at {}; RegionLevel {} at {}. Height range: {:.2}m - {:.2}m.",
            created_or_updated(self.terrain_created),
            self.terrain_asset_path,
            created_or_updated(self.region_level_created),
            self.region_level_asset_path,
            self.min_height_meters,
            self.max_height_meters
        )
    }
}

/// Join path segments with `/`, skipping empty ones and trimming stray slashes.
pub fn combine_asset_path(parts: &[&str]) -> String {
    let mut result = String::new();
    for part in parts.iter().map(|p| p.trim()).filter(|p| !p.is_empty()) {
        if result.is_empty() {
            result.push_str(part.trim_end_matches('/'));
        } else {
            let part = part.trim_matches('/');
            let trimmed = result.trim_end_matches('/').len();
            result.truncate(trimmed);
            result.push('/');
            result.push_str(part);
        }
    }
    result.replace('\\', "/")
}

/// `provided` with an `.asset` extension, or `fallback` when it is blank.
pub fn ensure_asset_file_name(provided: &str, fallback: &str) -> String {
    let trimmed = provided.trim();
    if trimmed.is_empty() {
        return fallback.to_string();
    }
    if trimmed.to_ascii_lowercase().ends_with(ASSET_EXTENSION) {
        trimmed.to_string()
    } else {
        format!("{trimmed}{ASSET_EXTENSION}")
    }
}

impl RegionTerrainRecipe {
    /// Recipe as stored before overlays were grouped.
    pub fn with_legacy_overlays(mut self, overlays: Vec<TextureRef>, default_index: i32) -> Self {
        self.overlays_legacy = overlays;
        self.default_overlay_index_legacy = default_index;
        self
    }

    fn region_root(&self) -> String {
        combine_asset_path(&[&self.output_root_folder, &self.region_name, &self.area_ref])
    }

    pub fn terrain_asset_path(&self) -> String {
        let fallback = format!("{}_{}_TerrainData{}", self.region_name, self.area_ref, ASSET_EXTENSION);
        let file = ensure_asset_file_name(&self.terrain_asset_file_name, &fallback);
        combine_asset_path(&[&self.region_root(), &self.terrain_subfolder_name, &file])
    }

    pub fn region_level_asset_path(&self) -> String {
        let fallback = format!("{}_{}_RegionLevel{}", self.region_name, self.area_ref, ASSET_EXTENSION);
        let file = ensure_asset_file_name(&self.region_level_asset_file_name, &fallback);
        combine_asset_path(&[&self.region_root(), &self.region_level_subfolder_name, &file])
    }

    /// Migrate legacy overlays, sanitize groups and markers, clamp the default group.
    pub fn ensure_valid(&mut self) {
        migrate_legacy_overlays(
            &mut self.overlay_groups,
            &mut self.default_overlay_group_index,
            &mut self.overlays_legacy,
            self.default_overlay_index_legacy,
        );
        sanitize_overlay_groups(&mut self.overlay_groups, &mut self.default_overlay_group_index);
        for marker in &mut self.map_markers {
            marker.sanitize();
        }
    }

    /// Check the recipe before touching any file. Returns the RAW layout.
    pub fn validate(&self) -> RegionResult<RawHeightmapFormat> {
        let (width, height) = (self.heightmap_width, self.heightmap_height);
        if width == 0 || height == 0 {
            return Err(TerrainError::InvalidDimensions { width, height }.into());
        }
        if width != height {
            return Err(TerrainError::NonSquareHeightmap { width, height }.into());
        }
        if self.bit_depth != 8 && self.bit_depth != 16 {
            return Err(TerrainError::UnsupportedBitDepth(self.bit_depth).into());
        }
        if self.output_root_folder.trim().is_empty() {
            return Err(RegionError::InvalidRecipe(
                "output root folder must not be empty".to_string(),
            ));
        }
        let Some(raw) = self.raw_file.as_deref().filter(|p| !p.trim().is_empty()) else {
            return Err(RegionError::InvalidRecipe("RAW heightmap file is required".to_string()));
        };
        let lower = raw.to_ascii_lowercase();
        if !RAW_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
            return Err(RegionError::InvalidRecipe(format!(
                "RAW heightmap must be a .raw or .bytes file (got '{raw}')"
            )));
        }
        Ok(RawHeightmapFormat {
            width,
            height,
            bit_depth: self.bit_depth,
            byte_order: self.byte_order,
            flip_vertically: self.flip_vertically,
        })
    }

    /// Decode the RAW source and create or update the terrain asset and the
    /// region definition. The recipe's elevation range is updated too.
    pub fn generate(&mut self, db: &mut dyn AssetDatabase) -> RegionResult<GenerationResult> {
        let format = self.validate()?;
        let raw_path = self.raw_file.clone().unwrap_or_default();
        let bytes = db.read_bytes(&raw_path)?;
        let grid = decode_raw(&bytes, &format)?;

        let size = TerrainSize::new(
            self.terrain_size_meters_xz.x,
            self.max_terrain_height_meters,
            self.terrain_size_meters_xz.y,
        );
        let terrain_path = self.terrain_asset_path();
        let level_path = self.region_level_asset_path();

        let (terrain, terrain_created, range) = match load_asset::<TerrainData>(db, &terrain_path)? {
            Some(mut existing) => {
                let range = rebuild_terrain(&mut existing, &grid, size)?;
                (existing, false, range)
            }
            None => {
                let built = build_terrain(&grid, size)?;
                (built.data, true, built.range)
            }
        };
        save_asset(db, &terrain_path, &terrain)?;

        let (mut level, level_created) = match load_asset::<RegionLevel>(db, &level_path)? {
            Some(existing) => (existing, false),
            None => (RegionLevel::default(), true),
        };

        self.ensure_valid();
        level.region_name = self.region_name.clone();
        level.area_ref = self.area_ref.clone();
        level.terrain_asset = Some(terrain_path.clone());
        level.terrain_size_meters = size.as_vec3();
        level.raw_normalized_to_height = true;
        level.overlay_groups = clone_overlay_groups(&self.overlay_groups);
        level.default_group_index =
            clamp_index(self.default_overlay_group_index, level.overlay_groups.len()).unwrap_or(0) as i32;
        level.overlay_tiling_meters = self.overlay_tiling_meters;
        level.map_markers = clone_map_markers(&self.map_markers);
        level.z_min_meters = range.min_meters;
        level.z_max_meters = range.max_meters;
        level.ensure_valid();
        save_asset(db, &level_path, &level)?;

        self.z_min_meters = range.min_meters;
        self.z_max_meters = range.max_meters;

        Ok(GenerationResult {
            terrain_asset_path: terrain_path,
            terrain_created,
            region_level_asset_path: level_path,
            region_level_created: level_created,
            min_height_meters: range.min_meters,
            max_height_meters: range.max_meters,
        })
    }

    /// `generate`, logging the summary on success and the error on failure.
    pub fn generate_and_log(&mut self, db: &mut dyn AssetDatabase) -> RegionResult<GenerationResult> {
        match self.generate(db) {
            Ok(result) => {
                log::info!("RegionTerrainRecipe: {}", result);
                Ok(result)
            }
            Err(e) => {
                log::error!("RegionTerrainRecipe: failed to generate assets: {}", e);
                Err(e)
            }
        }
    }
}
