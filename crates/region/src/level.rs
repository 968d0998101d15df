//! Region definitions: terrain, overlays and map markers for one playable area.

use std::sync::Arc;

use engine_core::{SpriteRef, TextureRef};
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use terrain::TerrainData;

use crate::overlay::{
    clone_overlay_groups, migrate_legacy_overlays, sanitize_overlay_groups, OverlayCatalog,
    OverlayGroup,
};

/// Point of interest pinned to the terrain surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapMarker {
    #[serde(default)]
    pub display_name: String,
    /// Position along X as a fraction of the terrain width, `[0, 1]`.
    #[serde(default)]
    pub normalized_x: f32,
    /// Position along Z as a fraction of the terrain depth, `[0, 1]`.
    #[serde(default)]
    pub normalized_z: f32,
    /// Added on top of the sampled terrain height.
    #[serde(default)]
    pub height_offset_meters: f32,
    /// Markers without an icon are not placed.
    #[serde(default)]
    pub icon: Option<SpriteRef>,
    /// World-space size (x = width, y = height).
    #[serde(default = "default_marker_size")]
    pub world_size_meters: Vec2,
}

fn default_marker_size() -> Vec2 {
    Vec2::ONE
}

impl Default for MapMarker {
    fn default() -> Self {
        Self {
            display_name: String::new(),
            normalized_x: 0.0,
            normalized_z: 0.0,
            height_offset_meters: 0.0,
            icon: None,
            world_size_meters: default_marker_size(),
        }
    }
}

impl MapMarker {
    pub fn new(display_name: impl Into<String>, normalized_x: f32, normalized_z: f32) -> Self {
        Self {
            display_name: display_name.into(),
            normalized_x,
            normalized_z,
            ..Default::default()
        }
    }

    pub fn with_icon(mut self, icon: SpriteRef) -> Self {
        self.icon = Some(icon);
        self
    }

    pub fn with_height_offset(mut self, meters: f32) -> Self {
        self.height_offset_meters = meters;
        self
    }

    pub fn with_world_size(mut self, size: Vec2) -> Self {
        self.world_size_meters = size;
        self
    }

    /// Replace non-finite values with safe defaults and clamp coordinates.
    pub fn sanitize(&mut self) {
        self.normalized_x = finite_or(self.normalized_x, 0.0).clamp(0.0, 1.0);
        self.normalized_z = finite_or(self.normalized_z, 0.0).clamp(0.0, 1.0);
        self.height_offset_meters = finite_or(self.height_offset_meters, 0.0);
        self.world_size_meters = Vec2::new(
            positive_size(self.world_size_meters.x),
            positive_size(self.world_size_meters.y),
        );
    }
}

fn finite_or(v: f32, fallback: f32) -> f32 {
    if v.is_finite() {
        v
    } else {
        fallback
    }
}

fn positive_size(v: f32) -> f32 {
    if v.is_finite() {
        v.abs().max(f32::EPSILON)
    } else {
        1.0
    }
}

/// Deep copy of a marker list with every copy sanitized.
pub fn clone_map_markers(source: &[MapMarker]) -> Vec<MapMarker> {
    source
        .iter()
        .map(|marker| {
            let mut copy = marker.clone();
            copy.sanitize();
            copy
        })
        .collect()
}

fn default_region_name() -> String {
    "BR-Region".to_string()
}
fn default_area_ref() -> String {
    "Area10km".to_string()
}
fn default_terrain_size() -> Vec3 {
    Vec3::new(10_000.0, 200.0, 10_000.0)
}
fn default_tiling() -> Vec2 {
    Vec2::new(10_000.0, 10_000.0)
}
fn default_true() -> bool {
    true
}
fn default_z_max() -> f32 {
    200.0
}

/// A playable region: terrain, overlay catalog and map markers.
///
/// Authored or generated offline, then shared read-only (behind an `Arc`)
/// by every loader that shows it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionLevel {
    #[serde(default = "default_region_name")]
    pub region_name: String,
    #[serde(default = "default_area_ref")]
    pub area_ref: String,

    /// Asset path of the terrain resource.
    #[serde(default)]
    pub terrain_asset: Option<String>,
    /// Terrain resource, resolved from `terrain_asset` when the level is loaded.
    #[serde(skip)]
    pub terrain: Option<Arc<TerrainData>>,
    #[serde(default = "default_terrain_size")]
    pub terrain_size_meters: Vec3,
    #[serde(default = "default_true")]
    pub raw_normalized_to_height: bool,

    #[serde(default)]
    pub overlay_groups: Vec<OverlayGroup>,
    #[serde(default)]
    pub default_group_index: i32,
    /// Flat overlay list from before overlays were grouped.
    #[serde(default, rename = "overlays", skip_serializing_if = "Vec::is_empty")]
    overlays_legacy: Vec<TextureRef>,
    #[serde(default, rename = "default_overlay_index", skip_serializing_if = "is_zero")]
    default_overlay_index_legacy: i32,

    #[serde(default = "default_tiling")]
    pub overlay_tiling_meters: Vec2,

    #[serde(default)]
    pub map_markers: Vec<MapMarker>,

    #[serde(default)]
    pub z_min_meters: f32,
    #[serde(default = "default_z_max")]
    pub z_max_meters: f32,
}

fn is_zero(v: &i32) -> bool {
    *v == 0
}

impl Default for RegionLevel {
    fn default() -> Self {
        Self {
            region_name: default_region_name(),
            area_ref: default_area_ref(),
            terrain_asset: None,
            terrain: None,
            terrain_size_meters: default_terrain_size(),
            raw_normalized_to_height: true,
            overlay_groups: Vec::new(),
            default_group_index: 0,
            overlays_legacy: Vec::new(),
            default_overlay_index_legacy: 0,
            overlay_tiling_meters: default_tiling(),
            map_markers: Vec::new(),
            z_min_meters: 0.0,
            z_max_meters: default_z_max(),
        }
    }
}

impl OverlayCatalog for RegionLevel {
    fn overlay_groups(&self) -> &[OverlayGroup] {
        &self.overlay_groups
    }

    fn default_group_index(&self) -> i32 {
        self.default_group_index
    }
}

impl RegionLevel {
    pub fn new(region_name: impl Into<String>, area_ref: impl Into<String>) -> Self {
        Self {
            region_name: region_name.into(),
            area_ref: area_ref.into(),
            ..Default::default()
        }
    }

    /// Level as stored before overlays were grouped: a flat texture list
    /// and a default index into it.
    pub fn with_legacy_overlays(mut self, overlays: Vec<TextureRef>, default_index: i32) -> Self {
        self.overlays_legacy = overlays;
        self.default_overlay_index_legacy = default_index;
        self
    }

    pub fn with_terrain(mut self, terrain: TerrainData) -> Self {
        self.terrain_size_meters = terrain.size();
        self.terrain = Some(Arc::new(terrain));
        self
    }

    pub fn has_legacy_overlays(&self) -> bool {
        !self.overlays_legacy.is_empty()
    }

    /// `"{region}/{area}"`, used in logs and entity names.
    pub fn display_id(&self) -> String {
        format!("{}/{}", self.region_name, self.area_ref)
    }

    /// Bring the definition into a consistent state: migrate legacy overlays,
    /// sanitize groups, clamp the default group and sanitize markers.
    /// Run after deserializing and after every authoring edit. Idempotent.
    pub fn ensure_valid(&mut self) {
        migrate_legacy_overlays(
            &mut self.overlay_groups,
            &mut self.default_group_index,
            &mut self.overlays_legacy,
            self.default_overlay_index_legacy,
        );
        sanitize_overlay_groups(&mut self.overlay_groups, &mut self.default_group_index);
        for marker in &mut self.map_markers {
            marker.sanitize();
        }
    }

    /// Copy of the definition whose groups and markers share nothing with `self`.
    pub fn deep_clone(&self) -> Self {
        Self {
            overlay_groups: clone_overlay_groups(&self.overlay_groups),
            map_markers: clone_map_markers(&self.map_markers),
            ..self.clone()
        }
    }
}
