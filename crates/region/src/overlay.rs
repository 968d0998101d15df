//! Overlay imagery: named groups of dated texture layers.
//!
//! Every lookup clamps instead of failing. A bad index coming from UI or
//! authoring data must never take a running region down.

use std::fmt::Write as _;

use chrono::{Datelike, NaiveDate};
use engine_core::{SpriteRef, TextureRef};
use serde::{Deserialize, Serialize};

use crate::error::{RegionError, RegionResult};

pub const MIN_YEAR: i32 = 1;
pub const MAX_YEAR: i32 = 9999;

/// Default date format for overlay captions.
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Clamp a caller-supplied index into `[0, len - 1]`. `None` when `len == 0`.
pub fn clamp_index(index: i32, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    let last = len - 1;
    Some(if index < 0 { 0 } else { (index as usize).min(last) })
}

/// Number of days in the given month of the proleptic Gregorian calendar.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month >= 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first_of_next| first_of_next.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

fn default_day() -> i32 {
    1
}
fn default_month() -> i32 {
    1
}
fn default_year() -> i32 {
    2000
}

/// One dated texture within an overlay group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayLayer {
    #[serde(default)]
    pub texture: Option<TextureRef>,
    #[serde(default = "default_day")]
    pub day: i32,
    #[serde(default = "default_month")]
    pub month: i32,
    #[serde(default = "default_year")]
    pub year: i32,
}

impl Default for OverlayLayer {
    fn default() -> Self {
        Self {
            texture: None,
            day: default_day(),
            month: default_month(),
            year: default_year(),
        }
    }
}

impl OverlayLayer {
    pub fn new(texture: impl Into<String>, day: i32, month: i32, year: i32) -> Self {
        Self {
            texture: Some(TextureRef::new(texture)),
            day,
            month,
            year,
        }
    }

    /// Layer migrated from a bare legacy texture; the date keeps its defaults.
    pub fn from_texture(texture: TextureRef) -> Self {
        Self {
            texture: Some(texture),
            ..Default::default()
        }
    }

    /// Clamp the date fields onto a real calendar date.
    pub fn sanitize(&mut self) {
        self.month = self.month.clamp(1, 12);
        self.year = self.year.clamp(MIN_YEAR, MAX_YEAR);
        let days = days_in_month(self.year, self.month as u32) as i32;
        self.day = self.day.clamp(1, days);
    }

    pub fn try_get_date(&self) -> RegionResult<NaiveDate> {
        let invalid = || RegionError::InvalidDate {
            day: self.day,
            month: self.month,
            year: self.year,
        };
        if !(MIN_YEAR..=MAX_YEAR).contains(&self.year) || self.month < 1 || self.day < 1 {
            return Err(invalid());
        }
        NaiveDate::from_ymd_opt(self.year, self.month as u32, self.day as u32).ok_or_else(invalid)
    }

    /// Date rendered with a strftime-style `format`; empty when the date is
    /// invalid or the format cannot be rendered.
    pub fn formatted_date(&self, format: &str) -> String {
        let Ok(date) = self.try_get_date() else {
            return String::new();
        };
        let mut out = String::new();
        if write!(out, "{}", date.format(format)).is_err() {
            log::warn!("Overlay date format {:?} could not be rendered", format);
            return String::new();
        }
        out
    }
}

fn default_group_name() -> String {
    "Default".to_string()
}

/// Named category of dated overlay layers, in display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredOverlayGroup")]
pub struct OverlayGroup {
    #[serde(default = "default_group_name")]
    pub name: String,
    #[serde(default)]
    pub icon: Option<SpriteRef>,
    #[serde(default)]
    pub layers: Vec<OverlayLayer>,
    #[serde(default)]
    pub default_layer_index: i32,
    /// Flat texture list written by older asset versions, either under
    /// `layers` (plain texture ids) or under this key. Migrated into `layers`
    /// by `sanitize`, then emptied.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    legacy_layers: Vec<TextureRef>,
}

/// `layers` as found on disk: dated layer records, or the bare texture list
/// older assets stored under the same key.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredLayers {
    Dated(Vec<OverlayLayer>),
    Textures(Vec<TextureRef>),
}

impl Default for StoredLayers {
    fn default() -> Self {
        StoredLayers::Dated(Vec::new())
    }
}

#[derive(Deserialize)]
struct StoredOverlayGroup {
    #[serde(default = "default_group_name")]
    name: String,
    #[serde(default)]
    icon: Option<SpriteRef>,
    #[serde(default)]
    layers: StoredLayers,
    #[serde(default)]
    default_layer_index: i32,
    #[serde(default)]
    legacy_layers: Vec<TextureRef>,
}

impl From<StoredOverlayGroup> for OverlayGroup {
    fn from(stored: StoredOverlayGroup) -> Self {
        let (layers, mut legacy_layers) = match stored.layers {
            StoredLayers::Dated(layers) => (layers, Vec::new()),
            StoredLayers::Textures(textures) => (Vec::new(), textures),
        };
        if legacy_layers.is_empty() {
            legacy_layers = stored.legacy_layers;
        }
        Self {
            name: stored.name,
            icon: stored.icon,
            layers,
            default_layer_index: stored.default_layer_index,
            legacy_layers,
        }
    }
}

impl Default for OverlayGroup {
    fn default() -> Self {
        Self {
            name: default_group_name(),
            icon: None,
            layers: Vec::new(),
            default_layer_index: 0,
            legacy_layers: Vec::new(),
        }
    }
}

impl OverlayGroup {
    pub fn new(name: impl Into<String>, layers: Vec<OverlayLayer>) -> Self {
        Self {
            name: name.into(),
            layers,
            ..Default::default()
        }
    }

    /// Group as stored by older assets: textures only, no layer records.
    pub fn from_legacy_textures(name: impl Into<String>, textures: Vec<TextureRef>) -> Self {
        Self {
            name: name.into(),
            legacy_layers: textures,
            ..Default::default()
        }
    }

    pub fn with_default_layer(mut self, index: i32) -> Self {
        self.default_layer_index = index;
        self
    }

    pub fn with_icon(mut self, icon: SpriteRef) -> Self {
        self.icon = Some(icon);
        self
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn has_legacy_layers(&self) -> bool {
        !self.legacy_layers.is_empty()
    }

    /// Clamped position of `index` in `layers`.
    pub fn layer_position(&self, index: i32) -> Option<usize> {
        clamp_index(index, self.layers.len())
    }

    pub fn default_layer_position(&self) -> Option<usize> {
        self.layer_position(self.default_layer_index)
    }

    pub fn layer(&self, index: i32) -> Option<&OverlayLayer> {
        self.layer_position(index).map(|i| &self.layers[i])
    }

    pub fn default_layer(&self) -> Option<&OverlayLayer> {
        self.layer(self.default_layer_index)
    }

    pub fn layer_texture(&self, index: i32) -> Option<&TextureRef> {
        self.layer(index)?.texture.as_ref()
    }

    pub fn default_layer_texture(&self) -> Option<&TextureRef> {
        self.default_layer()?.texture.as_ref()
    }

    /// Migrate legacy storage, sanitize every layer and clamp the default index.
    /// Idempotent.
    pub fn sanitize(&mut self) {
        self.migrate_legacy_layers_if_needed();
        for layer in &mut self.layers {
            layer.sanitize();
        }
        self.default_layer_index = self.default_layer_position().unwrap_or(0) as i32;
    }

    /// Returns `true` if legacy textures were moved into `layers`.
    fn migrate_legacy_layers_if_needed(&mut self) -> bool {
        if !self.layers.is_empty() || self.legacy_layers.is_empty() {
            return false;
        }
        self.layers = std::mem::take(&mut self.legacy_layers)
            .into_iter()
            .map(OverlayLayer::from_texture)
            .collect();
        log::debug!(
            "Overlay group '{}': migrated {} legacy layers",
            self.name,
            self.layers.len()
        );
        true
    }
}

/// Read access to a two-level overlay catalog (groups → layers).
pub trait OverlayCatalog {
    fn overlay_groups(&self) -> &[OverlayGroup];

    /// Authored default group index (may be out of range before sanitizing).
    fn default_group_index(&self) -> i32;

    fn group_count(&self) -> usize {
        self.overlay_groups().len()
    }

    fn group_position(&self, index: i32) -> Option<usize> {
        clamp_index(index, self.group_count())
    }

    fn group(&self, index: i32) -> Option<&OverlayGroup> {
        self.group_position(index).map(|i| &self.overlay_groups()[i])
    }

    fn default_group(&self) -> Option<&OverlayGroup> {
        self.group(self.default_group_index())
    }

    fn layer(&self, group: i32, layer: i32) -> Option<&OverlayLayer> {
        self.group(group)?.layer(layer)
    }

    fn layer_texture(&self, group: i32, layer: i32) -> Option<&TextureRef> {
        self.group(group)?.layer_texture(layer)
    }

    fn default_layer(&self) -> Option<&OverlayLayer> {
        self.default_group()?.default_layer()
    }

    fn default_layer_texture(&self) -> Option<&TextureRef> {
        self.default_group()?.default_layer_texture()
    }

    /// Index of the first group whose name matches, ignoring case.
    fn find_group(&self, name: &str) -> Option<usize> {
        if name.is_empty() {
            return None;
        }
        let wanted = name.to_lowercase();
        self.overlay_groups()
            .iter()
            .position(|g| g.name.to_lowercase() == wanted)
    }
}

/// Sanitize every group and clamp the default group index.
pub fn sanitize_overlay_groups(groups: &mut [OverlayGroup], default_group_index: &mut i32) {
    for group in groups.iter_mut() {
        group.sanitize();
    }
    *default_group_index = clamp_index(*default_group_index, groups.len()).unwrap_or(0) as i32;
}

/// Layers built from a legacy flat texture list, each sanitized.
pub fn layers_from_legacy_textures(textures: &[TextureRef]) -> Vec<OverlayLayer> {
    textures
        .iter()
        .cloned()
        .map(|t| {
            let mut layer = OverlayLayer::from_texture(t);
            layer.sanitize();
            layer
        })
        .collect()
}

/// Replace an empty group list with a single "Default" group built from a
/// legacy flat overlay list. Returns `true` if a migration happened; the
/// legacy list is emptied so this runs once.
pub fn migrate_legacy_overlays(
    groups: &mut Vec<OverlayGroup>,
    default_group_index: &mut i32,
    legacy_overlays: &mut Vec<TextureRef>,
    legacy_default_index: i32,
) -> bool {
    if !groups.is_empty() || legacy_overlays.is_empty() {
        return false;
    }
    let layers = layers_from_legacy_textures(legacy_overlays);
    let default_layer = clamp_index(legacy_default_index, layers.len()).unwrap_or(0) as i32;
    groups.push(OverlayGroup::new(default_group_name(), layers).with_default_layer(default_layer));
    *default_group_index = 0;
    legacy_overlays.clear();
    true
}

/// Deep copy of a group list. The copies are sanitized; the source is not touched.
pub fn clone_overlay_groups(source: &[OverlayGroup]) -> Vec<OverlayGroup> {
    source
        .iter()
        .map(|group| {
            let mut copy = group.clone();
            copy.sanitize();
            copy
        })
        .collect()
}
