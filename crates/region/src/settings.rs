//! Loader settings. Embedded in the host's config file.

use serde::{Deserialize, Serialize};

use crate::overlay::DEFAULT_DATE_FORMAT;

/// How `RegionLoader::load_region` replaces an existing terrain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadMode {
    /// Destroy and rebuild synchronously (tools, edit time).
    Immediate,
    /// Queue the load; `RegionLoader::update` tears down, waits for the scene
    /// to confirm the old terrain is gone, then builds.
    #[default]
    Deferred,
}

/// Runtime behaviour of a region loader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderSettings {
    #[serde(default)]
    pub load_mode: LoadMode,
    /// Markers only turn around the vertical axis.
    #[serde(default = "default_true")]
    pub lock_markers_to_world_up: bool,
    /// Build boundary walls around every new terrain.
    #[serde(default = "default_true")]
    pub boundary_walls: bool,
    /// Boundary wall thickness in meters.
    #[serde(default = "default_wall_thickness")]
    pub boundary_thickness_meters: f32,
    /// strftime-style format for overlay layer captions.
    #[serde(default = "default_date_format")]
    pub overlay_date_format: String,
}

fn default_true() -> bool {
    true
}
fn default_wall_thickness() -> f32 {
    5.0
}
fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.to_string()
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            load_mode: LoadMode::default(),
            lock_markers_to_world_up: default_true(),
            boundary_walls: default_true(),
            boundary_thickness_meters: default_wall_thickness(),
            overlay_date_format: default_date_format(),
        }
    }
}

impl LoaderSettings {
    pub fn immediate() -> Self {
        Self {
            load_mode: LoadMode::Immediate,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let settings: LoaderSettings = ron::from_str("(load_mode: Immediate)").unwrap();
        assert_eq!(settings.load_mode, LoadMode::Immediate);
        assert!(settings.lock_markers_to_world_up);
        assert_eq!(settings.boundary_thickness_meters, 5.0);
        assert_eq!(settings.overlay_date_format, "%Y-%m-%d");
    }
}
