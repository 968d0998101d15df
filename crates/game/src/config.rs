//! Viewer configuration (assets, region, tick loop). Loaded from region_viewer.ron at startup.

use region::LoaderSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Persistent viewer settings. Loaded from `region_viewer.ron` in the current directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerConfig {
    /// Root directory of the asset database.
    #[serde(default = "default_asset_root")]
    pub asset_root: PathBuf,
    /// Terrain recipe (RON file) to run before loading. Its output becomes the
    /// loaded region unless `region_level` is set.
    #[serde(default)]
    pub recipe: Option<PathBuf>,
    /// Asset path of the region definition to show.
    #[serde(default)]
    pub region_level: Option<String>,
    /// Overlay group selected after load (case-insensitive name).
    #[serde(default)]
    pub overlay_group: Option<String>,
    /// Story script (RON). The built-in briefing is used when unset.
    #[serde(default)]
    pub story_script: Option<PathBuf>,
    /// Frames to simulate before exiting.
    #[serde(default = "default_frames")]
    pub frames: u32,
    /// Fixed tick rate of the headless loop.
    #[serde(default = "default_tick_rate")]
    pub tick_rate_hz: f64,
    /// Seconds between automatic overlay layer changes (0 disables).
    #[serde(default = "default_overlay_cycle")]
    pub overlay_cycle_seconds: f32,
    /// Viewpoint orbit around the terrain centre.
    #[serde(default = "default_orbit_radius")]
    pub orbit_radius_meters: f32,
    #[serde(default = "default_orbit_height")]
    pub orbit_height_meters: f32,
    #[serde(default = "default_orbit_period")]
    pub orbit_period_seconds: f32,
    #[serde(default)]
    pub loader: LoaderSettings,
}

fn default_asset_root() -> PathBuf {
    PathBuf::from("assets")
}
fn default_frames() -> u32 {
    600
}
fn default_tick_rate() -> f64 {
    60.0
}
fn default_overlay_cycle() -> f32 {
    2.0
}
fn default_orbit_radius() -> f32 {
    4000.0
}
fn default_orbit_height() -> f32 {
    1500.0
}
fn default_orbit_period() -> f32 {
    20.0
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            asset_root: default_asset_root(),
            recipe: None,
            region_level: None,
            overlay_group: None,
            story_script: None,
            frames: default_frames(),
            tick_rate_hz: default_tick_rate(),
            overlay_cycle_seconds: default_overlay_cycle(),
            orbit_radius_meters: default_orbit_radius(),
            orbit_height_meters: default_orbit_height(),
            orbit_period_seconds: default_orbit_period(),
            loader: LoaderSettings::default(),
        }
    }
}

impl ViewerConfig {
    /// Load config from `region_viewer.ron`. If the file is missing or invalid, returns default config.
    pub fn load() -> Self {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        if let Ok(data) = std::fs::read_to_string(path) {
            match ron::from_str(&data) {
                Ok(c) => return c,
                Err(e) => log::warn!("Invalid config at {:?}: {}, using defaults", path, e),
            }
        }
        Self::default()
    }

    /// Save current config to `region_viewer.ron`. Logs on error.
    pub fn save(&self) {
        let path = config_path();
        if let Ok(s) = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default()) {
            if let Err(e) = std::fs::write(&path, s) {
                log::warn!("Could not write config to {:?}: {}", path, e);
            }
        }
    }
}

fn config_path() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")).join("region_viewer.ron")
}

#[cfg(test)]
mod tests {
    use super::*;
    use region::LoadMode;

    #[test]
    fn partial_config_keeps_defaults() {
        let config: ViewerConfig =
            ron::from_str("(frames: 10, overlay_group: Some(\"landsat\"), loader: (load_mode: Immediate))").unwrap();
        assert_eq!(config.frames, 10);
        assert_eq!(config.overlay_group.as_deref(), Some("landsat"));
        assert_eq!(config.loader.load_mode, LoadMode::Immediate);
        assert_eq!(config.tick_rate_hz, 60.0);
        assert_eq!(config.asset_root, PathBuf::from("assets"));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = ViewerConfig::load_from(Path::new("/nonexistent/region_viewer.ron"));
        assert_eq!(config.frames, 600);
        assert!(config.recipe.is_none());
    }
}
