//! Region viewer - headless driver for region terrain, overlays and markers

mod config;
mod dialogue;

use std::path::Path;
use std::sync::mpsc::Receiver;
use std::sync::Arc;

use anyhow::{Context, Result};
use engine_core::{Scene, Time};
use glam::Vec3;
use region::{
    open_region_level, update_billboards, BoundaryWalls, FsAssetDatabase, OverlayLayerChanged,
    RegionLevel, RegionLoader, RegionTerrainRecipe,
};

use config::ViewerConfig;
use dialogue::{DialogueLine, ScriptedStory, StoryInterpreter, StoryScript};

/// Viewpoint circling the terrain centre.
#[derive(Debug, Clone, Copy)]
struct Orbit {
    radius: f32,
    height: f32,
    period: f32,
}

impl Orbit {
    fn position(&self, center: Vec3, elapsed: f32) -> Vec3 {
        let angle = if self.period > f32::EPSILON {
            elapsed / self.period * std::f32::consts::TAU
        } else {
            0.0
        };
        center + Vec3::new(angle.cos() * self.radius, self.height, angle.sin() * self.radius)
    }
}

/// Everything the tick loop owns.
struct Viewer {
    scene: Scene,
    time: Time,
    loader: RegionLoader,
    walls: Option<BoundaryWalls>,
    overlay_events: Receiver<OverlayLayerChanged>,
    story: ScriptedStory,
    story_lines: Receiver<DialogueLine>,
    orbit: Orbit,
    overlay_cycle_seconds: f32,
    next_overlay_at: f32,
}

impl Viewer {
    fn new(config: &ViewerConfig, script: StoryScript) -> Self {
        let mut scene = Scene::new();
        let mut loader = RegionLoader::new(config.loader.clone());
        let overlay_events = loader.subscribe_overlay_layer_changed();
        let walls = config.loader.boundary_walls.then(|| {
            BoundaryWalls::attach(&mut loader, &mut scene, config.loader.boundary_thickness_meters)
        });
        let mut story = ScriptedStory::new(script);
        let story_lines = story.subscribe_line_ready();
        Self {
            scene,
            time: Time::stepped(config.tick_rate_hz),
            loader,
            walls,
            overlay_events,
            story,
            story_lines,
            orbit: Orbit {
                radius: config.orbit_radius_meters,
                height: config.orbit_height_meters,
                period: config.orbit_period_seconds,
            },
            overlay_cycle_seconds: config.overlay_cycle_seconds,
            next_overlay_at: config.overlay_cycle_seconds,
        }
    }

    fn load(&mut self, level: RegionLevel, overlay_group: Option<&str>) -> Result<()> {
        self.loader
            .load_region(&mut self.scene, Some(Arc::new(level)))
            .context("loading region")?;
        // Deferred loads build on the next tick; run it now so the group switch lands.
        self.loader.update(&mut self.scene);
        if let Some(name) = overlay_group {
            self.loader.set_overlay_group_by_name(&mut self.scene, name);
        }
        self.story.start_dialogue("intro");
        Ok(())
    }

    fn terrain_center(&self) -> Vec3 {
        self.loader
            .level()
            .map(|level| level.terrain_size_meters * Vec3::new(0.5, 0.0, 0.5))
            .unwrap_or(Vec3::ZERO)
    }

    fn tick(&mut self) {
        self.time.update();
        let elapsed = self.time.elapsed_seconds();

        self.loader.update(&mut self.scene);
        if let Some(walls) = self.walls.as_mut() {
            walls.update(&mut self.scene);
        }

        if self.overlay_cycle_seconds > 0.0 && elapsed >= self.next_overlay_at {
            self.loader.next_overlay(&mut self.scene);
            self.next_overlay_at += self.overlay_cycle_seconds;
            if self.story.is_active() {
                self.story.choose_option(0);
            }
        }

        let viewpoint = self.orbit.position(self.terrain_center(), elapsed);
        update_billboards(&mut self.scene, viewpoint);

        for OverlayLayerChanged(layer) in self.overlay_events.try_iter() {
            match layer {
                Some(_) => log::info!(
                    "Overlay: {} [{}]",
                    self.loader
                        .current_overlay_group()
                        .map(|g| g.name.as_str())
                        .unwrap_or("-"),
                    self.loader.current_overlay_caption()
                ),
                None => log::info!("Overlay: none"),
            }
        }
        for line in self.story_lines.try_iter() {
            log::info!("{}: {}", line.speaker, line.text);
        }

        self.scene.end_frame();
    }

    fn run(&mut self, frames: u32) {
        for _ in 0..frames {
            self.tick();
        }
        log::info!(
            "Ran {} frames ({:.1}s), {} markers placed",
            self.time.frame_count(),
            self.time.elapsed_seconds(),
            self.loader.markers().len()
        );
    }
}

fn run_recipe(db: &mut FsAssetDatabase, path: &Path) -> Result<String> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("reading recipe {}", path.display()))?;
    let mut recipe: RegionTerrainRecipe =
        ron::from_str(&data).with_context(|| format!("parsing recipe {}", path.display()))?;
    let result = recipe.generate_and_log(db)?;

    // The recipe records the realized elevation range.
    let updated = ron::ser::to_string_pretty(&recipe, ron::ser::PrettyConfig::default())?;
    if let Err(e) = std::fs::write(path, updated) {
        log::warn!("Could not update recipe {:?}: {}", path, e);
    }
    Ok(result.region_level_asset_path)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ViewerConfig::load();
    log::info!("Starting region viewer (assets at {})", config.asset_root.display());

    let mut db = FsAssetDatabase::new(config.asset_root.clone());
    let generated = match &config.recipe {
        Some(path) => Some(run_recipe(&mut db, path)?),
        None => None,
    };
    let Some(level_path) = config.region_level.clone().or(generated) else {
        // Leave a template behind to fill in.
        config.save();
        anyhow::bail!("no region_level or recipe configured in region_viewer.ron");
    };
    let level = open_region_level(&db, &level_path)
        .with_context(|| format!("opening region {}", level_path))?;

    let script = match &config.story_script {
        Some(path) => StoryScript::load(path)?,
        None => StoryScript::briefing(),
    };

    let mut viewer = Viewer::new(&config, script);
    viewer.load(level, config.overlay_group.as_deref())?;
    viewer.run(config.frames);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use region::{LoadState, LoaderSettings, MapMarker, OverlayGroup, OverlayLayer};
    use engine_core::SpriteRef;
    use terrain::TerrainData;

    fn level() -> RegionLevel {
        let mut level = RegionLevel::new("BR", "A1").with_terrain(TerrainData::flat(3, Vec3::new(1000.0, 50.0, 1000.0)));
        level.overlay_groups = vec![
            OverlayGroup::new("Landsat", vec![OverlayLayer::new("l/0", 1, 1, 1990)]),
            OverlayGroup::new(
                "Sentinel",
                vec![OverlayLayer::new("s/0", 1, 6, 2019), OverlayLayer::new("s/1", 1, 6, 2020)],
            ),
        ];
        level
            .map_markers
            .push(MapMarker::new("Camp", 0.25, 0.75).with_icon(SpriteRef::new("icons/camp")));
        level.ensure_valid();
        level
    }

    #[test]
    fn orbit_circles_center() {
        let orbit = Orbit {
            radius: 10.0,
            height: 5.0,
            period: 4.0,
        };
        let center = Vec3::new(100.0, 0.0, 100.0);
        assert!((orbit.position(center, 0.0) - Vec3::new(110.0, 5.0, 100.0)).length() < 1e-4);
        assert!((orbit.position(center, 1.0) - Vec3::new(100.0, 5.0, 110.0)).length() < 1e-4);
    }

    #[test]
    fn viewer_loads_and_cycles_overlays() {
        let config = ViewerConfig {
            tick_rate_hz: 10.0,
            overlay_cycle_seconds: 0.5,
            loader: LoaderSettings::default(),
            ..Default::default()
        };
        let mut viewer = Viewer::new(&config, StoryScript::briefing());
        viewer.load(level(), Some("sentinel")).unwrap();
        assert_eq!(viewer.loader.state(), LoadState::Loaded);
        assert_eq!(viewer.loader.current_group_index(), 1);

        let start = viewer.loader.current_layer_index();
        viewer.run(8);
        assert_ne!(viewer.loader.current_layer_index(), start);
        assert_eq!(viewer.loader.markers().len(), 1);
        assert!(viewer.walls.as_ref().and_then(|w| w.root()).is_some());
    }
}
