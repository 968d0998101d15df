//! Runtime region loading: terrain instantiation, overlay selection and
//! marker placement.
//!
//! The loader owns the terrain entity it creates and everything parented
//! under it. Every mutation goes through `&mut Scene`, so the host decides
//! when loads, overlay switches and frame ends happen.

use std::sync::mpsc::Receiver;
use std::sync::Arc;

use engine_core::{EventChannel, Name, Parent, Scene, SpriteRenderer, TextureRef, Transform};
use glam::{Vec2, Vec3};
use hecs::Entity;
use terrain::TerrainData;

use crate::billboard::{marker_scale, marker_world_position, Billboard};
use crate::error::{RegionError, RegionResult};
use crate::level::RegionLevel;
use crate::overlay::{clamp_index, OverlayCatalog, OverlayGroup, OverlayLayer};
use crate::settings::{LoadMode, LoaderSettings};

/// Texture layer painted over the whole terrain.
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainLayer {
    pub texture: TextureRef,
    /// World size of one texture tile, in meters.
    pub tile_size: Vec2,
    pub tile_offset: Vec2,
}

/// Terrain component spawned by the loader.
#[derive(Debug, Clone)]
pub struct TerrainInstance {
    pub data: Arc<TerrainData>,
    pub base_layer: TerrainLayer,
}

/// Tags the parent entity of all marker sprites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerRoot;

/// Published after every overlay resolution, including the one at load time.
/// `None` when the bound region has no layer to show.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayLayerChanged(pub Option<OverlayLayer>);

/// `None` right before the loader tears its terrain down, `Some` right after
/// it spawns a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerrainCreated(pub Option<Entity>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Unloaded,
    /// A load is queued. `awaiting` is the old terrain that must leave the
    /// scene before the new one is built.
    Loading { awaiting: Option<Entity> },
    Loaded,
}

pub struct RegionLoader {
    settings: LoaderSettings,
    level: Option<Arc<RegionLevel>>,
    state: LoadState,
    pending: Option<Arc<RegionLevel>>,
    terrain: Option<Entity>,
    marker_root: Option<Entity>,
    markers: Vec<Entity>,
    current_group: usize,
    current_layer: usize,
    overlay_layer_changed: EventChannel<OverlayLayerChanged>,
    terrain_created: EventChannel<TerrainCreated>,
}

impl RegionLoader {
    pub fn new(settings: LoaderSettings) -> Self {
        Self {
            settings,
            level: None,
            state: LoadState::Unloaded,
            pending: None,
            terrain: None,
            marker_root: None,
            markers: Vec::new(),
            current_group: 0,
            current_layer: 0,
            overlay_layer_changed: EventChannel::new(),
            terrain_created: EventChannel::new(),
        }
    }

    pub fn settings(&self) -> &LoaderSettings {
        &self.settings
    }

    pub fn level(&self) -> Option<&Arc<RegionLevel>> {
        self.level.as_ref()
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn terrain(&self) -> Option<Entity> {
        self.terrain
    }

    pub fn marker_root(&self) -> Option<Entity> {
        self.marker_root
    }

    pub fn markers(&self) -> &[Entity] {
        &self.markers
    }

    pub fn current_group_index(&self) -> usize {
        self.current_group
    }

    pub fn current_layer_index(&self) -> usize {
        self.current_layer
    }

    pub fn current_overlay_group(&self) -> Option<&OverlayGroup> {
        self.level.as_ref()?.group(to_i32(self.current_group))
    }

    pub fn current_overlay_layer(&self) -> Option<&OverlayLayer> {
        self.current_overlay_group()?.layer(to_i32(self.current_layer))
    }

    /// Caption for the current layer, rendered with the configured date format.
    pub fn current_overlay_caption(&self) -> String {
        self.current_overlay_layer()
            .map(|layer| layer.formatted_date(&self.settings.overlay_date_format))
            .unwrap_or_default()
    }

    pub fn subscribe_overlay_layer_changed(&mut self) -> Receiver<OverlayLayerChanged> {
        self.overlay_layer_changed.subscribe()
    }

    pub fn subscribe_terrain_created(&mut self) -> Receiver<TerrainCreated> {
        self.terrain_created.subscribe()
    }

    /// Bind a region and (re)build its terrain.
    ///
    /// Missing data is logged and reported; the previous terrain stays up.
    /// In `Deferred` mode the build happens in a later `update`.
    pub fn load_region(&mut self, scene: &mut Scene, level: Option<Arc<RegionLevel>>) -> RegionResult<()> {
        let Some(level) = level else {
            log::error!("RegionLoader: region data missing");
            return Err(RegionError::MissingRegionData);
        };
        if level.terrain.is_none() {
            log::error!("RegionLoader: terrain data missing for {}", level.display_id());
            return Err(RegionError::MissingTerrainData(level.display_id()));
        }

        self.level = Some(Arc::clone(&level));
        self.reset_overlay_state(&level);

        match self.settings.load_mode {
            LoadMode::Immediate => {
                self.pending = None;
                self.destroy_terrain(scene, true);
                self.create_terrain(scene, &level)
            }
            LoadMode::Deferred => {
                self.queue_load(scene, level);
                Ok(())
            }
        }
    }

    fn queue_load(&mut self, scene: &mut Scene, level: Arc<RegionLevel>) {
        self.pending = Some(level);
        if matches!(self.state, LoadState::Loading { .. }) {
            return;
        }
        let awaiting = self.destroy_terrain(scene, false);
        self.state = LoadState::Loading { awaiting };
    }

    /// Advance a deferred load. Call once per frame, before `Scene::end_frame`.
    pub fn update(&mut self, scene: &mut Scene) {
        let LoadState::Loading { awaiting } = self.state else {
            return;
        };
        if let Some(old) = awaiting {
            if scene.contains(old) {
                log::trace!("RegionLoader: waiting for old terrain to be destroyed");
                return;
            }
        }
        let Some(level) = self.pending.take() else {
            self.state = LoadState::Unloaded;
            return;
        };
        if let Err(e) = self.create_terrain(scene, &level) {
            log::error!("RegionLoader: failed to load {}: {}", level.display_id(), e);
            self.state = LoadState::Unloaded;
        }
    }

    /// Tear down the terrain and markers and forget the bound region.
    pub fn unload(&mut self, scene: &mut Scene) {
        let immediate = self.settings.load_mode == LoadMode::Immediate;
        self.destroy_terrain(scene, immediate);
        self.pending = None;
        self.level = None;
        self.current_group = 0;
        self.current_layer = 0;
        self.state = LoadState::Unloaded;
    }

    /// Announce and destroy the current terrain. Returns the destroyed entity.
    fn destroy_terrain(&mut self, scene: &mut Scene, immediate: bool) -> Option<Entity> {
        let old = self.terrain.take()?;
        self.terrain_created.publish(TerrainCreated(None));
        self.clear_markers(scene);
        if immediate {
            scene.destroy_immediate(old);
        } else {
            scene.destroy(old);
        }
        Some(old)
    }

    fn create_terrain(&mut self, scene: &mut Scene, level: &RegionLevel) -> RegionResult<()> {
        let Some(source) = level.terrain.as_ref() else {
            return Err(RegionError::MissingTerrainData(level.display_id()));
        };
        let data = if source.size() == level.terrain_size_meters {
            Arc::clone(source)
        } else {
            Arc::new(source.with_size(level.terrain_size_meters))
        };

        let name = format!("{}_{}_Terrain", level.region_name, level.area_ref);
        let entity = scene.spawn((
            Name::new(name),
            Transform::default(),
            TerrainInstance {
                data: Arc::clone(&data),
                base_layer: TerrainLayer {
                    texture: TextureRef::blank(),
                    tile_size: level.overlay_tiling_meters,
                    tile_offset: Vec2::ZERO,
                },
            },
        ));
        self.terrain = Some(entity);
        self.state = LoadState::Loaded;
        self.terrain_created.publish(TerrainCreated(Some(entity)));

        self.apply_overlay_texture(scene);
        self.refresh_markers(scene, level, &data);

        log::info!("Loaded {}", level.display_id());
        Ok(())
    }

    fn reset_overlay_state(&mut self, level: &RegionLevel) {
        self.current_group = level.group_position(level.default_group_index).unwrap_or(0);
        self.current_layer = level
            .group(to_i32(self.current_group))
            .and_then(OverlayGroup::default_layer_position)
            .unwrap_or(0);
    }

    /// Switch group, keeping the current layer index (clamped to the new group).
    pub fn set_overlay(&mut self, scene: &mut Scene, group: i32) {
        let Some(level) = self.level.clone() else {
            return;
        };
        match level.group_position(group) {
            Some(g) => {
                self.current_group = g;
                let count = level.overlay_groups[g].layer_count();
                self.current_layer = self.current_layer.min(count.saturating_sub(1));
            }
            None => {
                self.current_group = 0;
                self.current_layer = 0;
            }
        }
        self.apply_overlay_texture(scene);
    }

    /// Switch group and layer in one step. The requested layer is kept,
    /// clamped to the group's layer count.
    pub fn set_overlay_with_layer(&mut self, scene: &mut Scene, group: i32, layer: i32) {
        self.current_layer = layer.max(0) as usize;
        self.set_overlay(scene, group);
    }

    /// Switch group and jump to its default layer.
    pub fn set_overlay_group(&mut self, scene: &mut Scene, group: i32) {
        let Some(level) = self.level.clone() else {
            return;
        };
        match level.group_position(group) {
            Some(g) => {
                self.current_group = g;
                self.current_layer = level.overlay_groups[g].default_layer_position().unwrap_or(0);
            }
            None => {
                self.current_group = 0;
                self.current_layer = 0;
            }
        }
        self.apply_overlay_texture(scene);
    }

    /// Case-insensitive lookup of a group by name. Returns `false` (and
    /// changes nothing) when no group matches.
    pub fn set_overlay_group_by_name(&mut self, scene: &mut Scene, name: &str) -> bool {
        let Some(index) = self.level.as_ref().and_then(|level| level.find_group(name)) else {
            log::warn!("RegionLoader: no overlay group named {:?}", name);
            return false;
        };
        self.set_overlay_group(scene, to_i32(index));
        true
    }

    /// Select a layer of the current group. No-op when the group is empty.
    pub fn set_overlay_layer(&mut self, scene: &mut Scene, layer: i32) {
        let Some(count) = self.current_layer_count() else {
            return;
        };
        if let Some(l) = clamp_index(layer, count) {
            self.current_layer = l;
            self.apply_overlay_texture(scene);
        }
    }

    pub fn next_overlay(&mut self, scene: &mut Scene) {
        let Some(count) = self.current_layer_count().filter(|&n| n > 0) else {
            return;
        };
        self.current_layer = (self.current_layer + 1) % count;
        self.apply_overlay_texture(scene);
    }

    pub fn previous_overlay(&mut self, scene: &mut Scene) {
        let Some(count) = self.current_layer_count().filter(|&n| n > 0) else {
            return;
        };
        self.current_layer = (self.current_layer % count + count - 1) % count;
        self.apply_overlay_texture(scene);
    }

    fn current_layer_count(&self) -> Option<usize> {
        self.current_overlay_group().map(OverlayGroup::layer_count)
    }

    /// Normalize the indices and resolve the texture to show. Falls back to
    /// the blank texture whenever there is no layer.
    fn resolve_overlay_texture(&mut self) -> TextureRef {
        let Some(level) = self.level.clone() else {
            self.current_group = 0;
            self.current_layer = 0;
            return TextureRef::blank();
        };
        let Some(g) = level.group_position(to_i32(self.current_group)) else {
            self.current_group = 0;
            self.current_layer = 0;
            return TextureRef::blank();
        };
        self.current_group = g;
        let group = &level.overlay_groups[g];
        match group.layer_position(to_i32(self.current_layer)) {
            Some(l) => {
                self.current_layer = l;
                group.layers[l].texture.clone().unwrap_or_else(TextureRef::blank)
            }
            None => {
                self.current_layer = 0;
                TextureRef::blank()
            }
        }
    }

    fn apply_overlay_texture(&mut self, scene: &mut Scene) {
        let Some(terrain) = self.terrain else {
            return;
        };
        if scene.world().get::<&TerrainInstance>(terrain).is_err() {
            return;
        }
        let texture = self.resolve_overlay_texture();
        if let Ok(mut instance) = scene.world_mut().get::<&mut TerrainInstance>(terrain) {
            log::debug!("RegionLoader: overlay -> {}", texture.id());
            instance.base_layer.texture = texture;
            instance.base_layer.tile_offset = Vec2::ZERO;
        }
        let layer = self.current_overlay_layer().cloned();
        self.overlay_layer_changed.publish(OverlayLayerChanged(layer));
    }

    fn clear_markers(&mut self, scene: &mut Scene) {
        self.markers.clear();
        let Some(root) = self.marker_root.take() else {
            return;
        };
        match self.settings.load_mode {
            LoadMode::Immediate => scene.destroy_immediate(root),
            LoadMode::Deferred => scene.destroy(root),
        }
    }

    fn refresh_markers(&mut self, scene: &mut Scene, level: &RegionLevel, data: &TerrainData) {
        self.clear_markers(scene);
        let Some(terrain) = self.terrain else {
            return;
        };
        if level.map_markers.is_empty() {
            return;
        }

        let root_name = format!("{}_{}_Terrain_Markers", level.region_name, level.area_ref);
        let root = scene.spawn((Name::new(root_name), Transform::default(), Parent(terrain), MarkerRoot));
        self.marker_root = Some(root);

        let billboard = Billboard {
            lock_to_world_up: self.settings.lock_markers_to_world_up,
        };
        for marker in &level.map_markers {
            let Some(icon) = marker.icon.as_ref() else {
                continue;
            };
            let position = marker_world_position(data, marker);
            let mut sprite = SpriteRenderer::new(icon.clone());
            let scale = if icon.sliced {
                sprite.size = marker.world_size_meters;
                Vec3::ONE
            } else {
                marker_scale(marker.world_size_meters, icon.bounds)
            };
            let name = if marker.display_name.is_empty() {
                "MapMarker"
            } else {
                marker.display_name.as_str()
            };
            let entity = scene.spawn((
                Name::new(name),
                Transform::from_position_scale(position, scale),
                Parent(root),
                sprite,
                billboard,
            ));
            self.markers.push(entity);
        }
        log::debug!("RegionLoader: placed {} markers", self.markers.len());
    }
}

fn to_i32(index: usize) -> i32 {
    i32::try_from(index).unwrap_or(i32::MAX)
}
