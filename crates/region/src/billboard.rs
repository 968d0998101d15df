//! Marker placement on the terrain surface and camera-facing billboards.

use engine_core::{Parent, Scene, Transform, DEGENERATE_DIRECTION_SQ};
use glam::{Quat, Vec2, Vec3};
use terrain::TerrainData;

use crate::level::MapMarker;

/// Keeps an entity turned toward the observation viewpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Billboard {
    /// Only rotate around world Y, so the marker never tilts with viewpoint elevation.
    pub lock_to_world_up: bool,
}

impl Default for Billboard {
    fn default() -> Self {
        Self {
            lock_to_world_up: true,
        }
    }
}

/// Position of a marker in the terrain's local space:
/// `(nx * width, height(nx, nz) + offset, nz * depth)`.
pub fn marker_world_position(terrain: &TerrainData, marker: &MapMarker) -> Vec3 {
    let nx = unit(marker.normalized_x);
    let nz = unit(marker.normalized_z);
    let size = terrain.size();
    let offset = if marker.height_offset_meters.is_finite() {
        marker.height_offset_meters
    } else {
        0.0
    };
    Vec3::new(
        nx * size.x,
        terrain.interpolated_height(nx, nz) + offset,
        nz * size.z,
    )
}

fn unit(v: f32) -> f32 {
    if v.is_finite() {
        v.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Local scale that makes a sprite of `bounds` cover `world_size` meters.
/// Degenerate bounds count as 1x1.
pub fn marker_scale(world_size: Vec2, bounds: Vec2) -> Vec3 {
    let bounds = if bounds.x <= f32::EPSILON || bounds.y <= f32::EPSILON {
        Vec2::ONE
    } else {
        bounds
    };
    Vec3::new(world_size.x / bounds.x, world_size.y / bounds.y, 1.0)
}

/// Turn a world-space transform toward `viewpoint`.
///
/// Returns `false` without touching the rotation when the viewpoint is on top
/// of the transform (after the horizontal projection, in locked mode).
pub fn face_viewpoint(transform: &mut Transform, viewpoint: Vec3, lock_to_world_up: bool) -> bool {
    let mut direction = viewpoint - transform.position;
    if lock_to_world_up {
        direction.y = 0.0;
    }
    if direction.length_squared() < DEGENERATE_DIRECTION_SQ {
        return false;
    }
    transform.look_toward(direction, Vec3::Y)
}

/// Turn every billboard in the scene toward `viewpoint`. Run once per frame,
/// after anything that moves markers or the viewpoint.
///
/// Returns the number of billboards that were rotated.
pub fn update_billboards(scene: &mut Scene, viewpoint: Vec3) -> usize {
    let billboards: Vec<_> = scene
        .world()
        .query::<&Billboard>()
        .iter()
        .map(|(entity, billboard)| (entity, billboard.lock_to_world_up))
        .collect();

    let mut turned = 0;
    for (entity, lock) in billboards {
        let Some(mut world) = scene.world_transform(entity) else {
            continue;
        };
        if !face_viewpoint(&mut world, viewpoint, lock) {
            continue;
        }
        let parent_rotation = scene
            .world()
            .get::<&Parent>(entity)
            .ok()
            .map(|parent| parent.0)
            .and_then(|parent| scene.world_transform(parent))
            .map(|t| t.rotation)
            .unwrap_or(Quat::IDENTITY);
        if let Ok(mut local) = scene.world_mut().get::<&mut Transform>(entity) {
            local.rotation = parent_rotation.inverse() * world.rotation;
            turned += 1;
        }
    }
    turned
}

#[cfg(test)]
mod tests {
    use super::*;
    use terrain::HeightGrid;

    fn hill() -> TerrainData {
        let grid = HeightGrid::from_samples(3, 3, vec![0.0, 0.0, 0.0, 0.0, 0.5, 0.0, 0.0, 0.0, 0.0]).unwrap();
        let mut data = TerrainData::flat(3, Vec3::new(100.0, 100.0, 100.0));
        data.set_heights(&grid).unwrap();
        data
    }

    #[test]
    fn marker_sits_on_terrain_plus_offset() {
        let marker = MapMarker::new("Summit", 0.5, 0.5).with_height_offset(10.0);
        let position = marker_world_position(&hill(), &marker);
        assert!((position - Vec3::new(50.0, 60.0, 50.0)).length() < 1e-4);
    }

    #[test]
    fn marker_coordinates_are_clamped() {
        let marker = MapMarker::new("Edge", 2.0, f32::NAN);
        let position = marker_world_position(&hill(), &marker);
        assert_eq!(position, Vec3::new(100.0, 0.0, 0.0));
    }

    #[test]
    fn scale_ignores_degenerate_bounds() {
        assert_eq!(marker_scale(Vec2::new(20.0, 10.0), Vec2::new(2.0, 5.0)), Vec3::new(10.0, 2.0, 1.0));
        assert_eq!(marker_scale(Vec2::new(20.0, 10.0), Vec2::new(0.0, 5.0)), Vec3::new(20.0, 10.0, 1.0));
    }

    #[test]
    fn locked_billboard_stays_upright() {
        let mut t = Transform::from_position(Vec3::ZERO);
        assert!(face_viewpoint(&mut t, Vec3::new(0.0, 500.0, 10.0), true));
        assert!((t.forward() - Vec3::Z).length() < 1e-5);
        assert!((t.up() - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn free_billboard_tilts_toward_viewpoint() {
        let mut t = Transform::from_position(Vec3::ZERO);
        assert!(face_viewpoint(&mut t, Vec3::new(0.0, 10.0, 10.0), false));
        let expected = Vec3::new(0.0, 1.0, 1.0).normalize();
        assert!((t.forward() - expected).length() < 1e-5);
    }

    #[test]
    fn coincident_viewpoint_leaves_rotation() {
        let mut t = Transform::from_position(Vec3::new(5.0, 1.0, 5.0));
        t.rotation = Quat::from_rotation_y(1.0);
        let before = t.rotation;
        assert!(!face_viewpoint(&mut t, Vec3::new(5.0, 1.0, 5.0), false));
        // Directly overhead collapses to nothing once projected.
        assert!(!face_viewpoint(&mut t, Vec3::new(5.0, 80.0, 5.0), true));
        assert_eq!(t.rotation, before);
    }

    #[test]
    fn update_billboards_accounts_for_parent_rotation() {
        let mut scene = Scene::new();
        let mut root_transform = Transform::from_position(Vec3::new(10.0, 0.0, 0.0));
        root_transform.rotation = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let root = scene.spawn((root_transform,));
        let marker = scene.spawn((Transform::default(), Parent(root), Billboard::default()));
        let plain = scene.spawn((Transform::default(),));

        assert_eq!(update_billboards(&mut scene, Vec3::new(10.0, 3.0, 20.0)), 1);
        let world = scene.world_transform(marker).unwrap();
        assert!((world.forward() - Vec3::Z).length() < 1e-4);
        assert_eq!(*scene.world().get::<&Transform>(plain).unwrap(), Transform::default());
    }
}
