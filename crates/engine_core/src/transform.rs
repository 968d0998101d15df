//! Transform component and utilities for spatial positioning.

use glam::{Mat3, Quat, Vec3};

/// Squared length below which a facing direction is considered undefined.
pub const DEGENERATE_DIRECTION_SQ: f32 = 1e-6;

/// A 3D transform representing position, rotation, and scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Create a new transform at the given position.
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create a new transform with position and scale.
    pub fn from_position_scale(position: Vec3, scale: Vec3) -> Self {
        Self {
            position,
            scale,
            ..Default::default()
        }
    }

    /// Map a point from this transform's local space into its parent space.
    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        self.position + self.rotation * (self.scale * local)
    }

    /// Compose a child transform expressed in this transform's local space.
    pub fn mul_transform(&self, child: &Transform) -> Transform {
        Transform {
            position: self.transform_point(child.position),
            rotation: self.rotation * child.rotation,
            scale: self.scale * child.scale,
        }
    }

    /// Get the forward direction (negative Z in right-handed coordinates).
    pub fn forward(&self) -> Vec3 {
        self.rotation * -Vec3::Z
    }

    /// Get the up direction (positive Y).
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    /// Orient the transform so that `forward()` points along `direction`,
    /// keeping `up` as the roll reference.
    ///
    /// Returns `false` and leaves the rotation untouched when the direction is
    /// degenerate.
    pub fn look_toward(&mut self, direction: Vec3, up: Vec3) -> bool {
        if direction.length_squared() < DEGENERATE_DIRECTION_SQ {
            return false;
        }
        let forward = direction.normalize();
        let back = -forward;
        let right = up.cross(back);
        if right.length_squared() < DEGENERATE_DIRECTION_SQ {
            // Looking straight along the up axis: any roll is as good as another.
            self.rotation = Quat::from_rotation_arc(-Vec3::Z, forward);
            return true;
        }
        let right = right.normalize();
        let true_up = back.cross(right);
        self.rotation = Quat::from_mat3(&Mat3::from_cols(right, true_up, back)).normalize();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn look_toward_points_forward_at_direction() {
        let mut t = Transform::default();
        assert!(t.look_toward(Vec3::new(1.0, 0.0, 0.0), Vec3::Y));
        assert!((t.forward() - Vec3::X).length() < 1e-5);
        assert!((t.up() - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn look_toward_straight_up_still_faces_direction() {
        let mut t = Transform::default();
        assert!(t.look_toward(Vec3::Y * 3.0, Vec3::Y));
        assert!((t.forward() - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn degenerate_direction_keeps_rotation() {
        let mut t = Transform::default();
        t.rotation = Quat::from_rotation_y(0.7);
        let before = t.rotation;
        assert!(!t.look_toward(Vec3::splat(1e-5), Vec3::Y));
        assert_eq!(t.rotation, before);
    }

    #[test]
    fn child_transform_is_offset_by_parent() {
        let parent = Transform::from_position(Vec3::new(10.0, 0.0, 5.0));
        let child = Transform::from_position(Vec3::new(1.0, 2.0, 3.0));
        let world = parent.mul_transform(&child);
        assert_eq!(world.position, Vec3::new(11.0, 2.0, 8.0));
    }
}
