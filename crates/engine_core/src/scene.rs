//! Scene graph on top of a `hecs::World`.
//!
//! Mirrors the host engine's object lifetime rules: `destroy` only marks an
//! entity, the entity and everything parented under it disappear when the
//! frame ends. `destroy_immediate` is the edit-time variant.

use hecs::{DynamicBundle, Entity, World};

use crate::components::Parent;
use crate::transform::Transform;

/// ECS world plus the deferred-destruction queue for the current frame.
#[derive(Default)]
pub struct Scene {
    world: World,
    pending_destroy: Vec<Entity>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn spawn(&mut self, components: impl DynamicBundle) -> Entity {
        self.world.spawn(components)
    }

    /// Whether the entity is still alive. Stays `true` for entities destroyed
    /// with `destroy` until `end_frame` runs.
    pub fn contains(&self, entity: Entity) -> bool {
        self.world.contains(entity)
    }

    /// Whether `destroy` has been requested for the entity this frame.
    pub fn is_pending_destroy(&self, entity: Entity) -> bool {
        self.pending_destroy.contains(&entity)
    }

    /// Queue the entity and its descendants for removal at the end of the frame.
    pub fn destroy(&mut self, entity: Entity) {
        if self.world.contains(entity) && !self.pending_destroy.contains(&entity) {
            self.pending_destroy.push(entity);
        }
    }

    /// Remove the entity and its descendants right away.
    pub fn destroy_immediate(&mut self, entity: Entity) {
        for doomed in self.subtree(entity) {
            // Already gone entities are fine: a subtree can be reached twice.
            let _ = self.world.despawn(doomed);
        }
        self.pending_destroy.retain(|e| *e != entity);
    }

    /// Process deferred destruction. Call once per frame after all systems ran.
    ///
    /// Returns the number of entities removed.
    pub fn end_frame(&mut self) -> usize {
        let roots = std::mem::take(&mut self.pending_destroy);
        let mut removed = 0;
        for root in roots {
            for doomed in self.subtree(root) {
                if self.world.despawn(doomed).is_ok() {
                    removed += 1;
                }
            }
        }
        if removed > 0 {
            log::trace!("Scene: destroyed {} entities at end of frame", removed);
        }
        removed
    }

    /// Direct children of `parent`.
    pub fn children_of(&self, parent: Entity) -> Vec<Entity> {
        self.world
            .query::<&Parent>()
            .iter()
            .filter(|(_, p)| p.0 == parent)
            .map(|(e, _)| e)
            .collect()
    }

    /// `root` followed by all of its descendants (breadth first).
    pub fn subtree(&self, root: Entity) -> Vec<Entity> {
        if !self.world.contains(root) {
            return Vec::new();
        }
        let mut out = vec![root];
        let mut cursor = 0;
        while cursor < out.len() {
            let current = out[cursor];
            out.extend(self.children_of(current));
            cursor += 1;
        }
        out
    }

    /// World-space transform of an entity, walking up the `Parent` chain.
    pub fn world_transform(&self, entity: Entity) -> Option<Transform> {
        let local = *self.world.get::<&Transform>(entity).ok()?;
        let parent = self.world.get::<&Parent>(entity).ok().map(|p| p.0);
        match parent {
            Some(parent) => Some(self.world_transform(parent)?.mul_transform(&local)),
            None => Some(local),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Name;
    use glam::Vec3;

    #[test]
    fn deferred_destroy_waits_for_end_of_frame() {
        let mut scene = Scene::new();
        let root = scene.spawn((Name::new("root"), Transform::default()));
        let child = scene.spawn((Name::new("child"), Transform::default(), Parent(root)));

        scene.destroy(root);
        assert!(scene.contains(root));
        assert!(scene.contains(child));
        assert!(scene.is_pending_destroy(root));

        assert_eq!(scene.end_frame(), 2);
        assert!(!scene.contains(root));
        assert!(!scene.contains(child));
    }

    #[test]
    fn immediate_destroy_removes_subtree() {
        let mut scene = Scene::new();
        let root = scene.spawn((Transform::default(),));
        let child = scene.spawn((Transform::default(), Parent(root)));
        let grandchild = scene.spawn((Transform::default(), Parent(child)));
        let unrelated = scene.spawn((Transform::default(),));

        scene.destroy_immediate(root);
        assert!(!scene.contains(grandchild));
        assert!(scene.contains(unrelated));
    }

    #[test]
    fn world_transform_follows_parents() {
        let mut scene = Scene::new();
        let root = scene.spawn((Transform::from_position(Vec3::new(100.0, 0.0, 0.0)),));
        let child = scene.spawn((Transform::from_position(Vec3::new(1.0, 2.0, 3.0)), Parent(root)));
        let world = scene.world_transform(child).unwrap();
        assert_eq!(world.position, Vec3::new(101.0, 2.0, 3.0));
    }
}
