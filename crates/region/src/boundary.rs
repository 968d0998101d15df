//! Invisible walls fencing the playable area of a region.
//!
//! The walls follow the loader's terrain: rebuilt when a terrain is created,
//! dropped when it is torn down.

use std::sync::mpsc::Receiver;

use engine_core::{Name, Parent, Scene, Transform};
use glam::Vec3;
use hecs::Entity;

use crate::loader::{RegionLoader, TerrainCreated, TerrainInstance};

const MIN_EXTENT: f32 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WallSide {
    North,
    South,
    East,
    West,
}

impl WallSide {
    pub const ALL: [WallSide; 4] = [WallSide::North, WallSide::South, WallSide::East, WallSide::West];
}

/// One wall segment. Its `Transform` scale is the box extent in meters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundaryWall {
    pub side: WallSide,
}

/// Local transforms of the four walls around a terrain of `size`, relative
/// to the terrain centre (`size * 0.5`).
pub fn wall_transforms(size: Vec3, thickness: f32) -> [(WallSide, Transform); 4] {
    let height = size.y.max(MIN_EXTENT);
    let t = thickness.max(MIN_EXTENT);
    let z_offset = (size.z - t) * 0.5;
    let x_offset = (size.x - t) * 0.5;
    let along_x = Vec3::new(size.x, height, t);
    let along_z = Vec3::new(t, height, size.z);
    WallSide::ALL.map(|side| {
        let (position, scale) = match side {
            WallSide::North => (Vec3::new(0.0, 0.0, z_offset), along_x),
            WallSide::South => (Vec3::new(0.0, 0.0, -z_offset), along_x),
            WallSide::East => (Vec3::new(x_offset, 0.0, 0.0), along_z),
            WallSide::West => (Vec3::new(-x_offset, 0.0, 0.0), along_z),
        };
        (side, Transform::from_position_scale(position, scale))
    })
}

/// Keeps a set of boundary walls in sync with a region loader's terrain.
pub struct BoundaryWalls {
    thickness: f32,
    events: Receiver<TerrainCreated>,
    root: Option<Entity>,
}

impl BoundaryWalls {
    /// Subscribe to `loader` and build walls right away if it already has a terrain.
    pub fn attach(loader: &mut RegionLoader, scene: &mut Scene, thickness: f32) -> Self {
        let mut walls = Self {
            thickness,
            events: loader.subscribe_terrain_created(),
            root: None,
        };
        if let Some(terrain) = loader.terrain() {
            walls.rebuild(scene, Some(terrain));
        }
        walls
    }

    pub fn root(&self) -> Option<Entity> {
        self.root
    }

    /// Apply every terrain event received since the last call.
    pub fn update(&mut self, scene: &mut Scene) {
        while let Ok(TerrainCreated(terrain)) = self.events.try_recv() {
            self.rebuild(scene, terrain);
        }
    }

    fn rebuild(&mut self, scene: &mut Scene, terrain: Option<Entity>) {
        if let Some(root) = self.root.take() {
            scene.destroy(root);
        }
        let Some(terrain) = terrain else {
            return;
        };

        let (size, name) = {
            let world = scene.world();
            let Ok(instance) = world.get::<&TerrainInstance>(terrain) else {
                log::warn!("Boundary: terrain entity has no terrain component");
                return;
            };
            let name = world
                .get::<&Name>(terrain)
                .map(|n| n.as_str().to_string())
                .unwrap_or_else(|_| "Terrain".to_string());
            (instance.data.size(), name)
        };

        let root_name = format!("{name}_ForceField");
        let root = scene.spawn((
            Name::new(root_name.clone()),
            Transform::from_position(size * 0.5),
            Parent(terrain),
        ));
        for (i, (side, transform)) in wall_transforms(size, self.thickness).into_iter().enumerate() {
            scene.spawn((
                Name::new(format!("{root_name}_Segment_{i}")),
                transform,
                Parent(root),
                BoundaryWall { side },
            ));
        }
        self.root = Some(root);
        log::debug!("Boundary: walls built around {} ({:.0}m x {:.0}m)", name, size.x, size.z);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::RegionLevel;
    use crate::settings::LoaderSettings;
    use std::sync::Arc;
    use terrain::TerrainData;

    #[test]
    fn walls_hug_the_edges() {
        let walls = wall_transforms(Vec3::new(100.0, 20.0, 60.0), 4.0);
        let (_, north) = walls[0];
        assert_eq!(north.position, Vec3::new(0.0, 0.0, 28.0));
        assert_eq!(north.scale, Vec3::new(100.0, 20.0, 4.0));
        let (_, west) = walls[3];
        assert_eq!(west.position, Vec3::new(-48.0, 0.0, 0.0));
        assert_eq!(west.scale, Vec3::new(4.0, 20.0, 60.0));
    }

    #[test]
    fn flat_terrain_still_gets_walls() {
        let walls = wall_transforms(Vec3::new(10.0, 0.0, 10.0), -1.0);
        for (_, t) in walls {
            assert!(t.scale.y >= MIN_EXTENT);
            assert!(t.scale.min_element() >= MIN_EXTENT);
        }
    }

    #[test]
    fn walls_follow_terrain_lifecycle() {
        let mut scene = Scene::new();
        let mut loader = RegionLoader::new(LoaderSettings::default());
        let mut walls = BoundaryWalls::attach(&mut loader, &mut scene, 5.0);
        let level = RegionLevel::new("BR", "A1").with_terrain(TerrainData::flat(2, Vec3::new(100.0, 10.0, 100.0)));
        let level = Arc::new(level);

        loader.load_region(&mut scene, Some(Arc::clone(&level))).unwrap();
        loader.update(&mut scene);
        walls.update(&mut scene);
        scene.end_frame();
        let root = walls.root().unwrap();
        let center = scene.world_transform(root).unwrap().position;
        assert_eq!(center, Vec3::new(50.0, 5.0, 50.0));
        assert_eq!(scene.world().query::<&BoundaryWall>().iter().count(), 4);

        loader.load_region(&mut scene, Some(level)).unwrap();
        walls.update(&mut scene);
        scene.end_frame();
        assert!(walls.root().is_none());
        assert_eq!(scene.world().query::<&BoundaryWall>().iter().count(), 0);

        loader.update(&mut scene);
        walls.update(&mut scene);
        scene.end_frame();
        assert_eq!(scene.world().query::<&BoundaryWall>().iter().count(), 4);
    }
}
