//! Turns a normalized height grid into a terrain resource.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{TerrainError, TerrainResult};
use crate::heightmap::HeightGrid;
use crate::terrain::{ElevationRange, TerrainData};

/// Physical extent of a terrain in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerrainSize {
    pub width: f32,
    pub max_height: f32,
    pub depth: f32,
}

impl TerrainSize {
    pub fn new(width: f32, max_height: f32, depth: f32) -> Self {
        Self {
            width,
            max_height,
            depth,
        }
    }

    pub fn as_vec3(&self) -> Vec3 {
        Vec3::new(self.width, self.max_height, self.depth)
    }
}

impl Default for TerrainSize {
    fn default() -> Self {
        Self::new(10_000.0, 200.0, 10_000.0)
    }
}

/// A freshly built terrain and the elevation span it realizes.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltTerrain {
    pub data: TerrainData,
    pub range: ElevationRange,
}

/// Elevation range a grid realizes at the given maximum height.
pub fn grid_elevation_range(grid: &HeightGrid, max_height: f32) -> ElevationRange {
    ElevationRange {
        min_meters: grid.min() * max_height,
        max_meters: grid.max() * max_height,
    }
}

/// Build a new terrain resource from a square grid.
pub fn build_terrain(grid: &HeightGrid, size: TerrainSize) -> TerrainResult<BuiltTerrain> {
    let mut data = TerrainData::flat(grid.width(), size.as_vec3());
    let range = rebuild_terrain(&mut data, grid, size)?;
    Ok(BuiltTerrain { data, range })
}

/// Update an existing terrain resource in place with new samples and size.
pub fn rebuild_terrain(
    data: &mut TerrainData,
    grid: &HeightGrid,
    size: TerrainSize,
) -> TerrainResult<ElevationRange> {
    if !grid.is_square() {
        return Err(TerrainError::NonSquareHeightmap {
            width: grid.width(),
            height: grid.height(),
        });
    }
    data.set_heights(grid)?;
    data.set_size(size.as_vec3());

    let range = grid_elevation_range(grid, size.max_height);
    log::debug!(
        "Built {}x{} terrain, {:.0}m x {:.0}m, elevation {:.2}m - {:.2}m",
        grid.width(),
        grid.height(),
        size.width,
        size.depth,
        range.min_meters,
        range.max_meters
    );
    Ok(range)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heightmap::{decode_raw, ByteOrder, RawHeightmapFormat};

    #[test]
    fn elevation_is_sample_times_max_height() {
        let grid = HeightGrid::from_samples(2, 2, vec![0.0, 0.25, 0.5, 1.0]).unwrap();
        let built = build_terrain(&grid, TerrainSize::new(1000.0, 200.0, 1000.0)).unwrap();
        for y in 0..2 {
            for x in 0..2 {
                assert!((built.data.elevation(x, y) - grid.get(x, y) * 200.0).abs() < 1e-4);
            }
        }
        assert_eq!(built.range.min_meters, 0.0);
        assert_eq!(built.range.max_meters, 200.0);
    }

    #[test]
    fn range_follows_observed_extremes() {
        let bytes = [64u8, 128, 128, 192];
        let grid = decode_raw(&bytes, &RawHeightmapFormat::square(2, 8, ByteOrder::Little, false)).unwrap();
        let built = build_terrain(&grid, TerrainSize::new(10.0, 255.0, 10.0)).unwrap();
        assert!((built.range.min_meters - 64.0).abs() < 1e-3);
        assert!((built.range.max_meters - 192.0).abs() < 1e-3);
    }

    #[test]
    fn range_matches_stored_heights_for_wild_samples() {
        let grid = HeightGrid::from_samples(2, 2, vec![f32::NAN, -1.0, 0.5, 3.0]).unwrap();
        let built = build_terrain(&grid, TerrainSize::new(10.0, 100.0, 10.0)).unwrap();
        assert_eq!(built.range, built.data.elevation_range());
        assert_eq!(built.range.max_meters, 100.0);
        assert_eq!(built.data.elevation(0, 0), 0.0);
    }

    #[test]
    fn rejects_non_square_grid() {
        let grid = HeightGrid::from_samples(3, 2, vec![0.0; 6]).unwrap();
        assert_eq!(
            build_terrain(&grid, TerrainSize::default()),
            Err(TerrainError::NonSquareHeightmap { width: 3, height: 2 })
        );
    }

    #[test]
    fn rebuild_updates_in_place() {
        let first = HeightGrid::from_samples(2, 2, vec![0.0; 4]).unwrap();
        let second = HeightGrid::from_samples(2, 2, vec![1.0; 4]).unwrap();
        let mut built = build_terrain(&first, TerrainSize::default()).unwrap();
        let range = rebuild_terrain(&mut built.data, &second, TerrainSize::new(5.0, 50.0, 5.0)).unwrap();
        assert_eq!(range.min_meters, 50.0);
        assert_eq!(built.data.elevation(1, 1), 50.0);
        assert_eq!(built.data.size(), Vec3::new(5.0, 50.0, 5.0));
    }
}
