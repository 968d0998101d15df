//! Square heightfield terrain resource.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{TerrainError, TerrainResult};
use crate::heightmap::HeightGrid;

/// Realized elevation span of a terrain, in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElevationRange {
    pub min_meters: f32,
    pub max_meters: f32,
}

impl ElevationRange {
    pub fn span(&self) -> f32 {
        self.max_meters - self.min_meters
    }
}

/// Heightfield resource: `resolution`² normalized samples stretched over a
/// physical `size` (x = width, y = max height, z = depth, all in meters).
///
/// Row `y` of the samples runs along world Z, column `x` along world X.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredTerrainData")]
pub struct TerrainData {
    resolution: usize,
    size: Vec3,
    heights: Vec<f32>,
}

/// On-disk shape of `TerrainData`, checked before it becomes one.
#[derive(Deserialize)]
struct StoredTerrainData {
    resolution: usize,
    size: Vec3,
    heights: Vec<f32>,
}

impl TryFrom<StoredTerrainData> for TerrainData {
    type Error = TerrainError;

    fn try_from(stored: StoredTerrainData) -> TerrainResult<Self> {
        let StoredTerrainData {
            resolution,
            size,
            heights,
        } = stored;
        if resolution == 0 {
            return Err(TerrainError::InvalidDimensions {
                width: 0,
                height: 0,
            });
        }
        if resolution.checked_mul(resolution) != Some(heights.len()) {
            return Err(TerrainError::SampleCountMismatch {
                resolution,
                samples: heights.len(),
            });
        }
        Ok(Self {
            resolution,
            size,
            heights: heights.into_iter().map(sanitize_unit).collect(),
        })
    }
}

impl TerrainData {
    /// Flat terrain at height zero.
    pub fn flat(resolution: usize, size: Vec3) -> Self {
        let resolution = resolution.max(1);
        Self {
            resolution,
            size,
            heights: vec![0.0; resolution * resolution],
        }
    }

    /// Replace the samples with a square normalized grid.
    pub fn set_heights(&mut self, grid: &HeightGrid) -> TerrainResult<()> {
        if !grid.is_square() {
            return Err(TerrainError::NonSquareHeightmap {
                width: grid.width(),
                height: grid.height(),
            });
        }
        self.resolution = grid.width();
        self.heights = grid.samples().iter().copied().map(sanitize_unit).collect();
        Ok(())
    }

    pub fn set_size(&mut self, size: Vec3) {
        self.size = size;
    }

    /// Copy of this terrain stretched over a different physical size.
    pub fn with_size(&self, size: Vec3) -> Self {
        Self {
            size,
            ..self.clone()
        }
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    pub fn size(&self) -> Vec3 {
        self.size
    }

    pub fn max_height(&self) -> f32 {
        self.size.y
    }

    /// Normalized sample at grid position (clamped to the grid).
    pub fn normalized_height(&self, x: usize, y: usize) -> f32 {
        let last = self.resolution - 1;
        self.heights[y.min(last) * self.resolution + x.min(last)]
    }

    /// Elevation in meters at grid position.
    pub fn elevation(&self, x: usize, y: usize) -> f32 {
        self.normalized_height(x, y) * self.size.y
    }

    /// Bilinearly interpolated elevation in meters at normalized coordinates
    /// (`nx` along X, `nz` along Z, both clamped to `[0, 1]`).
    pub fn interpolated_height(&self, nx: f32, nz: f32) -> f32 {
        if self.resolution == 1 {
            return self.elevation(0, 0);
        }
        let scale = (self.resolution - 1) as f32;
        let gx = sanitize_unit(nx) * scale;
        let gz = sanitize_unit(nz) * scale;

        let x0 = (gx.floor() as usize).min(self.resolution - 2);
        let z0 = (gz.floor() as usize).min(self.resolution - 2);
        let fx = (gx - x0 as f32).clamp(0.0, 1.0);
        let fz = (gz - z0 as f32).clamp(0.0, 1.0);

        let h00 = self.normalized_height(x0, z0);
        let h10 = self.normalized_height(x0 + 1, z0);
        let h01 = self.normalized_height(x0, z0 + 1);
        let h11 = self.normalized_height(x0 + 1, z0 + 1);

        let near = h00 + (h10 - h00) * fx;
        let far = h01 + (h11 - h01) * fx;
        (near + (far - near) * fz) * self.size.y
    }

    /// Lowest and highest elevation currently stored, in meters.
    pub fn elevation_range(&self) -> ElevationRange {
        let (min, max) = self
            .heights
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        let min = if min.is_finite() && min != f32::MAX { min } else { 0.0 };
        let max = if max.is_finite() && max != f32::MIN { max } else { 1.0 };
        ElevationRange {
            min_meters: min * self.size.y,
            max_meters: max * self.size.y,
        }
    }
}

fn sanitize_unit(v: f32) -> f32 {
    if v.is_finite() {
        v.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pyramid() -> TerrainData {
        let grid = HeightGrid::from_samples(
            3,
            3,
            vec![
                0.0, 0.0, 0.0, //
                0.0, 0.5, 0.0, //
                0.0, 0.0, 0.0,
            ],
        )
        .unwrap();
        let mut data = TerrainData::flat(3, Vec3::new(100.0, 100.0, 100.0));
        data.set_heights(&grid).unwrap();
        data
    }

    #[test]
    fn interpolated_height_hits_samples_exactly() {
        let data = pyramid();
        assert!((data.interpolated_height(0.5, 0.5) - 50.0).abs() < 1e-4);
        assert_eq!(data.interpolated_height(0.0, 0.0), 0.0);
        assert_eq!(data.interpolated_height(1.0, 1.0), 0.0);
    }

    #[test]
    fn interpolated_height_blends_between_samples() {
        let data = pyramid();
        assert!((data.interpolated_height(0.25, 0.5) - 25.0).abs() < 1e-4);
        assert!((data.interpolated_height(0.25, 0.25) - 12.5).abs() < 1e-4);
    }

    #[test]
    fn out_of_range_coordinates_are_clamped() {
        let data = pyramid();
        assert_eq!(data.interpolated_height(-3.0, 7.0), data.interpolated_height(0.0, 1.0));
        assert_eq!(data.interpolated_height(f32::NAN, 0.0), 0.0);
    }

    #[test]
    fn rejects_non_square_grid() {
        let grid = HeightGrid::from_samples(2, 1, vec![0.0, 1.0]).unwrap();
        let mut data = TerrainData::flat(2, Vec3::ONE);
        assert_eq!(
            data.set_heights(&grid),
            Err(TerrainError::NonSquareHeightmap { width: 2, height: 1 })
        );
    }

    #[test]
    fn stored_terrain_is_checked_on_load() {
        let data = pyramid();
        let text = ron::to_string(&data).unwrap();
        assert_eq!(ron::from_str::<TerrainData>(&text).unwrap(), data);

        let empty = "(resolution: 3, size: (100.0, 10.0, 100.0), heights: [])";
        let err = ron::from_str::<TerrainData>(empty).unwrap_err();
        assert!(err.to_string().contains("expected 3x3"), "{err}");

        let zero = "(resolution: 0, size: (1.0, 1.0, 1.0), heights: [])";
        assert!(ron::from_str::<TerrainData>(zero).is_err());

        let wild = "(resolution: 1, size: (1.0, 10.0, 1.0), heights: [4.0])";
        let clamped = ron::from_str::<TerrainData>(wild).unwrap();
        assert_eq!(clamped.elevation(0, 0), 10.0);
    }

    #[test]
    fn with_size_rescales_elevation() {
        let data = pyramid().with_size(Vec3::new(100.0, 20.0, 100.0));
        assert!((data.elevation(1, 1) - 10.0).abs() < 1e-5);
        assert_eq!(data.elevation_range().max_meters, 10.0);
    }
}
