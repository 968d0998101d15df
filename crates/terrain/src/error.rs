//! Error types for heightmap decoding and terrain building.

use thiserror::Error;

/// Structural failures while turning RAW samples into a terrain.
///
/// These point at a broken authoring pipeline, so they abort the operation
/// instead of substituting data.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TerrainError {
    /// Width or height of the sample grid is zero.
    #[error("Heightmap dimensions must be positive (got {width}x{height})")]
    InvalidDimensions { width: usize, height: usize },

    /// Only 8-bit and 16-bit samples are supported.
    #[error("Unsupported heightmap bit depth {0} (expected 8 or 16)")]
    UnsupportedBitDepth(u32),

    /// The buffer holds fewer bytes than the grid needs.
    #[error("RAW heightmap is smaller than expected ({actual} bytes, expected {expected})")]
    TruncatedInput { expected: usize, actual: usize },

    /// A stored heightfield does not hold `resolution`² samples.
    #[error("Terrain holds {samples} samples, expected {resolution}x{resolution}")]
    SampleCountMismatch { resolution: usize, samples: usize },

    /// Terrain heightfields must be square.
    #[error("Terrain heightfields must be square (got {width}x{height})")]
    NonSquareHeightmap { width: usize, height: usize },
}

pub type TerrainResult<T> = Result<T, TerrainError>;
