//! Error types for region definitions, loading and asset generation.

use std::io;
use std::path::PathBuf;

use terrain::TerrainError;
use thiserror::Error;

/// Errors raised by the region crates.
///
/// Loading errors (`MissingRegionData`, `MissingTerrainData`) are logged and
/// recovered by the loader; generation errors abort the generation.
#[derive(Debug, Error)]
pub enum RegionError {
    /// No region definition was supplied.
    #[error("RegionLevel missing")]
    MissingRegionData,

    /// The region definition has no terrain resource bound.
    #[error("TerrainData missing for region '{0}'")]
    MissingTerrainData(String),

    /// Day/month/year do not form a calendar date.
    #[error("Invalid overlay date {year:04}-{month:02}-{day:02}")]
    InvalidDate { day: i32, month: i32, year: i32 },

    /// A terrain recipe failed validation.
    #[error("Invalid terrain recipe: {0}")]
    InvalidRecipe(String),

    /// No asset is stored at the given path.
    #[error("Asset not found: {0}")]
    AssetNotFound(String),

    /// Filesystem access failed.
    #[error("I/O error on {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    /// A stored asset could not be parsed.
    #[error("Could not parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: ron::error::SpannedError,
    },

    /// An asset could not be serialized.
    #[error("Could not serialize asset: {0}")]
    Serialize(#[from] ron::Error),

    /// Heightmap decoding or terrain building failed.
    #[error(transparent)]
    Terrain(#[from] TerrainError),
}

pub type RegionResult<T> = Result<T, RegionError>;
