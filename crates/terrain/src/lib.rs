//! Heightfield ingestion: RAW heightmap decoding and terrain asset building.

pub mod builder;
pub mod error;
pub mod heightmap;
pub mod terrain;

pub use builder::*;
pub use error::*;
pub use heightmap::*;
pub use terrain::*;
