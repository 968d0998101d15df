//! Regions: playable areas built from a heightfield, dated overlay imagery
//! and points of interest.
//!
//! - `overlay`: overlay groups and layers, index clamping, legacy migration
//! - `level`: the region definition and its map markers
//! - `loader`: runtime terrain instantiation and overlay switching
//! - `billboard`: marker placement and camera-facing sprites
//! - `boundary`: walls around the playable area
//! - `recipe` / `assets`: offline generation from RAW heightmaps

pub mod assets;
pub mod billboard;
pub mod boundary;
pub mod error;
pub mod level;
pub mod loader;
pub mod overlay;
pub mod recipe;
pub mod settings;

pub use assets::*;
pub use billboard::*;
pub use boundary::*;
pub use error::*;
pub use level::*;
pub use loader::*;
pub use overlay::*;
pub use recipe::*;
pub use settings::*;
