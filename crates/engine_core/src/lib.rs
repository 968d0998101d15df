//! Core engine types shared by the region crates.
//!
//! This crate provides the foundational types the terrain and region systems
//! build on:
//! - Transform and spatial helpers
//! - Frame timing
//! - Asset references (textures, sprites)
//! - The scene (ECS world with engine-style deferred destruction)
//! - Event channels with explicit subscribe/unsubscribe lifetimes

pub mod assets;
pub mod components;
pub mod events;
pub mod scene;
pub mod time;
pub mod transform;

pub use assets::*;
pub use components::*;
pub use events::*;
pub use scene::*;
pub use time::*;
pub use transform::*;

// Re-export commonly used types
pub use glam::{Mat3, Quat, Vec2, Vec3};
pub use hecs::{Entity, World};
