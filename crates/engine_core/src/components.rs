//! Common ECS components used across the engine.

use glam::Vec2;
use hecs::Entity;

use crate::assets::SpriteRef;

/// Display name of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Name(pub String);

impl Name {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Links an entity to the entity whose local space its `Transform` is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parent(pub Entity);

/// How a sprite is stretched to its on-screen size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SpriteDrawMode {
    /// The whole sprite scales with the transform.
    #[default]
    Simple,
    /// Nine-slice: borders keep their size, `size` sets the drawn area.
    Sliced,
}

/// Sprite drawn at an entity's transform.
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteRenderer {
    pub sprite: SpriteRef,
    pub draw_mode: SpriteDrawMode,
    /// Drawn size in world units (only meaningful for `Sliced`).
    pub size: Vec2,
}

impl SpriteRenderer {
    pub fn new(sprite: SpriteRef) -> Self {
        let draw_mode = if sprite.sliced {
            SpriteDrawMode::Sliced
        } else {
            SpriteDrawMode::Simple
        };
        let size = sprite.bounds;
        Self {
            sprite,
            draw_mode,
            size,
        }
    }
}
