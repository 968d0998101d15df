//! Lightweight references to engine assets (textures, sprites).
//!
//! The region crates never own pixel data. They pass around stable
//! identifiers that the host resolves when it draws.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Identifier of the built-in blank texture used whenever nothing else can be shown.
pub const BLANK_TEXTURE_ID: &str = "builtin://black";

/// Reference to a texture asset by path or identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TextureRef(String);

impl TextureRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The sentinel texture applied when a region has no overlay to show.
    pub fn blank() -> Self {
        Self(BLANK_TEXTURE_ID.to_string())
    }

    pub fn is_blank(&self) -> bool {
        self.0 == BLANK_TEXTURE_ID
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TextureRef {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Reference to a sprite: a texture plus the size it occupies at unit scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpriteRef {
    pub texture: TextureRef,
    /// Size of the sprite in world units at scale 1.
    #[serde(default = "default_sprite_bounds")]
    pub bounds: Vec2,
    /// Nine-slice sprites stretch their centre instead of scaling as a whole.
    #[serde(default)]
    pub sliced: bool,
}

fn default_sprite_bounds() -> Vec2 {
    Vec2::ONE
}

impl SpriteRef {
    pub fn new(texture: impl Into<String>) -> Self {
        Self {
            texture: TextureRef::new(texture),
            bounds: default_sprite_bounds(),
            sliced: false,
        }
    }

    pub fn with_bounds(mut self, bounds: Vec2) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn sliced(mut self) -> Self {
        self.sliced = true;
        self
    }
}
