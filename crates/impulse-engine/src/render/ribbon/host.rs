//! What the ribbon renderer needs from the engine hosting it.

use crate::coords::Vec2;
use crate::gfx::TextureImage;

use super::error::RibbonError;

/// Source of the world-space camera offset.
pub trait Camera {
    /// Top-left of the visible world region.
    fn offset(&self) -> Vec2;
}

/// Source of the scene clock.
pub trait Clock {
    /// Milliseconds since the scene started.
    fn now_ms(&self) -> f64;
}

/// Texture lookup by asset key and optional atlas frame name.
pub trait TextureSource {
    fn resolve(&self, key: &str, frame: Option<&str>) -> Result<TextureImage, RibbonError>;
}

/// Drawable surface size in device pixels, read once at construction.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SurfaceInfo {
    pub width: f32,
    pub height: f32,
}

impl SurfaceInfo {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// A camera that never moves.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct FixedCamera(pub Vec2);

impl Camera for FixedCamera {
    fn offset(&self) -> Vec2 {
        self.0
    }
}

/// A clock stopped at a given time.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct FixedClock(pub f64);

impl Clock for FixedClock {
    fn now_ms(&self) -> f64 {
        self.0
    }
}
