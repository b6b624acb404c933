//! Coordinate and geometry types shared by the runtime and the ribbon renderer.
//!
//! Spaces:
//! - World units: origin top-left, +X right, +Y down. Waypoints and the
//!   camera offset live here.
//! - Device pixels: window size times DPR, clamped by [`DeviceMetrics`].
//!   The clip matrix and `iResolution` are built from these.

mod color;
mod metrics;
mod rect;
mod vec2;
mod viewport;

pub use color::ColorRgba;
pub use metrics::{DeviceMetrics, Orientation, MAX_DEVICE_DIMENSION};
pub use rect::Rect;
pub use vec2::Vec2;
pub use viewport::Viewport;
