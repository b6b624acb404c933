//! Repeating-texture ribbon renderer.
//!
//! A low-level renderer that shares the host's [`GraphicsContext`]:
//! - `geometry` turns waypoint pairs into quads with tiled texcoords
//! - `buffers` appends them to growable device buffers
//! - `program` owns the shader program and swaps it with the host's
//! - `renderer` drives uploads, the per-frame draw and teardown
//!
//! [`GraphicsContext`]: crate::gfx::GraphicsContext

mod buffers;
mod config;
mod error;
mod geometry;
mod host;
mod program;
mod renderer;

pub use buffers::{BufferStats, GpuBufferSet, GrowableBuffer};
pub use config::{RibbonConfig, RibbonMetrics};
pub use error::RibbonError;
pub use geometry::{build_ribbon, MeshBatch, POSITION_COMPONENTS, TEXCOORD_COMPONENTS};
pub use host::{Camera, Clock, FixedCamera, FixedClock, SurfaceInfo, TextureSource};
pub use program::{clip_matrix, view_matrix, AttribSlots, ProgramController};
pub use renderer::{RendererState, RibbonRenderer};
