//! Rendering-context abstraction.
//!
//! Low-level renderers talk to the GPU through [`GraphicsContext`], a
//! GL-shaped interface with explicit bind state:
//! - [`WgpuContext`] drives a real wgpu device and defers draws to a pass
//! - [`HeadlessContext`] keeps everything in memory and records calls
//!
//! The context is always passed in by `&mut`; nothing here is global.

mod context;
mod headless;
mod texture;
mod wgpu_context;

pub use context::{
    BufferId, BufferTarget, BufferUsage, ContextState, Filter, GraphicsContext, ProgramId,
    SamplerParams, ShaderId, ShaderStage, StateStack, TextureId, UniformLocation,
};
pub use headless::{Call, DrawRecord, HeadlessContext, UniformValue};
pub use texture::TextureImage;
pub use wgpu_context::{WgpuContext, FRAGMENT_ENTRY, VERTEX_ENTRY};
