//! Rendering.
//!
//! `ribbon` draws through a [`GraphicsContext`](crate::gfx::GraphicsContext);
//! the wgpu backend of that context encodes into the [`RenderTarget`] handed
//! out per frame by [`FrameCtx::render`](crate::core::FrameCtx::render).

mod ctx;
pub mod ribbon;

pub use ctx::{RenderCtx, RenderTarget};
