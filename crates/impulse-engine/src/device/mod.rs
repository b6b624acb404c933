//! GPU device + surface management.
//!
//! Creates the wgpu instance/adapter/device/queue for one window, keeps the
//! surface configured across resizes, and hands out per-frame encoders.

mod context;
mod error;
mod frame;
mod init;
mod surface;

pub use context::Gpu;
pub use error::SurfaceErrorAction;
pub use frame::GpuFrame;
pub use init::GpuInit;
