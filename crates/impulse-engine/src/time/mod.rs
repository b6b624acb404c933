//! Frame timing: one `FrameClock` per window, ticked once per redraw.

mod frame_clock;

pub use frame_clock::{FrameClock, FrameTime};
