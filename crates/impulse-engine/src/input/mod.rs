//! Pointer and keyboard input, reduced to what the ribbon demo drives:
//! pointer position and motion, mouse buttons, a handful of keys.
//!
//! The public types carry no winit types; `platform::winit` translates.

mod frame;
pub(crate) mod platform;
mod state;
mod types;

pub use frame::InputFrame;
pub use state::InputState;
pub use types::{InputEvent, Key, KeyState, MouseButton, MouseButtonState};
