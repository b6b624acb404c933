//! impulse engine.
//!
//! A repeating-texture ribbon renderer ([`render::ribbon`]) drawn through an
//! explicit graphics context ([`gfx`]), plus the window/GPU runtime that hosts
//! it: [`window`], [`device`], [`input`], [`time`] and the [`core`] app contract.

pub mod assets;
pub mod coords;
pub mod core;
pub mod device;
pub mod gfx;
pub mod input;
pub mod logging;
pub mod render;
pub mod time;
pub mod window;
