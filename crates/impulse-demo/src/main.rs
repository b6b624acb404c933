//! Ribbon demo: a repeating texture laid along a random rolling path.
//!
//! Drag with the left mouse button to pan, Escape to quit. The first argument
//! may name an image to use as the texture; `IMPULSE_SEED` fixes the path.

mod camera;
mod config;
mod path;
mod play;

use anyhow::Result;

use impulse_engine::device::GpuInit;
use impulse_engine::logging::{LoggingConfig, init_logging};
use impulse_engine::window::{Runtime, RuntimeConfig};

use crate::config::DemoConfig;
use crate::play::Play;

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let config = DemoConfig::from_env();
    if let Some(seed) = config.seed {
        log::info!("path seed {seed}");
    }

    let app = Play::new(config)?;
    Runtime::run(
        RuntimeConfig {
            title: "impulse ribbon".to_string(),
            ..RuntimeConfig::default()
        },
        GpuInit::default(),
        app,
    )
}
