use std::path::PathBuf;

use impulse_engine::coords::ColorRgba;

/// Environment variable holding the path RNG seed.
pub const SEED_VAR: &str = "IMPULSE_SEED";

/// Demo scene parameters. Lengths are in reference pixels and get scaled by
/// the device scale factor.
#[derive(Debug, Clone)]
pub struct DemoConfig {
    /// Distance between random target heights.
    pub wavelength: f64,
    /// Height of a target value of 1.
    pub amplitude: f64,
    /// Stride between the two ends of each ribbon segment.
    pub skip_factor: f64,
    /// World width in screen widths.
    pub world_width_multiplier: f32,
    pub texture_key: String,
    /// Image to draw along the ribbon; a generated checker when `None`.
    pub texture_path: Option<PathBuf>,
    pub seed: Option<u64>,
    pub clear_color: ColorRgba,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            wavelength: 800.0,
            amplitude: 900.0,
            skip_factor: 300.0,
            world_width_multiplier: 3.0,
            texture_key: "untitled".to_string(),
            texture_path: None,
            seed: None,
            clear_color: ColorRgba::from_srgb8(0xF6, 0xF6, 0xF8),
        }
    }
}

impl DemoConfig {
    /// Texture path from the first CLI argument, seed from `IMPULSE_SEED`.
    pub fn from_env() -> Self {
        Self::from_parts(std::env::args().skip(1), std::env::var(SEED_VAR).ok())
    }

    fn from_parts(mut args: impl Iterator<Item = String>, seed: Option<String>) -> Self {
        let seed = seed.and_then(|s| match s.trim().parse::<u64>() {
            Ok(v) => Some(v),
            Err(_) => {
                log::warn!("{SEED_VAR}={s:?} is not a u64; using a random seed");
                None
            }
        });

        Self {
            texture_path: args.next().map(PathBuf::from),
            seed,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter().map(|s| s.to_string()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn defaults_match_reference_scene() {
        let c = DemoConfig::default();
        assert_eq!(c.wavelength, 800.0);
        assert_eq!(c.amplitude, 900.0);
        assert_eq!(c.skip_factor, 300.0);
        assert_eq!(c.world_width_multiplier, 3.0);
        assert_eq!(c.texture_key, "untitled");
    }

    #[test]
    fn first_argument_is_texture_path() {
        let c = DemoConfig::from_parts(args(&["road.png", "ignored"]), None);
        assert_eq!(c.texture_path, Some(PathBuf::from("road.png")));
        assert_eq!(c.seed, None);
    }

    #[test]
    fn seed_parsed_or_dropped() {
        assert_eq!(DemoConfig::from_parts(args(&[]), Some(" 42 ".into())).seed, Some(42));
        assert_eq!(DemoConfig::from_parts(args(&[]), Some("abc".into())).seed, None);
    }
}
