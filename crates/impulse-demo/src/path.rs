//! The random rolling-hills path the demo lays its ribbon along.

use rand::Rng;

use impulse_engine::coords::{DeviceMetrics, Vec2};

use crate::config::DemoConfig;

/// Cosine interpolation between `a` and `b`; `t` in `[0, 1]`.
pub fn cosine_interpolate(a: f64, b: f64, t: f64) -> f64 {
    let f = (1.0 - (t * std::f64::consts::PI).cos()) * 0.5;
    a * (1.0 - f) + b * f
}

/// Path parameters in device pixels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PathParams {
    /// Points are generated for `x` in `0..width`, one per pixel.
    pub width: u32,
    pub wavelength: u32,
    pub amplitude: f64,
    pub skip: usize,
}

impl PathParams {
    pub fn scaled(config: &DemoConfig, metrics: &DeviceMetrics) -> Self {
        let scale = metrics.scale_factor as f64;
        let world_width = world_width(config, metrics) as f64;
        Self {
            width: (world_width * 1.5).ceil() as u32,
            wavelength: ((config.wavelength * scale).floor() as u32).max(1),
            amplitude: (config.amplitude * scale).floor(),
            skip: ((config.skip_factor * scale).floor() as usize).max(1),
        }
    }
}

/// Width of the scrollable world in device pixels.
pub fn world_width(config: &DemoConfig, metrics: &DeviceMetrics) -> f32 {
    metrics.world_horizontal_span * config.world_width_multiplier * metrics.scale_factor
}

/// One point per pixel column. Every `wavelength` columns a new random
/// target height is drawn; columns in between ease towards it.
pub fn interpolated_points<R: Rng + ?Sized>(params: &PathParams, rng: &mut R) -> Vec<Vec2> {
    let mut points = Vec::with_capacity(params.width as usize);
    let (mut a, mut b) = (0.0_f64, 0.0_f64);

    for x in 0..params.width {
        let phase = x % params.wavelength;
        let value = if phase == 0 {
            a = b;
            b = rng.random::<f64>();
            a
        } else {
            cosine_interpolate(a, b, phase as f64 / params.wavelength as f64)
        };
        points.push(Vec2::new(x as f32, (value * params.amplitude) as f32));
    }
    points
}

/// `(p[i], p[i + skip])` for `i = 0, skip, 2*skip, ...` while both exist,
/// flattened into the pair list the ribbon renderer takes.
pub fn waypoint_pairs(points: &[Vec2], skip: usize) -> Vec<Vec2> {
    let skip = skip.max(1);
    (0..points.len())
        .step_by(skip)
        .take_while(|&i| i + skip < points.len())
        .flat_map(|i| [points[i], points[i + skip]])
        .collect()
}

/// Full pipeline: device-scaled parameters, points, pairs.
pub fn ribbon_waypoints<R: Rng + ?Sized>(
    config: &DemoConfig,
    metrics: &DeviceMetrics,
    rng: &mut R,
) -> Vec<Vec2> {
    let params = PathParams::scaled(config, metrics);
    let points = interpolated_points(&params, rng);
    let pairs = waypoint_pairs(&points, params.skip);
    log::debug!(
        "path: {} points, {} segments (wavelength {}, skip {})",
        points.len(),
        pairs.len() / 2,
        params.wavelength,
        params.skip
    );
    pairs
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn metrics() -> DeviceMetrics {
        DeviceMetrics::from_window(1280.0, 720.0, 1.0)
    }

    // ── interpolation ────────────────────────────────────────────────────

    #[test]
    fn cosine_endpoints_and_midpoint() {
        assert_eq!(cosine_interpolate(2.0, 5.0, 0.0), 2.0);
        assert!((cosine_interpolate(2.0, 5.0, 1.0) - 5.0).abs() < 1e-12);
        assert!((cosine_interpolate(0.0, 1.0, 0.5) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn cosine_is_monotonic_between_endpoints() {
        let mut prev = cosine_interpolate(0.0, 1.0, 0.0);
        for i in 1..=20 {
            let v = cosine_interpolate(0.0, 1.0, i as f64 / 20.0);
            assert!(v >= prev);
            prev = v;
        }
    }

    // ── parameters ───────────────────────────────────────────────────────

    #[test]
    fn reference_device_parameters() {
        let p = PathParams::scaled(&DemoConfig::default(), &metrics());
        assert_eq!(p.wavelength, 800);
        assert_eq!(p.amplitude, 900.0);
        assert_eq!(p.skip, 300);
        assert_eq!(p.width, 5760);
    }

    #[test]
    fn tiny_scale_keeps_strides_positive() {
        let m = DeviceMetrics::from_window(1.0, 0.5, 1.0);
        let p = PathParams::scaled(&DemoConfig::default(), &m);
        assert!(p.wavelength >= 1 && p.skip >= 1);
    }

    // ── points ───────────────────────────────────────────────────────────

    #[test]
    fn points_start_flat_and_stay_in_amplitude() {
        let params = PathParams {
            width: 100,
            wavelength: 10,
            amplitude: 50.0,
            skip: 5,
        };
        let mut rng = StdRng::seed_from_u64(7);
        let points = interpolated_points(&params, &mut rng);

        assert_eq!(points.len(), 100);
        assert_eq!(points[0], Vec2::new(0.0, 0.0));
        assert!(points.iter().all(|p| (0.0..=50.0).contains(&p.y)));
        assert!(points.windows(2).all(|w| w[1].x - w[0].x == 1.0));
    }

    #[test]
    fn same_seed_same_path() {
        let params = PathParams::scaled(&DemoConfig::default(), &metrics());
        let a = interpolated_points(&params, &mut StdRng::seed_from_u64(3));
        let b = interpolated_points(&params, &mut StdRng::seed_from_u64(3));
        assert_eq!(a, b);
    }

    // ── pairing ──────────────────────────────────────────────────────────

    #[test]
    fn pairs_are_skip_apart() {
        let points: Vec<Vec2> = (0..10).map(|x| Vec2::new(x as f32, 0.0)).collect();
        let pairs = waypoint_pairs(&points, 3);
        let xs: Vec<f32> = pairs.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![0.0, 3.0, 3.0, 6.0, 6.0, 9.0]);
    }

    #[test]
    fn too_few_points_give_no_pairs() {
        let points = vec![Vec2::zero(); 3];
        assert!(waypoint_pairs(&points, 3).is_empty());
        assert!(waypoint_pairs(&[], 1).is_empty());
    }
}
