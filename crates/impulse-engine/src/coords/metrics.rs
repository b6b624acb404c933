//! Device resolution and the scale factor derived from it.

/// Neither device dimension may exceed this many pixels.
pub const MAX_DEVICE_DIMENSION: f32 = 2048.0;

/// Reference layout the scene was designed for.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Orientation {
    /// 720 x 1280
    Portrait,
    /// 1280 x 720
    Landscape,
}

impl Orientation {
    /// `(width, height)` of the reference resolution.
    pub fn primary_size(self) -> (f32, f32) {
        match self {
            Orientation::Portrait => (720.0, 1280.0),
            Orientation::Landscape => (1280.0, 720.0),
        }
    }
}

/// Scale factor and world bounds for the current device.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DeviceMetrics {
    /// Device width over the reference width.
    pub scale_factor: f32,
    /// Device width in pixels.
    pub world_horizontal_span: f32,
    /// Device height in pixels.
    pub world_vertical_span: f32,
}

impl DeviceMetrics {
    /// Metrics for a window of `logical_width x logical_height` at `dpr`.
    pub fn from_window(logical_width: f32, logical_height: f32, dpr: f32) -> Self {
        let orientation = if logical_width > logical_height {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        };
        let (device_width, device_height) = device_dimensions(logical_width, logical_height, dpr);
        let (primary_width, _) = orientation.primary_size();

        Self {
            scale_factor: device_width / primary_width,
            world_horizontal_span: device_width,
            world_vertical_span: device_height,
        }
    }
}

/// Logical size times `dpr`, scaled down uniformly when a side would exceed
/// [`MAX_DEVICE_DIMENSION`].
pub fn device_dimensions(logical_width: f32, logical_height: f32, dpr: f32) -> (f32, f32) {
    let width = logical_width * dpr;
    let height = logical_height * dpr;
    if width <= MAX_DEVICE_DIMENSION && height <= MAX_DEVICE_DIMENSION {
        return (width, height);
    }
    let ratio = (MAX_DEVICE_DIMENSION / logical_width).min(MAX_DEVICE_DIMENSION / logical_height);
    (logical_width * ratio, logical_height * ratio)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn landscape_reference_scale() {
        let m = DeviceMetrics::from_window(1280.0, 720.0, 1.0);
        assert_eq!(m.scale_factor, 1.0);
        assert_eq!(m.world_horizontal_span, 1280.0);
        assert_eq!(m.world_vertical_span, 720.0);
    }

    #[test]
    fn portrait_uses_portrait_reference() {
        let m = DeviceMetrics::from_window(360.0, 640.0, 2.0);
        assert_eq!(m.scale_factor, 1.0);
        assert_eq!(m.world_vertical_span, 1280.0);
    }

    #[test]
    fn dpr_multiplies_device_size() {
        let m = DeviceMetrics::from_window(800.0, 600.0, 2.0);
        assert_eq!(m.world_horizontal_span, 1600.0);
        assert_eq!(m.scale_factor, 1600.0 / 1280.0);
    }

    #[test]
    fn wide_device_clamps_to_2048() {
        let (w, h) = device_dimensions(1600.0, 900.0, 2.0);
        assert!((w - 2048.0).abs() < 1e-3);
        assert!((h - 1152.0).abs() < 1e-3);
    }

    #[test]
    fn tall_device_clamps_to_2048() {
        let (w, h) = device_dimensions(500.0, 1200.0, 3.0);
        assert!((h - 2048.0).abs() < 1e-3);
        assert!(w <= MAX_DEVICE_DIMENSION);
        assert!((w / h - 500.0 / 1200.0).abs() < 1e-5);
    }

    #[test]
    fn exact_limit_is_kept() {
        assert_eq!(device_dimensions(1024.0, 600.0, 2.0), (2048.0, 1200.0));
    }
}
