use super::error::RibbonError;

/// Ribbon renderer configuration.
///
/// Defaults reproduce the tuned values of the play scene.
#[derive(Debug, Clone)]
pub struct RibbonConfig {
    /// Quads the device buffers hold before the first growth.
    pub initial_quad_capacity: usize,
    /// Capacity multiplier applied (and floored) on overflow.
    pub growth_factor: f64,
    /// Fraction of the texture width one repeat spans on screen, before the
    /// device scale factor.
    pub highlight_repeat: f32,
    /// Ribbon depth as a fraction of the world's vertical span.
    pub vertical_extent_ratio: f32,
    /// Uniform scale in the view matrix.
    pub view_scale: f32,
    /// Texture unit the ribbon texture is bound to and sampled from.
    pub texture_unit: u32,
    pub vertex_shader_id: String,
    pub fragment_shader_id: String,
    /// Fail construction on compile/link errors instead of running without a program.
    pub strict_shaders: bool,
}

impl Default for RibbonConfig {
    fn default() -> Self {
        Self {
            initial_quad_capacity: 90,
            growth_factor: 1.5,
            highlight_repeat: 0.3,
            vertical_extent_ratio: 0.7,
            view_scale: 0.6,
            texture_unit: 1,
            vertex_shader_id: "shader-vs".to_string(),
            fragment_shader_id: "shader-fs".to_string(),
            strict_shaders: false,
        }
    }
}

impl RibbonConfig {
    /// Initial element capacities as `(position floats, indices, texcoord floats)`.
    pub fn initial_capacities(&self) -> (usize, usize, usize) {
        let quads = self.initial_quad_capacity;
        (quads * 12, quads * 6, quads * 16)
    }

    /// Ribbon depth for a world `vertical_span` units tall.
    pub fn vertical_extent(&self, vertical_span: f32) -> f32 {
        vertical_span * self.vertical_extent_ratio
    }

    /// Width one texture repeat covers, for a texture `texture_width` pixels wide.
    pub fn scaled_texture_width(&self, texture_width: u32, scale_factor: f32) -> f32 {
        texture_width as f32 * scale_factor * self.highlight_repeat
    }
}

/// Geometry parameters that stay fixed for a given texture.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RibbonMetrics {
    /// World units covered by one horizontal texture repeat.
    pub scaled_texture_width: f32,
    /// How far each quad extends below its path edge.
    pub vertical_extent: f32,
}

impl RibbonMetrics {
    /// Validates both values so geometry never divides by zero.
    pub fn new(key: &str, scaled_texture_width: f32, vertical_extent: f32) -> Result<Self, RibbonError> {
        if !(scaled_texture_width > 0.0) {
            return Err(RibbonError::ZeroAreaTexture {
                key: key.to_string(),
                scaled_width: scaled_texture_width,
            });
        }
        if !(vertical_extent > 0.0) {
            return Err(RibbonError::ZeroVerticalExtent { extent: vertical_extent });
        }
        Ok(Self {
            scaled_texture_width,
            vertical_extent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_capacities_hold_ninety_quads() {
        assert_eq!(RibbonConfig::default().initial_capacities(), (1080, 540, 1440));
    }

    #[test]
    fn scaled_width_and_extent() {
        let cfg = RibbonConfig::default();
        assert!((cfg.scaled_texture_width(256, 1.0) - 76.8).abs() < 1e-4);
        assert!((cfg.scaled_texture_width(256, 2.0) - 153.6).abs() < 1e-4);
        assert!((cfg.vertical_extent(1000.0) - 700.0).abs() < 1e-3);
    }

    #[test]
    fn metrics_reject_non_positive_values() {
        assert!(matches!(
            RibbonMetrics::new("tex", 0.0, 10.0),
            Err(RibbonError::ZeroAreaTexture { .. })
        ));
        assert!(matches!(
            RibbonMetrics::new("tex", 10.0, -1.0),
            Err(RibbonError::ZeroVerticalExtent { .. })
        ));
        assert!(matches!(
            RibbonMetrics::new("tex", f32::NAN, 10.0),
            Err(RibbonError::ZeroAreaTexture { .. })
        ));
        assert!(RibbonMetrics::new("tex", 10.0, 10.0).is_ok());
    }
}
