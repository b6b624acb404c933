/// Linear RGBA color, used for the frame clear.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct ColorRgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl ColorRgba {
    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color from 8-bit sRGB channels.
    pub fn from_srgb8(r: u8, g: u8, b: u8) -> Self {
        fn linear(c: u8) -> f32 {
            let c = c as f32 / 255.0;
            if c <= 0.04045 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        }
        Self::new(linear(r), linear(g), linear(b), 1.0)
    }

    #[inline]
    pub fn to_wgpu(self) -> wgpu::Color {
        wgpu::Color {
            r: self.r as f64,
            g: self.g as f64,
            b: self.b as f64,
            a: self.a as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn srgb_endpoints_map_to_linear_endpoints() {
        assert_eq!(ColorRgba::from_srgb8(0, 0, 0), ColorRgba::new(0.0, 0.0, 0.0, 1.0));
        let white = ColorRgba::from_srgb8(255, 255, 255);
        assert!((white.r - 1.0).abs() < 1e-6);
        let mid = ColorRgba::from_srgb8(128, 128, 128);
        assert!((mid.g - 0.2158).abs() < 1e-3);
    }
}
