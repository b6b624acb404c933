use std::path::Path;

use image::{imageops, DynamicImage, GenericImageView, RgbaImage};

use crate::coords::Rect;
use crate::render::ribbon::RibbonError;

/// CPU-side RGBA8 image ready for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureImage {
    pub width: u32,
    pub height: u32,
    /// Row-major RGBA8, `width * height * 4` bytes.
    pub pixels: Vec<u8>,
    /// Color channels should be multiplied by alpha on upload.
    pub premultiply_alpha: bool,
}

impl TextureImage {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(pixels.len(), (width as usize) * (height as usize) * 4);
        Self {
            width,
            height,
            pixels,
            premultiply_alpha: false,
        }
    }

    pub fn with_premultiplied_alpha(mut self, premultiply: bool) -> Self {
        self.premultiply_alpha = premultiply;
        self
    }

    pub fn from_dynamic(image: DynamicImage) -> Self {
        let (width, height) = image.dimensions();
        Self::new(width, height, image.to_rgba8().into_raw())
    }

    /// Decodes an image file (png, jpeg, bmp, gif).
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RibbonError> {
        let path = path.as_ref();
        let image = image::open(path).map_err(|e| RibbonError::TextureDecode {
            source: path.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(Self::from_dynamic(image))
    }

    /// Two-color checkerboard, `cells` squares per side.
    pub fn checker(size: u32, cells: u32, a: [u8; 4], b: [u8; 4]) -> Self {
        let cell = (size / cells.max(1)).max(1);
        let mut pixels = Vec::with_capacity((size * size * 4) as usize);
        for y in 0..size {
            for x in 0..size {
                let odd = ((x / cell) + (y / cell)) % 2 == 1;
                pixels.extend_from_slice(if odd { &b } else { &a });
            }
        }
        Self::new(size, size, pixels)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Copies the sub-rectangle `frame` (pixels). Returns `None` when the
    /// frame is empty or not fully inside the image.
    pub fn crop(&self, frame: Rect) -> Option<TextureImage> {
        let r = frame.normalized();
        if r.is_empty() || !r.fits_within(self.width as f32, self.height as f32) {
            return None;
        }
        let (x, y) = (r.origin.x as u32, r.origin.y as u32);
        let (w, h) = (r.size.x as u32, r.size.y as u32);
        if w == 0 || h == 0 {
            return None;
        }

        let view = self.to_rgba_image()?;
        let sub = imageops::crop_imm(&view, x, y, w, h).to_image();
        Some(TextureImage {
            width: w,
            height: h,
            pixels: sub.into_raw(),
            premultiply_alpha: self.premultiply_alpha,
        })
    }

    /// Pixels as uploaded: premultiplied when requested.
    pub fn upload_pixels(&self) -> Vec<u8> {
        if !self.premultiply_alpha {
            return self.pixels.clone();
        }
        self.pixels
            .chunks_exact(4)
            .flat_map(|p| {
                let a = p[3] as u32;
                let mul = |c: u8| ((c as u32 * a + 127) / 255) as u8;
                [mul(p[0]), mul(p[1]), mul(p[2]), p[3]]
            })
            .collect()
    }

    /// Number of levels in a full mip chain.
    pub fn mip_level_count(&self) -> u32 {
        let largest = self.width.max(self.height).max(1);
        u32::BITS - largest.leading_zeros()
    }

    /// Successive half-size levels (level 1 onward) built with a triangle filter.
    pub fn mip_chain(&self) -> Vec<TextureImage> {
        let Some(mut current) = self.to_rgba_image() else { return Vec::new() };
        let mut levels = Vec::new();
        for _ in 1..self.mip_level_count() {
            let w = (current.width() / 2).max(1);
            let h = (current.height() / 2).max(1);
            current = imageops::resize(&current, w, h, imageops::FilterType::Triangle);
            levels.push(TextureImage {
                width: w,
                height: h,
                pixels: current.as_raw().clone(),
                premultiply_alpha: false,
            });
        }
        levels
    }

    fn to_rgba_image(&self) -> Option<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.pixels.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checker_alternates_cells() {
        let img = TextureImage::checker(4, 2, [0, 0, 0, 255], [255, 255, 255, 255]);
        assert_eq!(img.pixels.len(), 64);
        assert_eq!(&img.pixels[0..4], &[0, 0, 0, 255]);
        // x = 2 is the second cell on the first row.
        assert_eq!(&img.pixels[8..12], &[255, 255, 255, 255]);
    }

    #[test]
    fn mip_level_count_covers_largest_side() {
        assert_eq!(TextureImage::checker(1, 1, [0; 4], [0; 4]).mip_level_count(), 1);
        assert_eq!(TextureImage::checker(8, 2, [0; 4], [0; 4]).mip_level_count(), 4);
        let wide = TextureImage::new(5, 1, vec![0; 20]);
        assert_eq!(wide.mip_level_count(), 3);
    }

    #[test]
    fn mip_chain_halves_down_to_one() {
        let img = TextureImage::checker(8, 2, [0; 4], [255; 4]);
        let sizes: Vec<(u32, u32)> = img.mip_chain().iter().map(|l| (l.width, l.height)).collect();
        assert_eq!(sizes, vec![(4, 4), (2, 2), (1, 1)]);
    }

    #[test]
    fn premultiply_scales_color_by_alpha() {
        let img = TextureImage::new(1, 1, vec![255, 128, 0, 128]).with_premultiplied_alpha(true);
        assert_eq!(img.upload_pixels(), vec![128, 64, 0, 128]);
    }

    #[test]
    fn crop_rejects_out_of_bounds_frames() {
        let img = TextureImage::checker(4, 2, [1, 2, 3, 4], [5, 6, 7, 8]);
        assert!(img.crop(Rect::new(2.0, 2.0, 4.0, 1.0)).is_none());
        assert!(img.crop(Rect::new(0.0, 0.0, 0.0, 1.0)).is_none());

        let sub = img.crop(Rect::new(2.0, 0.0, 2.0, 2.0)).unwrap();
        assert_eq!((sub.width, sub.height), (2, 2));
        assert_eq!(&sub.pixels[0..4], &[5, 6, 7, 8]);
    }
}
