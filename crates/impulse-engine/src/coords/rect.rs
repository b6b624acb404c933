use super::Vec2;

/// Axis-aligned rectangle, top-left origin. Used for atlas frames in pixels.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Rect {
    pub origin: Vec2,
    pub size: Vec2,
}

impl Rect {
    #[inline]
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            origin: Vec2::new(x, y),
            size: Vec2::new(w, h),
        }
    }

    #[inline]
    pub fn max(self) -> Vec2 {
        self.origin + self.size
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.size.x <= 0.0 || self.size.y <= 0.0
    }

    /// Same area with non-negative width and height.
    pub fn normalized(self) -> Self {
        let (x, w) = if self.size.x < 0.0 {
            (self.origin.x + self.size.x, -self.size.x)
        } else {
            (self.origin.x, self.size.x)
        };
        let (y, h) = if self.size.y < 0.0 {
            (self.origin.y + self.size.y, -self.size.y)
        } else {
            (self.origin.y, self.size.y)
        };
        Rect::new(x, y, w, h)
    }

    /// `true` when the rectangle lies inside `[0, width] x [0, height]`.
    pub fn fits_within(self, width: f32, height: f32) -> bool {
        let r = self.normalized();
        let max = r.max();
        r.origin.x >= 0.0 && r.origin.y >= 0.0 && max.x <= width && max.y <= height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_flips_negative_extents() {
        let r = Rect::new(10.0, 10.0, -4.0, -3.0).normalized();
        assert_eq!(r, Rect::new(6.0, 7.0, 4.0, 3.0));
        let same = Rect::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(same.normalized(), same);
    }

    #[test]
    fn fits_within_bounds() {
        assert!(Rect::new(0.0, 0.0, 8.0, 8.0).fits_within(8.0, 8.0));
        assert!(Rect::new(8.0, 4.0, -4.0, 4.0).fits_within(8.0, 8.0));
        assert!(!Rect::new(6.0, 0.0, 4.0, 4.0).fits_within(8.0, 8.0));
        assert!(!Rect::new(-1.0, 0.0, 2.0, 2.0).fits_within(8.0, 8.0));
    }

    #[test]
    fn empty_when_any_side_is_zero() {
        assert!(Rect::new(0.0, 0.0, 0.0, 5.0).is_empty());
        assert!(!Rect::new(0.0, 0.0, 1.0, 1.0).is_empty());
    }
}
