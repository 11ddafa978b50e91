#![forbid(unsafe_code)]

//! Geometric primitives.

/// Intrinsic dimensions of a decoded image, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PixelSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl PixelSize {
    /// Create a new pixel size.
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width divided by height. `None` when either side is zero.
    pub fn aspect_ratio(&self) -> Option<f32> {
        if self.width == 0 || self.height == 0 {
            return None;
        }
        Some(self.width as f32 / self.height as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aspect_ratio() {
        assert_eq!(PixelSize::new(200, 100).aspect_ratio(), Some(2.0));
        assert_eq!(PixelSize::new(100, 400).aspect_ratio(), Some(0.25));
        assert_eq!(PixelSize::new(0, 10).aspect_ratio(), None);
        assert_eq!(PixelSize::new(10, 0).aspect_ratio(), None);
    }
}
