//! CPU surface for compositing - premultiplied f32 RGBA storage

use image::{Rgba, RgbaImage};
use thiserror::Error;

use crate::types::BlendMode;

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("Failed to allocate {width}x{height} buffer")]
    Allocation { width: u32, height: u32 },
}

/// Axis-aligned pixel rectangle (x, y, width, height)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Allocate `len` copies of `value` without aborting on exhaustion
pub(crate) fn try_filled<T: Clone>(
    len: usize,
    value: T,
    width: u32,
    height: u32,
) -> Result<Vec<T>, SurfaceError> {
    let mut data = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|_| SurfaceError::Allocation { width, height })?;
    data.resize(len, value);
    Ok(data)
}

/// A premultiplied RGBA CPU surface
/// Stores pixels as [f32; 4] in row-major order
#[derive(Debug, Clone, PartialEq)]
pub struct CpuSurface {
    /// Surface dimensions
    pub width: u32,
    pub height: u32,
    pixels: Vec<[f32; 4]>,
}

impl CpuSurface {
    /// Create a new surface with the given dimensions, initialized to transparent black
    pub fn new(width: u32, height: u32) -> Self {
        let pixel_count = (width as usize) * (height as usize);
        Self {
            width,
            height,
            pixels: vec![[0.0, 0.0, 0.0, 0.0]; pixel_count],
        }
    }

    /// Like [`CpuSurface::new`], but reports allocation failure instead of aborting
    pub fn try_new(width: u32, height: u32) -> Result<Self, SurfaceError> {
        let pixel_count = (width as usize) * (height as usize);
        Ok(Self {
            width,
            height,
            pixels: try_filled(pixel_count, [0.0; 4], width, height)?,
        })
    }

    /// Fallible deep copy
    pub fn try_clone(&self) -> Result<Self, SurfaceError> {
        let mut pixels = Vec::new();
        pixels
            .try_reserve_exact(self.pixels.len())
            .map_err(|_| SurfaceError::Allocation {
                width: self.width,
                height: self.height,
            })?;
        pixels.extend_from_slice(&self.pixels);
        Ok(Self {
            width: self.width,
            height: self.height,
            pixels,
        })
    }

    /// Clear the surface to a solid premultiplied color
    pub fn clear(&mut self, color: [f32; 4]) {
        self.pixels.fill(color);
    }

    /// Get a pixel at the given coordinates
    /// Returns None if coordinates are out of bounds
    #[inline]
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[f32; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[self.index(x, y)])
    }

    /// Set a pixel at the given coordinates
    /// Does nothing if coordinates are out of bounds
    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, color: [f32; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let index = self.index(x, y);
        self.pixels[index] = color;
    }

    /// Blend `source` into this surface over `rect`
    ///
    /// Both surfaces must share dimensions; pixels outside `rect` are assumed
    /// to be transparent in `source`, which leaves them unchanged for both
    /// blend modes.
    pub fn blend_region(&mut self, source: &CpuSurface, rect: PixelRect, mode: BlendMode) {
        debug_assert_eq!((self.width, self.height), (source.width, source.height));
        let x_max = (rect.x + rect.width).min(self.width).min(source.width);
        let y_max = (rect.y + rect.height).min(self.height).min(source.height);

        for y in rect.y..y_max {
            for x in rect.x..x_max {
                let index = self.index(x, y);
                self.pixels[index] = mode.blend(source.pixels[index], self.pixels[index]);
            }
        }
    }

    /// Quantize to a straight-alpha RGBA8 image
    pub fn to_rgba8(&self) -> Result<RgbaImage, SurfaceError> {
        let mut bytes = try_filled(self.pixels.len() * 4, 0u8, self.width, self.height)?;
        for (out, px) in bytes.chunks_exact_mut(4).zip(self.pixels.iter()) {
            let alpha = px[3].clamp(0.0, 1.0);
            let unpremultiplied = |c: f32| {
                if alpha > 0.0 { (c / alpha).clamp(0.0, 1.0) } else { 0.0 }
            };
            out[0] = to_u8(unpremultiplied(px[0]));
            out[1] = to_u8(unpremultiplied(px[1]));
            out[2] = to_u8(unpremultiplied(px[2]));
            out[3] = to_u8(alpha);
        }
        RgbaImage::from_raw(self.width, self.height, bytes).ok_or(SurfaceError::Allocation {
            width: self.width,
            height: self.height,
        })
    }

    /// Get the total number of pixels
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.pixels.len()
    }

    /// Get direct access to pixel data (for advanced operations)
    #[inline]
    pub fn pixels(&self) -> &[[f32; 4]] {
        &self.pixels
    }

    /// Get mutable access to pixel data (for advanced operations)
    #[inline]
    pub fn pixels_mut(&mut self) -> &mut [[f32; 4]] {
        &mut self.pixels
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.width as usize) + (x as usize)
    }
}

#[inline]
pub(crate) fn to_u8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// A uniformly colored texture of the given size
pub(crate) fn solid_image(size: u32, color: [u8; 4]) -> RgbaImage {
    RgbaImage::from_pixel(size, size, Rgba(color))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_surface() {
        let surface = CpuSurface::new(100, 100);
        assert_eq!(surface.width, 100);
        assert_eq!(surface.height, 100);
        assert_eq!(surface.pixel_count(), 10000);
        assert!(surface.pixels().iter().all(|p| *p == [0.0; 4]));
    }

    #[test]
    fn test_try_new_matches_new() {
        let surface = CpuSurface::try_new(16, 8).unwrap();
        assert_eq!(surface, CpuSurface::new(16, 8));
        assert_eq!(surface.try_clone().unwrap(), surface);
    }

    #[test]
    fn test_get_set_pixel() {
        let mut surface = CpuSurface::new(10, 10);
        let color = [1.0, 0.5, 0.25, 1.0];

        surface.set_pixel(5, 5, color);
        assert_eq!(surface.get_pixel(5, 5), Some(color));

        // Out of bounds should return None
        assert_eq!(surface.get_pixel(100, 100), None);
    }

    #[test]
    fn test_blend_region_leaves_outside_untouched() {
        let mut dst = CpuSurface::new(8, 8);
        dst.clear([0.1, 0.1, 0.1, 0.1]);
        let mut src = CpuSurface::new(8, 8);
        src.clear([0.2, 0.2, 0.2, 0.2]);

        dst.blend_region(&src, PixelRect::new(2, 2, 2, 2), BlendMode::Additive);

        let summed = 0.1f32 + 0.2f32;
        assert_eq!(dst.get_pixel(2, 2), Some([summed; 4]));
        assert_eq!(dst.get_pixel(3, 3), Some([summed; 4]));
        assert_eq!(dst.get_pixel(0, 0), Some([0.1, 0.1, 0.1, 0.1]));
        assert_eq!(dst.get_pixel(4, 4), Some([0.1, 0.1, 0.1, 0.1]));
    }

    #[test]
    fn test_to_rgba8_unpremultiplies() {
        let mut surface = CpuSurface::new(2, 1);
        surface.set_pixel(0, 0, [0.25, 0.0, 0.125, 0.25]);

        let image = surface.to_rgba8().unwrap();
        assert_eq!(image.get_pixel(0, 0).0, [255, 0, 128, 64]);
        assert_eq!(image.get_pixel(1, 0).0, [0, 0, 0, 0]);
    }
}
