//! Image filters applied after blending
//!
//! - [`gaussian_blur`] softens an accumulated layer in place
//! - [`derive_normal_map`] turns accumulated heights into an RGBA8 normal map

use std::ops::{AddAssign, Mul};

use glam::{Vec3, Vec4};
use image::RgbaImage;

use crate::surface::{CpuSurface, SurfaceError, to_u8, try_filled};

/// Luminance weights (Rec. 709) used to read heights from a layer
const LUMA: [f32; 3] = [0.2126, 0.7152, 0.0722];

/// How samples beyond the image border are read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EdgeMode {
    /// Outside is transparent black
    Zero,
    /// Outside repeats the nearest border sample
    Clamp,
}

/// Normalized 1-D Gaussian with standard deviation `radius`
fn gaussian_kernel(radius: f32) -> Vec<f32> {
    let sigma = radius.max(f32::EPSILON);
    let extent = (sigma * 3.0).ceil().max(1.0) as i32;
    let two_sigma_sq = 2.0 * sigma * sigma;

    let mut kernel: Vec<f32> = (-extent..=extent)
        .map(|d| (-((d * d) as f32) / two_sigma_sq).exp())
        .collect();
    let sum: f32 = kernel.iter().sum();
    for weight in &mut kernel {
        *weight /= sum;
    }
    kernel
}

#[inline]
fn source_index(i: isize, len: usize, edge: EdgeMode) -> Option<usize> {
    if i >= 0 && (i as usize) < len {
        return Some(i as usize);
    }
    match edge {
        EdgeMode::Zero => None,
        EdgeMode::Clamp => Some(i.clamp(0, len as isize - 1) as usize),
    }
}

/// Separable convolution of a row-major plane
fn convolve<T>(
    data: &mut [T],
    width: u32,
    height: u32,
    kernel: &[f32],
    edge: EdgeMode,
) -> Result<(), SurfaceError>
where
    T: Copy + Default + AddAssign + Mul<f32, Output = T>,
{
    let (w, h) = (width as usize, height as usize);
    if w == 0 || h == 0 {
        return Ok(());
    }
    let extent = (kernel.len() / 2) as isize;
    let mut scratch = try_filled(data.len(), T::default(), width, height)?;

    // Horizontal pass into scratch
    for y in 0..h {
        let row = y * w;
        for x in 0..w {
            let mut acc = T::default();
            for (k, &weight) in kernel.iter().enumerate() {
                let sx = x as isize + k as isize - extent;
                if let Some(sx) = source_index(sx, w, edge) {
                    acc += data[row + sx] * weight;
                }
            }
            scratch[row + x] = acc;
        }
    }

    // Vertical pass back into data
    for y in 0..h {
        for x in 0..w {
            let mut acc = T::default();
            for (k, &weight) in kernel.iter().enumerate() {
                let sy = y as isize + k as isize - extent;
                if let Some(sy) = source_index(sy, h, edge) {
                    acc += scratch[sy * w + x] * weight;
                }
            }
            data[y * w + x] = acc;
        }
    }
    Ok(())
}

/// Gaussian blur a premultiplied surface in place
///
/// Pixels beyond the border count as transparent. A radius of zero or less
/// leaves the surface untouched.
pub fn gaussian_blur(surface: &mut CpuSurface, radius: f32) -> Result<(), SurfaceError> {
    if !(radius > 0.0) {
        return Ok(());
    }
    let (width, height) = (surface.width, surface.height);
    let mut data = try_filled(surface.pixel_count(), Vec4::ZERO, width, height)?;
    for (dst, src) in data.iter_mut().zip(surface.pixels()) {
        *dst = Vec4::from_array(*src);
    }

    convolve(&mut data, width, height, &gaussian_kernel(radius), EdgeMode::Zero)?;

    for (dst, src) in surface.pixels_mut().iter_mut().zip(data.iter()) {
        *dst = src.to_array();
    }
    Ok(())
}

/// Derive a tangent-space normal map from a height layer
///
/// Height is the luminance of each premultiplied pixel. `smoothness` blurs
/// the heights before differentiation and `contrast` scales the slopes.
/// Normals are encoded as `n * 0.5 + 0.5` with green pointing up the image;
/// a flat layer encodes as (128, 128, 255).
pub fn derive_normal_map(
    surface: &CpuSurface,
    smoothness: f32,
    contrast: f32,
) -> Result<RgbaImage, SurfaceError> {
    let (width, height) = (surface.width, surface.height);
    let mut heights = try_filled(surface.pixel_count(), 0.0f32, width, height)?;
    for (h, px) in heights.iter_mut().zip(surface.pixels()) {
        *h = px[0] * LUMA[0] + px[1] * LUMA[1] + px[2] * LUMA[2];
    }

    if smoothness > 0.0 {
        convolve(&mut heights, width, height, &gaussian_kernel(smoothness), EdgeMode::Clamp)?;
    }

    let (w, h) = (width as usize, height as usize);
    let at = |x: isize, y: isize| -> f32 {
        let x = x.clamp(0, w as isize - 1) as usize;
        let y = y.clamp(0, h as isize - 1) as usize;
        heights[y * w + x]
    };

    let mut bytes = try_filled(surface.pixel_count() * 4, 0u8, width, height)?;
    for y in 0..h {
        for x in 0..w {
            let (xi, yi) = (x as isize, y as isize);
            let slope_x = (at(xi + 1, yi) - at(xi - 1, yi)) * 0.5;
            let slope_up = (at(xi, yi - 1) - at(xi, yi + 1)) * 0.5;
            let normal = Vec3::new(-slope_x * contrast, -slope_up * contrast, 1.0).normalize();

            let out = &mut bytes[(y * w + x) * 4..][..4];
            out[0] = to_u8(normal.x * 0.5 + 0.5);
            out[1] = to_u8(normal.y * 0.5 + 0.5);
            out[2] = to_u8(normal.z * 0.5 + 0.5);
            out[3] = 255;
        }
    }

    RgbaImage::from_raw(width, height, bytes).ok_or(SurfaceError::Allocation { width, height })
}
