use std::sync::Arc;

use glam::Vec2;
use image::RgbaImage;

/// A renderable RGBA8 texture shared between the compositor and the surface
pub type Texture = Arc<RgbaImage>;

/// Class of pointer that produced an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerKind {
    Stylus,
    Touch,
    Mouse,
}

/// One normalized pointer observation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Position in canvas pixels
    pub location: Vec2,
    /// Normalized force, 0.0 to 1.0
    pub force: f32,
    /// Unit vector of the device's azimuth projected onto the canvas
    pub azimuth_vector: Vec2,
    /// Azimuth in radians
    pub azimuth_angle: f32,
}

impl Sample {
    pub fn new(location: Vec2, force: f32, azimuth_vector: Vec2, azimuth_angle: f32) -> Self {
        Self {
            location,
            force,
            azimuth_vector,
            azimuth_angle,
        }
    }

    /// Build a sample from a raw device force and the device's maximum force
    ///
    /// The force is divided by `max_force` and clamped to 0.0-1.0. A
    /// non-positive maximum yields zero force.
    pub fn from_raw(
        location: Vec2,
        force: f32,
        max_force: f32,
        azimuth_vector: Vec2,
        azimuth_angle: f32,
    ) -> Self {
        let force = if max_force > 0.0 {
            (force / max_force).clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self::new(location, force, azimuth_vector, azimuth_angle)
    }
}

/// Blend operators used to merge a stroke raster into an accumulator
///
/// Pixels are premultiplied RGBA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    /// `out = src + dst * (1 - src.a)`
    #[default]
    SourceOver,
    /// `out = min(src + dst, 1)` per channel
    Additive,
}

impl BlendMode {
    #[inline]
    pub fn blend(self, src: [f32; 4], dst: [f32; 4]) -> [f32; 4] {
        match self {
            BlendMode::SourceOver => {
                let inv_src_alpha = 1.0 - src[3];
                [
                    src[0] + dst[0] * inv_src_alpha,
                    src[1] + dst[1] * inv_src_alpha,
                    src[2] + dst[2] * inv_src_alpha,
                    src[3] + dst[3] * inv_src_alpha,
                ]
            }
            BlendMode::Additive => [
                (src[0] + dst[0]).min(1.0),
                (src[1] + dst[1]).min(1.0),
                (src[2] + dst[2]).min(1.0),
                (src[3] + dst[3]).min(1.0),
            ],
        }
    }
}

/// Identifies a transient preview overlay owned by the interactive side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PreviewHandle(pub u64);

/// Convert a straight-alpha color to premultiplied form
#[inline]
pub fn premultiply(color: [f32; 4]) -> [f32; 4] {
    let a = color[3].clamp(0.0, 1.0);
    [color[0] * a, color[1] * a, color[2] * a, a]
}

/// Convert hue/saturation/brightness (all 0.0-1.0) to straight-alpha RGBA
pub fn hsb_to_rgba(hue: f32, saturation: f32, brightness: f32, alpha: f32) -> [f32; 4] {
    let h = hue.rem_euclid(1.0) * 6.0;
    let s = saturation.clamp(0.0, 1.0);
    let v = brightness.clamp(0.0, 1.0);

    let sector = h.floor();
    let f = h - sector;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));

    let (r, g, b) = match sector as u32 {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };
    [r, g, b, alpha]
}
