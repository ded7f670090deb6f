//! Bristle path construction
//!
//! Turns a stroke's samples and the current bristle angles into one polyline
//! per bristle. Each sample is displaced from its location by an offset whose
//! direction comes from the bristle angle (optionally rotated by the sample's
//! azimuth) and whose length grows with force. The x component is scaled by
//! the azimuth vector's y and the y component by its x, which is what splays
//! the bristles as the stylus tilts.

use bristle_config::{AzimuthCoupling, BrushConfig};
use glam::Vec2;

use crate::types::Sample;

/// Parameters of the offset formula
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryConfig {
    /// Offset radius at zero force
    pub base_radius: f32,
    /// Radius added per unit of force
    pub force_gain: f32,
    pub azimuth_coupling: AzimuthCoupling,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self::from(&BrushConfig::default())
    }
}

impl From<&BrushConfig> for GeometryConfig {
    fn from(brush: &BrushConfig) -> Self {
        Self {
            base_radius: brush.base_radius,
            force_gain: brush.force_gain,
            azimuth_coupling: brush.azimuth_coupling,
        }
    }
}

impl GeometryConfig {
    #[inline]
    pub fn radius(&self, force: f32) -> f32 {
        self.base_radius + force * self.force_gain
    }

    #[inline]
    fn offset_angle(&self, bristle_angle: f32, sample: &Sample) -> f32 {
        match self.azimuth_coupling {
            AzimuthCoupling::Coupled => bristle_angle + sample.azimuth_angle,
            AzimuthCoupling::Decoupled => bristle_angle,
        }
    }
}

/// One bristle's trail
#[derive(Debug, Clone, PartialEq)]
pub struct Polyline {
    vertices: Vec<Vec2>,
}

impl Polyline {
    pub fn new(vertices: Vec<Vec2>) -> Self {
        Self { vertices }
    }

    pub fn vertices(&self) -> &[Vec2] {
        &self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

/// A multi-polyline, one polyline per bristle
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Path {
    polylines: Vec<Polyline>,
}

impl Path {
    pub fn new(polylines: Vec<Polyline>) -> Self {
        Self { polylines }
    }

    pub fn polylines(&self) -> &[Polyline] {
        &self.polylines
    }

    pub fn is_empty(&self) -> bool {
        self.polylines.iter().all(Polyline::is_empty)
    }

    /// Total number of vertices over every polyline
    pub fn vertex_count(&self) -> usize {
        self.polylines.iter().map(Polyline::len).sum()
    }
}

/// Build the bristle path for a stroke
///
/// Returns `None` when there are no samples or no bristles. Produces exactly
/// `bristle_angles.len()` polylines of `samples.len() + 1` vertices: the
/// origin offset by the bristle direction at the first sample's force,
/// followed by one offset vertex per sample.
pub fn build_path(
    samples: &[Sample],
    origin: Vec2,
    bristle_angles: &[f32],
    config: &GeometryConfig,
) -> Option<Path> {
    let first = samples.first()?;
    if bristle_angles.is_empty() {
        return None;
    }

    let lead_radius = config.radius(first.force);
    let polylines = bristle_angles
        .iter()
        .map(|&bristle_angle| {
            let mut vertices = Vec::with_capacity(samples.len() + 1);
            let lead = Vec2::new(bristle_angle.sin(), bristle_angle.cos());
            vertices.push(origin + lead * lead_radius);

            for sample in samples {
                let angle = config.offset_angle(bristle_angle, sample);
                let radius = config.radius(sample.force);
                let offset = Vec2::new(
                    angle.sin() * radius * sample.azimuth_vector.y,
                    angle.cos() * radius * sample.azimuth_vector.x,
                );
                vertices.push(sample.location + offset);
            }

            Polyline::new(vertices)
        })
        .collect();

    Some(Path::new(polylines))
}
