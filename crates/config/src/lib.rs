//! Shared configuration for Bristle
//!
//! This crate provides the single source of truth for the canvas dimension,
//! the brush shape and the compositing parameters shared by the painting
//! core and the demo binary. Every section is serde-serializable and falls
//! back to its defaults for missing fields.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default canvas edge length in pixels (the canvas is square)
pub const DEFAULT_CANVAS_SIZE: u32 = 1024;

/// Default number of bristles (the set holds one more angle than this)
pub const DEFAULT_BRISTLE_COUNT: usize = 20;

/// Default seed for the bristle random source
pub const DEFAULT_SEED: u64 = 0x5eed;

/// Default jitter magnitude in radians (angles move by at most half of it)
pub const DEFAULT_JITTER_MAGNITUDE: f32 = 0.04;

/// Radius of a bristle offset at zero force
pub const DEFAULT_BASE_RADIUS: f32 = 10.0;

/// Radius added per unit of normalized force
pub const DEFAULT_FORCE_GAIN: f32 = 100.0;

/// Default stroke width used when rasterizing bristle paths
pub const DEFAULT_LINE_WIDTH: f32 = 3.0;

/// Default alpha of the diffuse stroke color
pub const DEFAULT_DIFFUSE_ALPHA: f32 = 0.25;

/// Default straight-alpha color painted into the height layer
pub const DEFAULT_NORMAL_COLOR: [f32; 4] = [1.0, 1.0, 1.0, 0.1];

/// Default smoothing radius applied to heights before normal derivation
pub const DEFAULT_NORMAL_SMOOTHNESS: f32 = 2.0;

/// Default gradient gain used for normal derivation
pub const DEFAULT_NORMAL_CONTRAST: f32 = 8.0;

/// Errors produced while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// How often the bristle angles are perturbed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JitterCadence {
    /// Once after each completed stroke
    PerStroke,
    /// Once per move event, however many coalesced samples it carries
    #[default]
    PerMoveEvent,
    /// Once per incoming move sample
    PerSample,
}

/// Whether a sample's azimuth angle rotates the bristle offsets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AzimuthCoupling {
    /// Offset angle is `bristle + sample.azimuth_angle`
    #[default]
    Coupled,
    /// Offset angle is the bristle angle alone
    Decoupled,
}

/// Canvas configuration. Fixed for the whole session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    /// Edge length of the square canvas in pixels
    pub size: u32,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_CANVAS_SIZE,
        }
    }
}

/// Brush shape and behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrushConfig {
    pub bristle_count: usize,
    pub seed: u64,
    pub jitter_magnitude: f32,
    pub jitter_cadence: JitterCadence,
    pub azimuth_coupling: AzimuthCoupling,
    pub base_radius: f32,
    pub force_gain: f32,
}

impl Default for BrushConfig {
    fn default() -> Self {
        Self {
            bristle_count: DEFAULT_BRISTLE_COUNT,
            seed: DEFAULT_SEED,
            jitter_magnitude: DEFAULT_JITTER_MAGNITUDE,
            jitter_cadence: JitterCadence::default(),
            azimuth_coupling: AzimuthCoupling::default(),
            base_radius: DEFAULT_BASE_RADIUS,
            force_gain: DEFAULT_FORCE_GAIN,
        }
    }
}

/// Parameters of the two compositing passes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositingConfig {
    pub line_width: f32,
    /// Alpha applied to the color source's hue for the diffuse layer
    pub diffuse_alpha: f32,
    /// Straight-alpha RGBA painted into the height layer
    pub normal_color: [f32; 4],
    /// Gaussian blur radius applied after blending, `None` to disable
    pub blur_radius: Option<f32>,
    pub normal_smoothness: f32,
    pub normal_contrast: f32,
}

impl Default for CompositingConfig {
    fn default() -> Self {
        Self {
            line_width: DEFAULT_LINE_WIDTH,
            diffuse_alpha: DEFAULT_DIFFUSE_ALPHA,
            normal_color: DEFAULT_NORMAL_COLOR,
            blur_radius: None,
            normal_smoothness: DEFAULT_NORMAL_SMOOTHNESS,
            normal_contrast: DEFAULT_NORMAL_CONTRAST,
        }
    }
}

/// Complete configuration for a painting session
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PaintConfig {
    pub canvas: CanvasConfig,
    pub brush: BrushConfig,
    pub compositing: CompositingConfig,
}

impl PaintConfig {
    /// Parse a configuration from JSON and validate it
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check that every value is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.canvas.size == 0 {
            return Err(invalid("canvas.size", "must be greater than zero"));
        }
        let brush = &self.brush;
        if !brush.jitter_magnitude.is_finite() || brush.jitter_magnitude < 0.0 {
            return Err(invalid("brush.jitter_magnitude", "must be finite and non-negative"));
        }
        if !brush.base_radius.is_finite() || !brush.force_gain.is_finite() {
            return Err(invalid("brush.base_radius", "radius terms must be finite"));
        }
        let compositing = &self.compositing;
        if !(compositing.line_width > 0.0) {
            return Err(invalid("compositing.line_width", "must be greater than zero"));
        }
        if !(0.0..=1.0).contains(&compositing.diffuse_alpha) {
            return Err(invalid("compositing.diffuse_alpha", "must be within [0, 1]"));
        }
        if compositing.normal_color.iter().any(|c| !(0.0..=1.0).contains(c)) {
            return Err(invalid("compositing.normal_color", "components must be within [0, 1]"));
        }
        if let Some(radius) = compositing.blur_radius {
            if !(radius >= 0.0) {
                return Err(invalid("compositing.blur_radius", "must be non-negative"));
            }
        }
        if !(compositing.normal_smoothness >= 0.0) {
            return Err(invalid("compositing.normal_smoothness", "must be non-negative"));
        }
        if !compositing.normal_contrast.is_finite() {
            return Err(invalid("compositing.normal_contrast", "must be finite"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}
