//! Stroke compositing pipeline
//!
//! This module merges a bristle path into a layer:
//! 1. The path is rasterized into a transient transparent canvas
//! 2. The canvas is blended into a copy of the layer with the layer's operator
//! 3. A texture is derived from the copy (a normal map for the height layer),
//!    from a blurred duplicate when blur is configured
//! 4. The unblurred copy and the texture replace the layer's state
//!
//! Steps 1-3 never touch the layer, so a failure at any point leaves it in
//! its last committed state. Blur only shapes the published texture; the
//! layer itself always equals the plain sequence of blends.

use std::sync::Arc;

use bristle_config::{CompositingConfig, ConfigError, PaintConfig};
use image::RgbaImage;
use thiserror::Error;
use tracing::debug;

use crate::accumulator::{LayerAccumulator, LayerKind};
use crate::filters::{derive_normal_map, gaussian_blur};
use crate::geometry::Path;
use crate::present::SurfaceTextures;
use crate::queue::{PendingStroke, StrokeCompositor};
use crate::raster::{StrokeStyle, rasterize_path};
use crate::surface::{CpuSurface, SurfaceError};
use crate::types::Texture;

#[derive(Debug, Error)]
pub enum CompositeError {
    #[error("Compositing buffer unavailable: {0}")]
    Surface(#[from] SurfaceError),
    #[error("Layer sizes differ: diffuse {diffuse}, normal {normal}")]
    LayerSizeMismatch { diffuse: u32, normal: u32 },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Filter settings shared by both layers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositeSettings {
    /// Gaussian blur over the published texture, `None` to skip
    pub blur_radius: Option<f32>,
    pub normal_smoothness: f32,
    pub normal_contrast: f32,
}

impl Default for CompositeSettings {
    fn default() -> Self {
        Self::from(&CompositingConfig::default())
    }
}

impl From<&CompositingConfig> for CompositeSettings {
    fn from(config: &CompositingConfig) -> Self {
        Self {
            blur_radius: config.blur_radius,
            normal_smoothness: config.normal_smoothness,
            normal_contrast: config.normal_contrast,
        }
    }
}

/// A blend result waiting to replace a layer's state
#[derive(Debug)]
pub struct PreparedLayer {
    kind: LayerKind,
    surface: CpuSurface,
    texture: Texture,
}

impl PreparedLayer {
    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    pub fn surface(&self) -> &CpuSurface {
        &self.surface
    }

    pub fn texture(&self) -> Texture {
        Arc::clone(&self.texture)
    }
}

/// Renders paths into layers
#[derive(Debug, Clone, Default)]
pub struct CompositePipeline {
    settings: CompositeSettings,
}

impl CompositePipeline {
    pub fn new(settings: CompositeSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &CompositeSettings {
        &self.settings
    }

    /// Compute the layer state that painting `path` would produce
    ///
    /// Returns `Ok(None)` when the path covers no pixel.
    pub fn prepare(
        &self,
        path: &Path,
        style: &StrokeStyle,
        accumulator: &LayerAccumulator,
    ) -> Result<Option<PreparedLayer>, CompositeError> {
        let size = accumulator.size();
        let Some((stroke, rect)) = rasterize_path(path, style, size, size)? else {
            return Ok(None);
        };

        let mut blended = accumulator.surface().try_clone()?;
        blended.blend_region(&stroke, rect, accumulator.operator());

        let texture = match self.settings.blur_radius {
            Some(radius) => {
                let mut softened = blended.try_clone()?;
                gaussian_blur(&mut softened, radius)?;
                self.derive_texture(accumulator.kind(), &softened)?
            }
            None => self.derive_texture(accumulator.kind(), &blended)?,
        };

        debug!(
            "CompositePipeline::prepare: {:?} layer, region=({}, {}) {}x{}",
            accumulator.kind(),
            rect.x,
            rect.y,
            rect.width,
            rect.height
        );

        Ok(Some(PreparedLayer {
            kind: accumulator.kind(),
            surface: blended,
            texture: Arc::new(texture),
        }))
    }

    fn derive_texture(
        &self,
        kind: LayerKind,
        surface: &CpuSurface,
    ) -> Result<RgbaImage, SurfaceError> {
        match kind {
            LayerKind::Diffuse => surface.to_rgba8(),
            LayerKind::Normal => derive_normal_map(
                surface,
                self.settings.normal_smoothness,
                self.settings.normal_contrast,
            ),
        }
    }

    /// Replace the layer's state with a prepared result
    pub fn commit(&self, prepared: PreparedLayer, accumulator: &mut LayerAccumulator) -> Texture {
        debug_assert_eq!(prepared.kind, accumulator.kind());
        let texture = Arc::clone(&prepared.texture);
        accumulator.replace(prepared.surface, prepared.texture);
        texture
    }

    /// Paint `path` into one layer and return the layer's texture
    ///
    /// Degenerate paths leave the layer unchanged and return its prior
    /// texture.
    pub fn apply(
        &self,
        path: &Path,
        style: &StrokeStyle,
        accumulator: &mut LayerAccumulator,
    ) -> Result<Texture, CompositeError> {
        match self.prepare(path, style, accumulator)? {
            Some(prepared) => Ok(self.commit(prepared, accumulator)),
            None => {
                debug!("CompositePipeline::apply: nothing to paint, keeping prior texture");
                Ok(accumulator.texture())
            }
        }
    }
}

/// The diffuse and normal layers, composited together
///
/// Each stroke is prepared against both layers before either is committed,
/// so the layers always hold the same strokes.
#[derive(Debug)]
pub struct LayeredCompositor {
    pipeline: CompositePipeline,
    diffuse: LayerAccumulator,
    normal: LayerAccumulator,
    line_width: f32,
    /// Straight-alpha color painted into the height layer
    normal_color: [f32; 4],
}

impl LayeredCompositor {
    /// Create empty layers sized and styled from a validated configuration
    pub fn new(config: &PaintConfig) -> Result<Self, CompositeError> {
        config.validate()?;
        let size = config.canvas.size;
        Self::from_layers(
            CompositePipeline::new(CompositeSettings::from(&config.compositing)),
            LayerAccumulator::new(LayerKind::Diffuse, size)?,
            LayerAccumulator::new(LayerKind::Normal, size)?,
            config.compositing.line_width,
            config.compositing.normal_color,
        )
    }

    pub fn from_layers(
        pipeline: CompositePipeline,
        diffuse: LayerAccumulator,
        normal: LayerAccumulator,
        line_width: f32,
        normal_color: [f32; 4],
    ) -> Result<Self, CompositeError> {
        if diffuse.size() != normal.size() {
            return Err(CompositeError::LayerSizeMismatch {
                diffuse: diffuse.size(),
                normal: normal.size(),
            });
        }
        Ok(Self {
            pipeline,
            diffuse,
            normal,
            line_width,
            normal_color,
        })
    }

    pub fn diffuse(&self) -> &LayerAccumulator {
        &self.diffuse
    }

    pub fn normal(&self) -> &LayerAccumulator {
        &self.normal
    }

    /// Current textures of both layers
    pub fn textures(&self) -> SurfaceTextures {
        SurfaceTextures {
            diffuse: self.diffuse.texture(),
            normal_map: self.normal.texture(),
        }
    }

    /// Paint `path` with `color` into both layers
    pub fn composite_path(
        &mut self,
        path: &Path,
        color: [f32; 4],
    ) -> Result<SurfaceTextures, CompositeError> {
        self.composite_with(path, color, CompositePipeline::prepare)
    }

    fn composite_with<F>(
        &mut self,
        path: &Path,
        color: [f32; 4],
        mut prepare: F,
    ) -> Result<SurfaceTextures, CompositeError>
    where
        F: FnMut(
            &CompositePipeline,
            &Path,
            &StrokeStyle,
            &LayerAccumulator,
        ) -> Result<Option<PreparedLayer>, CompositeError>,
    {
        let diffuse_style = StrokeStyle {
            color,
            line_width: self.line_width,
        };
        let normal_style = StrokeStyle {
            color: self.normal_color,
            line_width: self.line_width,
        };

        let diffuse = prepare(&self.pipeline, path, &diffuse_style, &self.diffuse)?;
        let normal = prepare(&self.pipeline, path, &normal_style, &self.normal)?;

        match (diffuse, normal) {
            (Some(diffuse), Some(normal)) => {
                self.pipeline.commit(diffuse, &mut self.diffuse);
                self.pipeline.commit(normal, &mut self.normal);
            }
            // Both layers share the canvas size and line width, so coverage
            // is either present in both or in neither
            _ => debug!("LayeredCompositor: stroke covers no pixels, layers unchanged"),
        }

        Ok(self.textures())
    }
}

impl StrokeCompositor for LayeredCompositor {
    fn composite(&mut self, stroke: &PendingStroke) -> Result<SurfaceTextures, CompositeError> {
        self.composite_path(&stroke.path, stroke.color)
    }
}
