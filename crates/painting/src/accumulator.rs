//! Persistent paint layers

use std::sync::Arc;

use crate::surface::{CpuSurface, SurfaceError, solid_image};
use crate::types::{BlendMode, Texture};

/// Encoded normal of a flat surface
pub const FLAT_NORMAL: [u8; 4] = [128, 128, 255, 255];

/// Which of the two coupled layers an accumulator holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    /// Color, merged with source-over
    Diffuse,
    /// Heights, merged additively and published as a normal map
    Normal,
}

impl LayerKind {
    pub fn blend_mode(self) -> BlendMode {
        match self {
            LayerKind::Diffuse => BlendMode::SourceOver,
            LayerKind::Normal => BlendMode::Additive,
        }
    }
}

/// All paint applied so far to one layer
///
/// Holds the blended raster and the texture last derived from it. New
/// strokes are merged with the layer kind's operator. Only the compositing
/// pipeline replaces the raster, and always as a whole.
#[derive(Debug)]
pub struct LayerAccumulator {
    kind: LayerKind,
    surface: CpuSurface,
    texture: Texture,
    strokes_applied: u64,
}

impl LayerAccumulator {
    /// Create an empty square layer of `size` pixels
    pub fn new(kind: LayerKind, size: u32) -> Result<Self, SurfaceError> {
        let surface = CpuSurface::try_new(size, size)?;
        let texture = match kind {
            LayerKind::Diffuse => surface.to_rgba8()?,
            LayerKind::Normal => solid_image(size, FLAT_NORMAL),
        };
        Ok(Self {
            kind,
            surface,
            texture: Arc::new(texture),
            strokes_applied: 0,
        })
    }

    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    pub fn operator(&self) -> BlendMode {
        self.kind.blend_mode()
    }

    /// Edge length of the square layer
    pub fn size(&self) -> u32 {
        self.surface.width
    }

    pub fn surface(&self) -> &CpuSurface {
        &self.surface
    }

    /// Texture derived after the last committed stroke
    pub fn texture(&self) -> Texture {
        Arc::clone(&self.texture)
    }

    /// Number of strokes merged into this layer
    pub fn strokes_applied(&self) -> u64 {
        self.strokes_applied
    }

    /// Replace the raster and its derived texture with a blend result
    pub(crate) fn replace(&mut self, surface: CpuSurface, texture: Texture) {
        debug_assert_eq!(surface.width, self.surface.width);
        self.surface = surface;
        self.texture = texture;
        self.strokes_applied += 1;
    }
}
