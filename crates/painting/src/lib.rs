//! Bristle painting system - stroke geometry and layer compositing
//!
//! This crate provides the painting engine behind the bristle brush:
//! - [`types`] - Pointer samples, blend modes and color helpers
//! - [`stroke`] - Stroke accumulation from pointer samples
//! - [`bristles`] - Bristle angle set with seeded jitter
//! - [`geometry`] - Multi-bristle path generation
//! - [`surface`] - CPU f32 premultiplied RGBA surface
//! - [`raster`] - Antialiased polyline rasterization
//! - [`filters`] - Gaussian blur and normal map derivation
//! - [`accumulator`] - Persistent diffuse and normal layers
//! - [`composite`] - Two-phase stroke compositing over both layers
//! - [`queue`] - FIFO single-writer pending stroke queue
//! - [`present`] - Texture hand-off to the display side
//! - [`session`] - Pointer event handling and live preview

pub mod accumulator;
pub mod bristles;
pub mod composite;
pub mod filters;
pub mod geometry;
pub mod present;
pub mod queue;
pub mod raster;
pub mod session;
pub mod stroke;
pub mod surface;
pub mod types;

pub use accumulator::*;
pub use bristles::*;
pub use composite::*;
pub use filters::*;
pub use geometry::*;
pub use present::*;
pub use queue::*;
pub use raster::*;
pub use session::*;
pub use stroke::*;
pub use surface::*;
pub use types::*;
