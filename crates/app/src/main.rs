//! Bristle - headless multi-bristle brush demo
//!
//! Feeds a handful of synthetic stylus strokes through a brush session and
//! applies the published textures on this thread, the way a display would.

use std::collections::BTreeSet;
use std::f32::consts::TAU;
use std::path::Path;

use bristle_painting::{
    BrushSession, CompositeError, HueColor, PaintSurface, PointerEvent, PointerKind, PreviewHandle,
    Sample, SurfaceTextures, apply_update,
};
use glam::Vec2;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;

use config::{DemoConfig, DemoConfigError};

/// Move events per synthetic stroke
const MOVES_PER_STROKE: usize = 12;

/// Coalesced samples carried by each move event
const SAMPLES_PER_MOVE: usize = 4;

#[derive(Debug, thiserror::Error)]
enum DemoError {
    #[error(transparent)]
    Config(#[from] DemoConfigError),
    #[error(transparent)]
    Composite(#[from] CompositeError),
    #[error("Failed to start runtime: {0}")]
    Runtime(std::io::Error),
    #[error("Failed to write output: {0}")]
    Output(#[from] image::ImageError),
    #[error("Failed to create output directory: {0}")]
    OutputDir(std::io::Error),
}

/// Stand-in for the lit display surface
#[derive(Default)]
struct HeadlessSurface {
    textures: Option<SurfaceTextures>,
    previews: BTreeSet<PreviewHandle>,
    updates: usize,
}

impl PaintSurface for HeadlessSurface {
    fn set_textures(&mut self, textures: &SurfaceTextures) {
        self.textures = Some(textures.clone());
        self.updates += 1;
    }

    fn remove_preview(&mut self, handle: PreviewHandle) {
        self.previews.remove(&handle);
    }
}

/// A looping stylus gesture around `center`
fn synthetic_stroke(center: Vec2, radius: f32, index: usize) -> (Vec2, Vec<Vec<Sample>>) {
    let phase = index as f32 * 0.7;
    let total = MOVES_PER_STROKE * SAMPLES_PER_MOVE;
    let samples: Vec<Sample> = (0..total)
        .map(|i| {
            let t = i as f32 / total as f32;
            let angle = phase + t * TAU * 0.8;
            let wobble = 1.0 + 0.25 * (t * TAU * 3.0).sin();
            let location = center + Vec2::new(angle.cos(), angle.sin()) * radius * wobble;
            let force = 0.05 + 0.15 * (t * TAU * 0.5).sin().abs();
            let azimuth = phase + t * 1.5;
            Sample::new(location, force, Vec2::from_angle(azimuth), azimuth)
        })
        .collect();

    let origin = samples.first().map_or(center, |s| s.location);
    let moves = samples.chunks(SAMPLES_PER_MOVE).map(<[Sample]>::to_vec).collect();
    (origin, moves)
}

fn write_outputs(dir: &Path, textures: &SurfaceTextures) -> Result<(), DemoError> {
    std::fs::create_dir_all(dir).map_err(DemoError::OutputDir)?;
    textures.diffuse.save(dir.join("diffuse.png"))?;
    textures.normal_map.save(dir.join("normal.png"))?;
    info!("Wrote textures to {}", dir.display());
    Ok(())
}

fn main() -> Result<(), DemoError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = DemoConfig::from_env()?;
    info!("Starting Bristle with a {}px canvas", config.paint.canvas.size);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(DemoError::Runtime)?;

    let (mut session, mut receiver) =
        BrushSession::from_config(&config.paint, runtime.handle().clone())?;
    let mut surface = HeadlessSurface::default();

    let size = config.paint.canvas.size as f32;
    let center = Vec2::splat(size / 2.0);
    let stroke_count = 6;
    let mut submitted = 0;
    let mut received = 0;

    for index in 0..stroke_count {
        let colors = HueColor {
            hue: index as f32 / stroke_count as f32,
            alpha: config.paint.compositing.diffuse_alpha,
        };
        let (origin, moves) = synthetic_stroke(center, size * (0.15 + 0.04 * index as f32), index);

        session.handle_event(PointerEvent::Begin { origin }, &colors);
        for samples in moves {
            session.handle_event(
                PointerEvent::Move {
                    kind: PointerKind::Stylus,
                    samples,
                },
                &colors,
            );
            if let Some((handle, _)) = session.current_preview() {
                surface.previews.insert(handle);
            }
            // Strokes finished earlier land while this one is still drawn
            received += receiver.pump(&mut surface);
        }
        if session.handle_event(PointerEvent::End, &colors).is_some() {
            submitted += 1;
        }
    }

    while received < submitted {
        let Some(update) = receiver.blocking_next() else {
            warn!("Surface channel closed with {} updates outstanding", submitted - received);
            break;
        };
        apply_update(&update, &mut surface);
        received += 1;
    }

    let stats = session.queue().stats();
    info!(
        "Painted {} strokes ({} dropped, {} texture updates) in {} drain cycles, {} previews left",
        stats.applied,
        stats.dropped,
        surface.updates,
        stats.drain_cycles,
        surface.previews.len()
    );

    if let (Some(dir), Some(textures)) = (&config.output_dir, &surface.textures) {
        write_outputs(dir, textures)?;
    }
    Ok(())
}
