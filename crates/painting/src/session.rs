//! Interactive brush session
//!
//! Runs on the thread that receives pointer events. It accumulates samples
//! into the active stroke, jitters the bristles at the configured cadence,
//! keeps a live preview path, and on contact end hands the finished path to
//! the pending-stroke queue. It never touches the layer accumulators.

use bristle_config::{BrushConfig, JitterCadence, PaintConfig};
use glam::Vec2;
use tokio::runtime::Handle;
use tracing::{debug, info};

use crate::bristles::{BristleSet, RandomSource, XorShiftRng};
use crate::composite::{CompositeError, LayeredCompositor};
use crate::geometry::{GeometryConfig, Path, build_path};
use crate::present::{SurfaceReceiver, surface_channel};
use crate::queue::{PendingStroke, PendingStrokeQueue, StrokeCompositor};
use crate::stroke::ActiveStroke;
use crate::types::{PointerKind, PreviewHandle, Sample, hsb_to_rgba};

/// Pointer input delivered by the host platform
#[derive(Debug, Clone, PartialEq)]
pub enum PointerEvent {
    /// Contact begins at `origin`
    Begin { origin: Vec2 },
    /// One move event with its coalesced samples, oldest first
    Move { kind: PointerKind, samples: Vec<Sample> },
    /// Contact ends
    End,
}

/// Supplies the stroke color at the moment a stroke ends
pub trait ColorSource {
    /// Straight-alpha RGBA
    fn stroke_color(&self) -> [f32; 4];
}

impl ColorSource for [f32; 4] {
    fn stroke_color(&self) -> [f32; 4] {
        *self
    }
}

/// Fully saturated, full brightness hue at a fixed alpha
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HueColor {
    /// 0.0 to 1.0 around the color wheel
    pub hue: f32,
    pub alpha: f32,
}

impl ColorSource for HueColor {
    fn stroke_color(&self) -> [f32; 4] {
        hsb_to_rgba(self.hue, 1.0, 1.0, self.alpha)
    }
}

/// Preview of the stroke in progress; never composited
#[derive(Debug)]
struct Preview {
    handle: PreviewHandle,
    path: Option<Path>,
}

/// Turns pointer events into queued bristle strokes
pub struct BrushSession<C, R = XorShiftRng> {
    jitter_magnitude: f32,
    jitter_cadence: JitterCadence,
    geometry: GeometryConfig,
    bristles: BristleSet<R>,
    active: Option<ActiveStroke>,
    preview: Option<Preview>,
    next_preview: u64,
    queue: PendingStrokeQueue<C>,
}

impl BrushSession<LayeredCompositor, XorShiftRng> {
    /// Build a session, its layers and the receiving end of its textures
    pub fn from_config(
        config: &PaintConfig,
        runtime: Handle,
    ) -> Result<(Self, SurfaceReceiver), CompositeError> {
        let compositor = LayeredCompositor::new(config)?;
        let (publisher, receiver) = surface_channel();
        let queue = PendingStrokeQueue::new(compositor, runtime, publisher);
        let bristles = BristleSet::new(
            config.brush.bristle_count,
            XorShiftRng::from_seed(config.brush.seed),
        );
        info!(
            "BrushSession: {}px canvas, {} bristles, {:?} jitter",
            config.canvas.size,
            bristles.len(),
            config.brush.jitter_cadence
        );
        Ok((Self::new(&config.brush, bristles, queue), receiver))
    }
}

impl<C: StrokeCompositor, R: RandomSource> BrushSession<C, R> {
    pub fn new(
        brush: &BrushConfig,
        bristles: BristleSet<R>,
        queue: PendingStrokeQueue<C>,
    ) -> Self {
        Self {
            jitter_magnitude: brush.jitter_magnitude,
            jitter_cadence: brush.jitter_cadence,
            geometry: GeometryConfig::from(brush),
            bristles,
            active: None,
            preview: None,
            next_preview: 0,
            queue,
        }
    }

    /// Dispatch one pointer event
    ///
    /// Returns the queue sequence number when the event completed a stroke.
    pub fn handle_event(&mut self, event: PointerEvent, colors: &dyn ColorSource) -> Option<u64> {
        match event {
            PointerEvent::Begin { origin } => {
                self.begin_stroke(origin);
                None
            }
            PointerEvent::Move { kind, samples } => {
                self.stroke_to(kind, &samples);
                None
            }
            PointerEvent::End => self.end_stroke(colors),
        }
    }

    /// Start a new stroke at `origin`, discarding any unfinished one
    pub fn begin_stroke(&mut self, origin: Vec2) {
        if self.active.is_some() {
            debug!("begin_stroke: replacing unfinished stroke");
        }
        self.active = Some(ActiveStroke::new(origin));
        let handle = PreviewHandle(self.next_preview);
        self.next_preview += 1;
        self.preview = Some(Preview { handle, path: None });
    }

    /// Append the samples of one move event
    ///
    /// Only stylus input builds strokes; other pointers are ignored.
    pub fn stroke_to(&mut self, kind: PointerKind, samples: &[Sample]) {
        if kind != PointerKind::Stylus {
            debug!("stroke_to: ignoring {:?} input", kind);
            return;
        }
        let Some(active) = self.active.as_mut() else {
            debug!("stroke_to: no active stroke, ignoring");
            return;
        };
        if samples.is_empty() {
            return;
        }

        match self.jitter_cadence {
            JitterCadence::PerSample => {
                for sample in samples {
                    active.push(*sample);
                    self.bristles.jitter(self.jitter_magnitude);
                }
            }
            JitterCadence::PerMoveEvent => {
                active.extend(samples);
                self.bristles.jitter(self.jitter_magnitude);
            }
            JitterCadence::PerStroke => active.extend(samples),
        }

        let angles = self.bristles.angles();
        let path = build_path(active.samples(), active.origin(), angles, &self.geometry);
        if let Some(preview) = self.preview.as_mut() {
            preview.path = path;
        }
    }

    /// Finish the active stroke and queue it for compositing
    ///
    /// The color is read from `colors` now. Returns the queue sequence
    /// number, or None if there was nothing to paint.
    pub fn end_stroke(&mut self, colors: &dyn ColorSource) -> Option<u64> {
        let active = self.active.take()?;
        let preview = self.preview.take();

        let stroke = active.finish(colors.stroke_color());
        let path = build_path(
            stroke.samples(),
            stroke.origin(),
            self.bristles.angles(),
            &self.geometry,
        );
        let Some(path) = path else {
            debug!("end_stroke: stroke has no samples, nothing to queue");
            return None;
        };

        // Only completed strokes move the bristles
        if self.jitter_cadence == JitterCadence::PerStroke {
            self.bristles.jitter(self.jitter_magnitude);
        }

        debug!(
            "end_stroke: {} samples, {} bristles, {} vertices",
            stroke.len(),
            path.polylines().len(),
            path.vertex_count()
        );

        let sequence = self.queue.submit(PendingStroke {
            path,
            origin: stroke.origin(),
            color: stroke.color(),
            preview: preview.filter(|p| p.path.is_some()).map(|p| p.handle),
        });
        Some(sequence)
    }

    /// Check if a stroke is currently in progress
    pub fn is_stroking(&self) -> bool {
        self.active.is_some()
    }

    /// Live preview of the stroke in progress
    pub fn current_preview(&self) -> Option<(PreviewHandle, &Path)> {
        let preview = self.preview.as_ref()?;
        preview.path.as_ref().map(|path| (preview.handle, path))
    }

    pub fn bristles(&self) -> &BristleSet<R> {
        &self.bristles
    }

    pub fn queue(&self) -> &PendingStrokeQueue<C> {
        &self.queue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::present::SurfaceTextures;
    use crate::surface::solid_image;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Records every stroke it is given
    struct RecordingCompositor {
        strokes: Arc<Mutex<Vec<PendingStroke>>>,
        textures: SurfaceTextures,
    }

    impl StrokeCompositor for RecordingCompositor {
        fn composite(
            &mut self,
            stroke: &PendingStroke,
        ) -> Result<SurfaceTextures, CompositeError> {
            self.strokes.lock().push(stroke.clone());
            Ok(self.textures.clone())
        }
    }

    type Recorded = Arc<Mutex<Vec<PendingStroke>>>;

    fn make_session(
        cadence: JitterCadence,
        angles: Vec<f32>,
    ) -> (BrushSession<RecordingCompositor>, SurfaceReceiver, Recorded) {
        let strokes = Arc::new(Mutex::new(Vec::new()));
        let compositor = RecordingCompositor {
            strokes: Arc::clone(&strokes),
            textures: SurfaceTextures {
                diffuse: Arc::new(solid_image(1, [0, 0, 0, 0])),
                normal_map: Arc::new(solid_image(1, [128, 128, 255, 255])),
            },
        };
        let (publisher, receiver) = surface_channel();
        let queue = PendingStrokeQueue::new(compositor, Handle::current(), publisher);
        let brush = BrushConfig {
            jitter_cadence: cadence,
            ..BrushConfig::default()
        };
        let bristles = BristleSet::from_angles(angles, XorShiftRng::from_seed(3));
        (BrushSession::new(&brush, bristles, queue), receiver, strokes)
    }

    fn stylus(x: f32, y: f32) -> Sample {
        Sample::new(Vec2::new(x, y), 0.0, Vec2::new(1.0, 0.0), 0.0)
    }

    fn move_event(samples: Vec<Sample>) -> PointerEvent {
        PointerEvent::Move {
            kind: PointerKind::Stylus,
            samples,
        }
    }

    const RED: [f32; 4] = [1.0, 0.0, 0.0, 0.25];

    #[tokio::test(flavor = "multi_thread")]
    async fn test_stroke_reaches_queue_with_color_and_preview() {
        let (mut session, mut receiver, strokes) = 
            make_session(JitterCadence::PerStroke, vec![0.0]);

        session.handle_event(PointerEvent::Begin { origin: Vec2::ZERO }, &RED);
        assert!(session.is_stroking());
        assert!(session.current_preview().is_none());

        session.handle_event(move_event(vec![stylus(0.0, 0.0), stylus(10.0, 0.0)]), &RED);
        let (handle, preview) = session.current_preview().unwrap();
        assert_eq!(preview.polylines()[0].len(), 3);

        let sequence = session.handle_event(PointerEvent::End, &RED);
        assert_eq!(sequence, Some(0));
        assert!(!session.is_stroking());
        assert!(session.current_preview().is_none());

        let update = receiver.next().await.unwrap();
        assert_eq!(update.preview, Some(handle));
        session.queue().idle().await;

        let strokes = strokes.lock();
        assert_eq!(strokes.len(), 1);
        assert_eq!(strokes[0].color, RED);
        let vertices = strokes[0].path.polylines()[0].vertices();
        assert!((vertices[0] - Vec2::new(0.0, 10.0)).length() < 1e-4);
        assert!((vertices[1] - Vec2::new(0.0, 10.0)).length() < 1e-4);
        assert!((vertices[2] - Vec2::new(10.0, 10.0)).length() < 1e-4);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_color_captured_at_stroke_end() {
        let (mut session, mut receiver, strokes) = 
            make_session(JitterCadence::PerStroke, vec![0.0]);

        let mut hue = HueColor { hue: 0.0, alpha: 0.25 };
        session.begin_stroke(Vec2::ZERO);
        session.stroke_to(PointerKind::Stylus, &[stylus(5.0, 5.0)]);
        hue.hue = 2.0 / 3.0;
        session.end_stroke(&hue);

        receiver.next().await.unwrap();
        let color = strokes.lock()[0].color;
        assert!(color[2] > 0.99 && color[0] < 0.01);
        assert_eq!(color[3], 0.25);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_non_stylus_moves_ignored() {
        let (mut session, _receiver, _strokes) = 
            make_session(JitterCadence::PerMoveEvent, vec![1.0, 2.0]);
        let before = session.bristles().angles().to_vec();

        session.begin_stroke(Vec2::ZERO);
        session.stroke_to(PointerKind::Touch, &[stylus(1.0, 1.0)]);
        session.stroke_to(PointerKind::Mouse, &[stylus(2.0, 2.0)]);

        assert!(session.current_preview().is_none());
        assert_eq!(session.bristles().angles(), before.as_slice());
        assert_eq!(session.end_stroke(&RED), None);
        assert_eq!(session.queue().stats().submitted, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_events_without_begin_are_ignored() {
        let (mut session, _receiver, _strokes) = 
            make_session(JitterCadence::PerMoveEvent, vec![1.0]);
        session.stroke_to(PointerKind::Stylus, &[stylus(1.0, 1.0)]);
        assert_eq!(session.end_stroke(&RED), None);
        assert!(!session.is_stroking());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_jitter_cadences() {
        let samples = vec![stylus(1.0, 1.0), stylus(2.0, 2.0), stylus(3.0, 3.0)];

        // Per stroke: untouched while drawing, moved once on end
        let (mut session, mut receiver, _) = make_session(JitterCadence::PerStroke, vec![1.0]);
        session.begin_stroke(Vec2::ZERO);
        session.stroke_to(PointerKind::Stylus, &samples);
        assert_eq!(session.bristles().angles(), &[1.0]);
        session.end_stroke(&RED);
        assert_ne!(session.bristles().angles(), &[1.0]);
        receiver.next().await.unwrap();

        // Per move event and per sample draw the same number of values as
        // a reference generator would
        let cadences = [(JitterCadence::PerMoveEvent, 1), (JitterCadence::PerSample, 3)];
        for (cadence, draws) in cadences {
            let (mut session, _receiver, _) = make_session(cadence, vec![1.0]);
            session.begin_stroke(Vec2::ZERO);
            session.stroke_to(PointerKind::Stylus, &samples);

            let mut reference = BristleSet::from_angles(vec![1.0], XorShiftRng::from_seed(3));
            for _ in 0..draws {
                reference.jitter(BrushConfig::default().jitter_magnitude);
            }
            assert_eq!(session.bristles().angles(), reference.angles());
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_per_stroke_jitter_skips_strokes_without_samples() {
        let (mut session, _receiver, _strokes) =
            make_session(JitterCadence::PerStroke, vec![1.0]);

        // Touch contact is ignored entirely
        session.handle_event(PointerEvent::Begin { origin: Vec2::ZERO }, &RED);
        session.handle_event(
            PointerEvent::Move {
                kind: PointerKind::Touch,
                samples: vec![stylus(4.0, 4.0)],
            },
            &RED,
        );
        assert_eq!(session.handle_event(PointerEvent::End, &RED), None);
        assert_eq!(session.bristles().angles(), &[1.0]);

        // So is a tap with no move events
        session.begin_stroke(Vec2::new(8.0, 8.0));
        assert_eq!(session.end_stroke(&RED), None);
        assert_eq!(session.bristles().angles(), &[1.0]);
        assert_eq!(session.queue().stats().submitted, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_strokes_queue_in_completion_order() {
        let (mut session, mut receiver, strokes) = 
            make_session(JitterCadence::PerMoveEvent, vec![0.0, 3.0]);

        for i in 0..4 {
            let x = i as f32 * 10.0;
            session.begin_stroke(Vec2::new(x, 0.0));
            session.stroke_to(PointerKind::Stylus, &[stylus(x, 5.0)]);
            assert_eq!(session.end_stroke(&RED), Some(i));
        }
        for expected in 0..4 {
            assert_eq!(receiver.next().await.unwrap().sequence, expected);
        }
        session.queue().idle().await;

        let origins: Vec<f32> = strokes.lock().iter().map(|s| s.origin.x).collect();
        assert_eq!(origins, vec![0.0, 10.0, 20.0, 30.0]);
    }
}
