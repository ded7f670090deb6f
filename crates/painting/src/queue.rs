//! Ordered, single-writer stroke compositing
//!
//! Completed strokes are appended to an unbounded FIFO. The first submission
//! that finds the queue idle moves the compositor (and with it both layer
//! accumulators) into a blocking drain task; the task hands it back when the
//! queue runs dry. Because the compositor can only be in one place, at most
//! one stroke is ever being composited, and strokes are composited in the
//! order they were submitted.
//!
//! A stroke whose compositing fails or panics is dropped and the drain
//! carries on; the compositor keeps its last committed state either way.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use glam::Vec2;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tracing::{debug, error, warn};

use crate::composite::CompositeError;
use crate::geometry::Path;
use crate::present::{SurfacePublisher, SurfaceTextures, SurfaceUpdate};
use crate::types::PreviewHandle;

/// A completed stroke waiting to be composited
#[derive(Debug, Clone)]
pub struct PendingStroke {
    pub path: Path,
    pub origin: Vec2,
    /// Straight-alpha diffuse color captured at stroke end
    pub color: [f32; 4],
    /// Preview overlay shown while the stroke was drawn
    pub preview: Option<PreviewHandle>,
}

/// Merges one stroke into the layers it owns
pub trait StrokeCompositor: Send + 'static {
    fn composite(&mut self, stroke: &PendingStroke) -> Result<SurfaceTextures, CompositeError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    Idle,
    Draining,
}

/// Counters over the queue's lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub submitted: u64,
    pub applied: u64,
    /// Strokes whose compositing failed
    pub dropped: u64,
    /// Number of Idle -> Draining transitions
    pub drain_cycles: u64,
}

struct QueueInner<C> {
    pending: VecDeque<(u64, PendingStroke)>,
    state: QueueState,
    /// Parked here while idle, owned by the drain task otherwise
    compositor: Option<C>,
    next_sequence: u64,
    stats: QueueStats,
}

struct QueueShared<C> {
    inner: Mutex<QueueInner<C>>,
    idle: Notify,
}

/// FIFO of completed strokes drained by a single background task
pub struct PendingStrokeQueue<C> {
    shared: Arc<QueueShared<C>>,
    runtime: Handle,
    publisher: SurfacePublisher,
}

impl<C: StrokeCompositor> PendingStrokeQueue<C> {
    /// Create an idle queue; drain tasks run on `runtime`'s blocking pool
    pub fn new(compositor: C, runtime: Handle, publisher: SurfacePublisher) -> Self {
        Self {
            shared: Arc::new(QueueShared {
                inner: Mutex::new(QueueInner {
                    pending: VecDeque::new(),
                    state: QueueState::Idle,
                    compositor: Some(compositor),
                    next_sequence: 0,
                    stats: QueueStats::default(),
                }),
                idle: Notify::new(),
            }),
            runtime,
            publisher,
        }
    }

    /// Append a stroke and return its sequence number
    ///
    /// Never blocks on compositing. Starts a drain task if the queue was idle.
    pub fn submit(&self, stroke: PendingStroke) -> u64 {
        let mut inner = self.shared.inner.lock();
        let sequence = inner.next_sequence;
        inner.next_sequence += 1;
        inner.stats.submitted += 1;
        inner.pending.push_back((sequence, stroke));

        if inner.state == QueueState::Draining {
            return sequence;
        }

        let Some(compositor) = inner.compositor.take() else {
            warn!(
                "PendingStrokeQueue: idle without a compositor, stroke {} stays queued",
                sequence
            );
            return sequence;
        };
        inner.state = QueueState::Draining;
        inner.stats.drain_cycles += 1;
        drop(inner);

        debug!("PendingStrokeQueue: draining from stroke {}", sequence);
        let shared = Arc::clone(&self.shared);
        let publisher = self.publisher.clone();
        self.runtime.spawn_blocking(move || drain(&shared, compositor, &publisher));

        sequence
    }

    pub fn state(&self) -> QueueState {
        self.shared.inner.lock().state
    }

    pub fn stats(&self) -> QueueStats {
        self.shared.inner.lock().stats
    }

    /// Strokes submitted but not yet taken by the drain task
    pub fn pending_len(&self) -> usize {
        self.shared.inner.lock().pending.len()
    }

    /// Wait until every submitted stroke has been composited
    pub async fn idle(&self) {
        loop {
            let notified = self.shared.idle.notified();
            if self.state() == QueueState::Idle {
                return;
            }
            notified.await;
        }
    }

    /// Inspect the compositor while the queue is idle
    ///
    /// Returns None while draining, when the drain task owns it.
    pub fn with_compositor<R>(&self, f: impl FnOnce(&C) -> R) -> Option<R> {
        self.shared.inner.lock().compositor.as_ref().map(f)
    }
}

fn drain<C: StrokeCompositor>(
    shared: &QueueShared<C>,
    mut compositor: C,
    publisher: &SurfacePublisher,
) {
    loop {
        let (sequence, stroke) = {
            let mut inner = shared.inner.lock();
            match inner.pending.pop_front() {
                Some(job) => job,
                None => {
                    inner.compositor = Some(compositor);
                    inner.state = QueueState::Idle;
                    drop(inner);
                    debug!("PendingStrokeQueue: idle");
                    shared.idle.notify_waiters();
                    return;
                }
            }
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| compositor.composite(&stroke)));
        let textures = match outcome {
            Ok(Ok(textures)) => {
                shared.inner.lock().stats.applied += 1;
                Some(textures)
            }
            Ok(Err(err)) => {
                warn!("PendingStrokeQueue: dropping stroke {}: {}", sequence, err);
                shared.inner.lock().stats.dropped += 1;
                None
            }
            Err(_) => {
                error!(
                    "PendingStrokeQueue: compositor panicked on stroke {}, dropping it",
                    sequence
                );
                shared.inner.lock().stats.dropped += 1;
                None
            }
        };

        publisher.publish(SurfaceUpdate {
            sequence,
            textures,
            preview: stroke.preview,
        });
    }
}
