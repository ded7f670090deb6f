//! Hand-off of composited textures to the interactive side
//!
//! The compositing worker publishes one [`SurfaceUpdate`] per stroke over an
//! unbounded channel. The thread that owns the [`PaintSurface`] drains the
//! channel and applies the updates in arrival order, which is submission
//! order.

use tokio::sync::mpsc;
use tracing::debug;

use crate::types::{PreviewHandle, Texture};

/// The two textures that drive the lit surface
#[derive(Debug, Clone)]
pub struct SurfaceTextures {
    pub diffuse: Texture,
    pub normal_map: Texture,
}

/// Result of compositing one stroke
#[derive(Debug, Clone)]
pub struct SurfaceUpdate {
    /// Sequence number assigned when the stroke was submitted
    pub sequence: u64,
    /// New textures, or None if the stroke was dropped
    pub textures: Option<SurfaceTextures>,
    /// Preview overlay to remove now that the stroke is composited
    pub preview: Option<PreviewHandle>,
}

/// Consumer of composited textures (rendering, lighting, display)
pub trait PaintSurface {
    fn set_textures(&mut self, textures: &SurfaceTextures);

    fn remove_preview(&mut self, _handle: PreviewHandle) {}
}

/// Create a connected publisher/receiver pair
pub fn surface_channel() -> (SurfacePublisher, SurfaceReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (SurfacePublisher { tx }, SurfaceReceiver { rx })
}

/// Worker-side end of the hand-off
#[derive(Debug, Clone)]
pub struct SurfacePublisher {
    tx: mpsc::UnboundedSender<SurfaceUpdate>,
}

impl SurfacePublisher {
    /// Queue an update without blocking
    ///
    /// Returns false if the receiving side has gone away.
    pub fn publish(&self, update: SurfaceUpdate) -> bool {
        match self.tx.send(update) {
            Ok(()) => true,
            Err(err) => {
                debug!("SurfacePublisher: receiver dropped, discarding update {}", err.0.sequence);
                false
            }
        }
    }
}

/// Interactive-side end of the hand-off
#[derive(Debug)]
pub struct SurfaceReceiver {
    rx: mpsc::UnboundedReceiver<SurfaceUpdate>,
}

impl SurfaceReceiver {
    /// Apply every update that has arrived so far, returning how many
    pub fn pump(&mut self, surface: &mut dyn PaintSurface) -> usize {
        let mut applied = 0;
        while let Ok(update) = self.rx.try_recv() {
            apply_update(&update, surface);
            applied += 1;
        }
        applied
    }

    /// Take the next update if one is ready
    pub fn try_next(&mut self) -> Option<SurfaceUpdate> {
        self.rx.try_recv().ok()
    }

    /// Wait for the next update from outside an async context
    pub fn blocking_next(&mut self) -> Option<SurfaceUpdate> {
        self.rx.blocking_recv()
    }

    /// Wait for the next update
    pub async fn next(&mut self) -> Option<SurfaceUpdate> {
        self.rx.recv().await
    }
}

/// Apply one update to a surface
pub fn apply_update(update: &SurfaceUpdate, surface: &mut dyn PaintSurface) {
    if let Some(textures) = &update.textures {
        surface.set_textures(textures);
    }
    if let Some(handle) = update.preview {
        surface.remove_preview(handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::solid_image;
    use std::sync::Arc;

    #[derive(Default)]
    struct RecordingSurface {
        textures_set: usize,
        removed: Vec<PreviewHandle>,
    }

    impl PaintSurface for RecordingSurface {
        fn set_textures(&mut self, _textures: &SurfaceTextures) {
            self.textures_set += 1;
        }

        fn remove_preview(&mut self, handle: PreviewHandle) {
            self.removed.push(handle);
        }
    }

    fn textures() -> SurfaceTextures {
        SurfaceTextures {
            diffuse: Arc::new(solid_image(2, [0, 0, 0, 0])),
            normal_map: Arc::new(solid_image(2, [128, 128, 255, 255])),
        }
    }

    #[test]
    fn test_pump_applies_in_order() {
        let (publisher, mut receiver) = surface_channel();
        publisher.publish(SurfaceUpdate {
            sequence: 0,
            textures: Some(textures()),
            preview: Some(PreviewHandle(4)),
        });
        publisher.publish(SurfaceUpdate {
            sequence: 1,
            textures: None,
            preview: Some(PreviewHandle(5)),
        });

        let mut surface = RecordingSurface::default();
        assert_eq!(receiver.pump(&mut surface), 2);
        assert_eq!(surface.textures_set, 1);
        assert_eq!(surface.removed, vec![PreviewHandle(4), PreviewHandle(5)]);

        assert_eq!(receiver.pump(&mut surface), 0);
    }

    #[test]
    fn test_publish_after_receiver_dropped() {
        let (publisher, receiver) = surface_channel();
        drop(receiver);
        assert!(!publisher.publish(SurfaceUpdate {
            sequence: 0,
            textures: None,
            preview: None,
        }));
    }
}
