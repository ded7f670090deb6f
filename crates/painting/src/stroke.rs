//! Stroke sample accumulation

use glam::Vec2;

use crate::types::Sample;

/// A stroke that is still receiving samples
///
/// Created empty when contact begins and appended to on every move. Samples
/// are kept in arrival order.
#[derive(Debug, Clone)]
pub struct ActiveStroke {
    origin: Vec2,
    samples: Vec<Sample>,
}

impl ActiveStroke {
    pub fn new(origin: Vec2) -> Self {
        Self {
            origin,
            samples: Vec::new(),
        }
    }

    pub fn push(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    pub fn extend(&mut self, samples: &[Sample]) {
        self.samples.extend_from_slice(samples);
    }

    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Freeze the stroke, capturing its color
    pub fn finish(self, color: [f32; 4]) -> Stroke {
        Stroke {
            origin: self.origin,
            samples: self.samples,
            color,
        }
    }
}

/// A completed, immutable stroke
#[derive(Debug, Clone)]
pub struct Stroke {
    origin: Vec2,
    samples: Vec<Sample>,
    color: [f32; 4],
}

impl Stroke {
    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Straight-alpha RGBA captured when the stroke ended
    pub fn color(&self) -> [f32; 4] {
        self.color
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(x: f32) -> Sample {
        Sample::new(Vec2::new(x, 0.0), 0.5, Vec2::X, 0.0)
    }

    #[test]
    fn test_samples_keep_arrival_order() {
        let mut active = ActiveStroke::new(Vec2::new(1.0, 2.0));
        assert!(active.is_empty());

        active.push(sample(0.0));
        active.extend(&[sample(1.0), sample(2.0)]);

        let xs: Vec<f32> = active.samples().iter().map(|s| s.location.x).collect();
        assert_eq!(xs, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_finish_captures_color_and_origin() {
        let mut active = ActiveStroke::new(Vec2::new(5.0, 6.0));
        active.push(sample(3.0));

        let stroke = active.finish([1.0, 0.0, 0.0, 0.25]);
        assert_eq!(stroke.origin(), Vec2::new(5.0, 6.0));
        assert_eq!(stroke.color(), [1.0, 0.0, 0.0, 0.25]);
        assert_eq!(stroke.len(), 1);
    }
}
