//! Bristle angles and their jitter
//!
//! A brush is a set of persistent bristle angles. The set is seeded once per
//! session and then perturbed by small random deltas, so the brush keeps a
//! recognisable shape that slowly drifts from stroke to stroke. All of the
//! brush's randomness lives here; path construction is deterministic.

use std::f32::consts::TAU;

use tracing::trace;

/// Source of uniform random numbers in `[0, 1)`
pub trait RandomSource: Send {
    fn next_f32(&mut self) -> f32;
}

/// Deterministic xorshift64* generator
#[derive(Debug, Clone)]
pub struct XorShiftRng {
    state: u64,
}

impl XorShiftRng {
    pub fn from_seed(seed: u64) -> Self {
        // The all-zero state is a fixed point of xorshift
        let state = if seed == 0 { 0x9e37_79b9_7f4a_7c15 } else { seed };
        Self { state }
    }

    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545_f491_4f6c_dd1d)
    }
}

impl RandomSource for XorShiftRng {
    #[inline]
    fn next_f32(&mut self) -> f32 {
        // Top 24 bits give every representable step of [0, 1)
        (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32
    }
}

/// Persistent bristle angles owned by a drawing session
#[derive(Debug, Clone)]
pub struct BristleSet<R = XorShiftRng> {
    angles: Vec<f32>,
    rng: R,
}

impl<R: RandomSource> BristleSet<R> {
    /// Create a set of `count + 1` angles uniform in `[0, 2π)`
    pub fn new(count: usize, rng: R) -> Self {
        let mut set = Self {
            angles: Vec::new(),
            rng,
        };
        set.initialize(count);
        set
    }

    /// Use explicit angles, keeping `rng` for later jitter
    pub fn from_angles(angles: Vec<f32>, rng: R) -> Self {
        Self { angles, rng }
    }

    /// Re-seed the set with `count + 1` uniform angles
    pub fn initialize(&mut self, count: usize) {
        self.angles.clear();
        self.angles.reserve(count + 1);
        for _ in 0..=count {
            let mut angle = self.rng.next_f32() * TAU;
            // Rounding can land exactly on TAU
            if angle >= TAU {
                angle -= TAU;
            }
            self.angles.push(angle);
        }
    }

    /// Move every angle by a uniform delta in `[-magnitude/2, magnitude/2)`
    pub fn jitter(&mut self, magnitude: f32) {
        let half = magnitude / 2.0;
        for angle in &mut self.angles {
            *angle = *angle - half + self.rng.next_f32() * magnitude;
        }
        trace!(
            "BristleSet::jitter: magnitude={:.3}, bristles={}",
            magnitude,
            self.angles.len()
        );
    }

    pub fn angles(&self) -> &[f32] {
        &self.angles
    }

    pub fn len(&self) -> usize {
        self.angles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.angles.is_empty()
    }
}
