//! Synthetic face tracker.
//!
//! Produces a slowly wandering head and periodic mouth/blink activity so the
//! tracking path can be exercised without a camera.

use std::f32::consts::TAU;
use std::time::{Duration, Instant};

use super::{InitStatus, TrackingSample, TrackingSource};

/// Length of the expression vector, matching the UDP tracker's layout
pub const EXPRESSION_COUNT: usize = 11;

const BLINK_PERIOD: f32 = 4.0;
const BLINK_LENGTH: f32 = 0.15;

pub struct SyntheticTracker {
    warmup: Duration,
    started: Option<Instant>,
}

impl SyntheticTracker {
    /// `warmup` delays readiness, imitating a model that takes time to load.
    pub fn new(warmup: Duration) -> Self {
        Self {
            warmup,
            started: None,
        }
    }

    /// Deterministic sample at `t` seconds since readiness.
    ///
    /// Indices follow the default expression layout: 6 = A, 7 = U,
    /// 8 = left blink, 9 = right blink, 10 = I.
    pub fn sample_at(t: f32) -> TrackingSample {
        let rotation = [
            0.25 * (0.9 * t).sin(),
            0.4 * (0.6 * t).sin(),
            0.15 * (1.1 * t).sin(),
        ];

        let mut expressions = vec![0.0f32; EXPRESSION_COUNT];
        let talk = (0.5 + 0.5 * (TAU * 0.8 * t).sin()) * 0.6;
        expressions[6] = talk;
        expressions[7] = 0.3 * (1.0 - talk);
        expressions[10] = 0.2 * (TAU * 0.3 * t).cos().abs();

        let blink = if t.rem_euclid(BLINK_PERIOD) < BLINK_LENGTH { 1.0 } else { 0.0 };
        expressions[8] = blink;
        expressions[9] = blink;

        TrackingSample::new(rotation, expressions)
    }
}

impl TrackingSource for SyntheticTracker {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn poll_init(&mut self) -> InitStatus {
        let started = *self.started.get_or_insert_with(Instant::now);
        if started.elapsed() >= self.warmup {
            InitStatus::Ready
        } else {
            InitStatus::Pending
        }
    }

    fn poll_sample(&mut self) -> Option<TrackingSample> {
        let t = self.started?.elapsed().saturating_sub(self.warmup).as_secs_f32();
        Some(Self::sample_at(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ready_without_warmup() {
        let mut tracker = SyntheticTracker::new(Duration::ZERO);
        assert_eq!(tracker.poll_init(), InitStatus::Ready);
        assert!(tracker.poll_sample().is_some());
    }

    #[test]
    fn test_pending_during_warmup() {
        let mut tracker = SyntheticTracker::new(Duration::from_secs(3600));
        assert_eq!(tracker.poll_init(), InitStatus::Pending);
    }

    #[test]
    fn test_no_sample_before_init() {
        let mut tracker = SyntheticTracker::new(Duration::ZERO);
        assert!(tracker.poll_sample().is_none());
    }

    #[test]
    fn test_sample_layout_and_ranges() {
        for i in 0..200 {
            let s = SyntheticTracker::sample_at(i as f32 * 0.05);
            assert!(s.is_valid());
            assert_eq!(s.expressions.len(), EXPRESSION_COUNT);
            assert!(s.expressions.iter().all(|v| (0.0..=1.0).contains(v)));
            assert!(s.rotation.iter().all(|v| v.abs() <= 0.4));
        }
    }

    #[test]
    fn test_blinks_periodically() {
        assert_eq!(SyntheticTracker::sample_at(0.05).expressions[8], 1.0);
        assert_eq!(SyntheticTracker::sample_at(1.0).expressions[8], 0.0);
        assert_eq!(SyntheticTracker::sample_at(4.1).expressions[9], 1.0);
    }
}
