//! Monotonic frame clock

use std::time::{Duration, Instant};

/// Measures time between frames and since start.
#[derive(Debug, Clone)]
pub struct FrameClock {
    start: Instant,
    last: Instant,
}

impl FrameClock {
    pub fn start() -> Self {
        let now = Instant::now();
        Self { start: now, last: now }
    }

    /// Seconds since the previous call (or since start on the first call)
    pub fn delta(&mut self) -> f32 {
        let now = Instant::now();
        let delta = now.duration_since(self.last);
        self.last = now;
        delta.as_secs_f32()
    }

    /// Time since the clock started
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::start()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_is_non_negative_and_resets() {
        let mut clock = FrameClock::start();
        std::thread::sleep(Duration::from_millis(5));
        let first = clock.delta();
        assert!(first >= 0.005);
        let second = clock.delta();
        assert!(second >= 0.0 && second < first);
        assert!(clock.elapsed() >= Duration::from_millis(5));
    }
}
