//! Periodic log summaries of composed frames

use super::{FrameSink, FrameSnapshot, Viewport};
use crate::avatar::{BlendShapePreset, HumanoidBone};
use crate::error::CompositorError;

/// Logs a one-line summary every `every` frames
pub struct LogSink {
    every: u64,
    presented: u64,
}

impl LogSink {
    pub fn new(every: u64) -> Self {
        Self {
            every: every.max(1),
            presented: 0,
        }
    }

    /// Frames seen so far
    pub fn presented(&self) -> u64 {
        self.presented
    }

    fn should_log(&self, frame: &FrameSnapshot) -> bool {
        frame.frame % self.every == 0
    }
}

impl FrameSink for LogSink {
    fn present(&mut self, frame: &FrameSnapshot) -> Result<(), CompositorError> {
        self.presented += 1;
        if !self.should_log(frame) {
            return Ok(());
        }

        let head = frame.bones.get(&HumanoidBone::Head).copied().unwrap_or_default();
        let arm = frame
            .bones
            .get(&HumanoidBone::LeftUpperArm)
            .copied()
            .unwrap_or_default();
        let shape = |p: BlendShapePreset| frame.blend_shapes.get(&p).copied().unwrap_or(0.0);

        tracing::info!(
            "frame {} t={:.2}s head=({:.2}, {:.2}, {:.2}) l_upper_arm=({:.2}, {:.2}, {:.2}) \
             blink={:.2} blink_l={:.2} blink_r={:.2} a={:.2} mode={:?}",
            frame.frame,
            frame.elapsed,
            head[0],
            head[1],
            head[2],
            arm[0],
            arm[1],
            arm[2],
            shape(BlendShapePreset::Blink),
            shape(BlendShapePreset::BlinkL),
            shape(BlendShapePreset::BlinkR),
            shape(BlendShapePreset::A),
            frame.blink_mode,
        );
        Ok(())
    }

    fn resize(&mut self, viewport: Viewport) {
        tracing::info!(
            "Viewport {}x{} (aspect {:.3})",
            viewport.width,
            viewport.height,
            viewport.aspect()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::tests::snapshot;

    #[test]
    fn test_counts_frames_and_never_fails() {
        let mut sink = LogSink::new(0);
        sink.resize(Viewport::new(640, 480));
        for i in 0..5 {
            sink.present(&snapshot(i)).unwrap();
        }
        assert_eq!(sink.presented(), 5);
    }

    #[test]
    fn test_log_interval() {
        let sink = LogSink::new(60);
        assert!(sink.should_log(&snapshot(0)));
        assert!(!sink.should_log(&snapshot(59)));
        assert!(sink.should_log(&snapshot(120)));
    }
}
