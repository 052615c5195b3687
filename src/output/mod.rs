//! Output module
//!
//! Frame sinks stand in for the renderer: each frame the host hands them a
//! snapshot of the composed avatar state.
//! - JSON lines on a writer (stdout by default)
//! - Periodic summary log lines

pub mod json;
pub mod log;

use serde::Serialize;
use std::collections::BTreeMap;

use crate::avatar::{BlendShapePreset, HumanoidBone};
use crate::compositor::BlinkMode;
use crate::error::CompositorError;
use crate::tracking::TrackingState;

pub use json::JsonLinesSink;
pub use log::LogSink;

/// Output surface size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn aspect(&self) -> f32 {
        if self.height == 0 {
            return 1.0;
        }
        self.width as f32 / self.height as f32
    }
}

/// Composed avatar state for one frame
#[derive(Debug, Clone, Serialize)]
pub struct FrameSnapshot {
    pub frame: u64,
    /// Seconds since the session started
    pub elapsed: f32,
    pub avatar: String,
    /// `None` when the session runs without tracking
    pub tracking: Option<TrackingState>,
    pub blink_mode: BlinkMode,
    /// Euler XYZ rotations in radians
    pub bones: BTreeMap<HumanoidBone, [f32; 3]>,
    /// Committed blend shape weights
    pub blend_shapes: BTreeMap<BlendShapePreset, f32>,
}

/// Receives composed frames
pub trait FrameSink {
    fn present(&mut self, frame: &FrameSnapshot) -> Result<(), CompositorError>;

    /// Viewport-resize hook; hosts call this at startup and on resize events.
    fn resize(&mut self, viewport: Viewport);
}
