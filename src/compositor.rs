//! Per-frame pose compositor.
//!
//! Merges the scripted clip, the tracked head pose and expressions, and the
//! procedural idle blink onto one avatar, in a fixed order:
//!
//! 1. scripted clip rotations (overwrite their bones)
//! 2. tracked head/neck/spine rotation (overrides step 1 on shared bones)
//! 3. tracked expressions (idle blink zeroed), then commit
//! 4. procedural blink when not tracking, then commit
//!
//! The compositor holds no cross-frame state.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::animation::ClipPlayer;
use crate::avatar::{Avatar, BlendShapePreset, HumanoidBone};
use crate::config::{BlinkConfig, TrackingConfig};
use crate::tracking::TrackingSample;

/// How one bone follows the tracked rotation vector:
/// `rotation[axis] = coefficient * signs[axis] * tracked[axis]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DampingRule {
    pub bone: HumanoidBone,
    pub coefficient: f32,
    pub signs: [f32; 3],
}

impl DampingRule {
    pub fn new(bone: HumanoidBone, coefficient: f32, signs: [f32; 3]) -> Self {
        Self { bone, coefficient, signs }
    }

    /// Head 0.7, neck 0.2, spine 0.1. Relative to the neck, head and spine
    /// invert the first and third axis.
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new(HumanoidBone::Head, 0.7, [-1.0, -1.0, 1.0]),
            Self::new(HumanoidBone::Neck, 0.2, [1.0, -1.0, -1.0]),
            Self::new(HumanoidBone::Spine, 0.1, [-1.0, -1.0, 1.0]),
        ]
    }

    /// Bone rotation for a tracked rotation vector
    pub fn apply(&self, tracked: [f32; 3]) -> Vec3 {
        Vec3::from(tracked) * Vec3::from(self.signs) * self.coefficient
    }
}

/// Binds one index of the tracker's expression vector to a blend shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressionBinding {
    pub index: usize,
    pub preset: BlendShapePreset,
}

impl ExpressionBinding {
    pub fn new(index: usize, preset: BlendShapePreset) -> Self {
        Self { index, preset }
    }

    /// 6 = A, 7 = U, 8 = left blink, 9 = right blink, 10 = I
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new(6, BlendShapePreset::A),
            Self::new(7, BlendShapePreset::U),
            Self::new(10, BlendShapePreset::I),
            Self::new(8, BlendShapePreset::BlinkL),
            Self::new(9, BlendShapePreset::BlinkR),
        ]
    }
}

/// Which source drives the eyelids this session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlinkMode {
    /// `|sin(phase)|` on a single blink shape
    Procedural,
    /// Per-eye weights from the tracker
    Tracked,
}

/// Tracking contribution for one frame
#[derive(Debug, Clone, Copy)]
pub enum TrackingInput<'a> {
    Inactive,
    Tracking(&'a TrackingSample),
}

impl TrackingInput<'_> {
    pub fn blink_mode(&self) -> BlinkMode {
        match self {
            TrackingInput::Inactive => BlinkMode::Procedural,
            TrackingInput::Tracking(_) => BlinkMode::Tracked,
        }
    }
}

/// Everything the compositor reads for one frame besides the avatar
#[derive(Debug, Clone, Copy)]
pub struct FrameInputs<'a> {
    pub clip: Option<&'a ClipPlayer>,
    pub tracking: TrackingInput<'a>,
    /// `sin(rate * elapsed)`
    pub idle_phase: f32,
}

/// Merges pose sources onto an avatar
#[derive(Debug, Clone)]
pub struct PoseCompositor {
    damping: Vec<DampingRule>,
    expressions: Vec<ExpressionBinding>,
    blink: Option<BlendShapePreset>,
}

impl PoseCompositor {
    pub fn new(
        damping: Vec<DampingRule>,
        expressions: Vec<ExpressionBinding>,
        blink: Option<BlendShapePreset>,
    ) -> Self {
        Self {
            damping,
            expressions,
            blink,
        }
    }

    pub fn from_config(tracking: &TrackingConfig, blink: &BlinkConfig) -> Self {
        Self::new(
            tracking.damping.clone(),
            tracking.expressions.clone(),
            blink.enabled.then_some(blink.preset),
        )
    }

    /// Compose one frame onto `avatar`. Returns the blink mode used.
    pub fn compose(&self, avatar: &mut Avatar, inputs: FrameInputs<'_>) -> BlinkMode {
        if let Some(clip) = inputs.clip {
            clip.apply(avatar);
        }

        match inputs.tracking {
            TrackingInput::Tracking(sample) => {
                self.apply_head_pose(avatar, sample.rotation);
                self.apply_expressions(avatar, sample);
            }
            TrackingInput::Inactive => self.apply_idle_blink(avatar, inputs.idle_phase),
        }

        inputs.tracking.blink_mode()
    }

    fn apply_head_pose(&self, avatar: &mut Avatar, rotation: [f32; 3]) {
        for rule in &self.damping {
            // Rigs without the bone simply skip it
            avatar.set_bone(rule.bone, rule.apply(rotation));
        }
    }

    fn apply_expressions(&self, avatar: &mut Avatar, sample: &TrackingSample) {
        let shapes = avatar.blend_shapes_mut();
        // Tracked per-eye blinks replace the idle blink, which may still be committed
        if let Some(preset) = self.blink {
            shapes.set_value(preset, 0.0);
        }
        for binding in &self.expressions {
            if let Some(weight) = sample.expression(binding.index) {
                shapes.set_value(binding.preset, weight);
            }
        }
        shapes.update();
    }

    fn apply_idle_blink(&self, avatar: &mut Avatar, phase: f32) {
        let Some(preset) = self.blink else {
            return;
        };
        let shapes = avatar.blend_shapes_mut();
        shapes.set_value(preset, phase.abs());
        shapes.update();
    }
}

impl Default for PoseCompositor {
    fn default() -> Self {
        Self::new(
            DampingRule::defaults(),
            ExpressionBinding::defaults(),
            Some(BlendShapePreset::Blink),
        )
    }
}
