//! Rig description loading and the live avatar instance

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use super::blend_shape::{BlendShapePreset, BlendShapeProxy};
use super::bone::HumanoidBone;
use crate::error::{CompositorError, RigError};

/// On-disk rig description (JSON)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RigDescription {
    /// Model display name
    pub name: String,
    /// Humanoid bones the model maps
    pub humanoid: Vec<HumanoidBone>,
    /// Blend shape presets the model provides
    #[serde(default)]
    pub blend_shapes: Vec<BlendShapePreset>,
    /// Eye look-at settings; absent when the model has no look-at
    #[serde(default)]
    pub look_at: Option<LookAtSpec>,
}

impl RigDescription {
    /// Parse a rig description from JSON
    pub fn from_json(s: &str) -> Result<Self, CompositorError> {
        serde_json::from_str(s).map_err(|e| RigError::Parse(e.to_string()).into())
    }
}

/// Look-at parameters declared by the rig
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookAtSpec {
    /// Head position in model space (metres)
    pub head_position: [f32; 3],
    /// Angle (degrees) at which eye rotation saturates
    #[serde(default = "default_input_max_deg")]
    pub input_max_deg: f32,
    /// Maximum eye rotation (degrees)
    #[serde(default = "default_output_max_deg")]
    pub output_max_deg: f32,
    /// Eye easing halflife in seconds (0 = snap)
    #[serde(default)]
    pub halflife: f32,
}

fn default_input_max_deg() -> f32 { 90.0 }
fn default_output_max_deg() -> f32 { 10.0 }

/// Runtime eye look-at state
#[derive(Debug, Clone)]
struct LookAt {
    spec: LookAtSpec,
    target: Option<Vec3>,
    /// Current eye rotation (x = pitch, positive looks down; y = yaw)
    current: Vec3,
}

impl LookAt {
    fn desired(&self) -> Option<Vec3> {
        let target = self.target?;
        let dir = target - Vec3::from(self.spec.head_position);
        if dir.length_squared() < 1e-8 {
            return Some(Vec3::ZERO);
        }

        // Model faces -Z
        let yaw = dir.x.atan2(-dir.z);
        let pitch = dir.y.atan2((dir.x * dir.x + dir.z * dir.z).sqrt());

        let map = |angle: f32| -> f32 {
            let input_max = self.spec.input_max_deg.max(f32::EPSILON).to_radians();
            (angle / input_max).clamp(-1.0, 1.0) * self.spec.output_max_deg.to_radians()
        };

        Some(Vec3::new(-map(pitch), map(yaw), 0.0))
    }

    fn advance(&mut self, delta: f32) -> Option<Vec3> {
        let desired = self.desired()?;
        let alpha = if self.spec.halflife <= 0.0 {
            1.0
        } else {
            1.0 - 0.5f32.powf(delta / self.spec.halflife)
        };
        self.current = self.current.lerp(desired, alpha);
        Some(self.current)
    }
}

/// A loaded humanoid avatar: bone rotations plus blend shapes.
#[derive(Debug, Clone)]
pub struct Avatar {
    name: String,
    /// Euler XYZ rotation (radians) per mapped bone
    bones: BTreeMap<HumanoidBone, Vec3>,
    blend_shapes: BlendShapeProxy,
    look_at: Option<LookAt>,
}

impl Avatar {
    /// Build an avatar in rest pose from a rig description
    pub fn from_rig(rig: RigDescription) -> Self {
        let bones = rig.humanoid.iter().map(|&b| (b, Vec3::ZERO)).collect();
        Self {
            name: rig.name,
            bones,
            blend_shapes: BlendShapeProxy::new(rig.blend_shapes),
            look_at: rig.look_at.map(|spec| LookAt {
                spec,
                target: None,
                current: Vec3::ZERO,
            }),
        }
    }

    /// Load a rig description from disk (blocking)
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CompositorError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            RigError::ReadFile(format!("{}: {}", path.as_ref().display(), e))
        })?;
        Ok(Self::from_rig(RigDescription::from_json(&contents)?))
    }

    /// Load a rig description from disk without blocking the runtime
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self, CompositorError> {
        let contents = tokio::fs::read_to_string(path.as_ref()).await.map_err(|e| {
            RigError::ReadFile(format!("{}: {}", path.as_ref().display(), e))
        })?;
        Ok(Self::from_rig(RigDescription::from_json(&contents)?))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the rig maps this bone
    pub fn has_bone(&self, bone: HumanoidBone) -> bool {
        self.bones.contains_key(&bone)
    }

    /// Current rotation of a bone, `None` when the rig lacks it
    pub fn bone(&self, bone: HumanoidBone) -> Option<Vec3> {
        self.bones.get(&bone).copied()
    }

    /// Mutable handle to a bone's rotation, `None` when the rig lacks it
    pub fn bone_mut(&mut self, bone: HumanoidBone) -> Option<&mut Vec3> {
        self.bones.get_mut(&bone)
    }

    /// Overwrite a bone's rotation. Returns false (and does nothing) when the
    /// rig lacks the bone.
    pub fn set_bone(&mut self, bone: HumanoidBone, rotation: Vec3) -> bool {
        match self.bones.get_mut(&bone) {
            Some(slot) => {
                *slot = rotation;
                true
            }
            None => false,
        }
    }

    pub fn bones(&self) -> &BTreeMap<HumanoidBone, Vec3> {
        &self.bones
    }

    pub fn blend_shapes(&self) -> &BlendShapeProxy {
        &self.blend_shapes
    }

    pub fn blend_shapes_mut(&mut self) -> &mut BlendShapeProxy {
        &mut self.blend_shapes
    }

    /// Point the eyes at a world-space target (no-op without look-at)
    pub fn set_look_at_target(&mut self, target: Vec3) {
        if let Some(look_at) = self.look_at.as_mut() {
            look_at.target = Some(target);
        }
    }

    /// Per-frame model corrections. Currently turns the eyes toward the
    /// look-at target.
    pub fn update(&mut self, delta: f32) {
        let eyes = match self.look_at.as_mut().and_then(|l| l.advance(delta)) {
            Some(e) => e,
            None => return,
        };
        self.set_bone(HumanoidBone::LeftEye, eyes);
        self.set_bone(HumanoidBone::RightEye, eyes);
    }
}
