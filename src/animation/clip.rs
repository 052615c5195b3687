//! Scripted keyframe clips.
//!
//! Clips are authored as `{ time_ms, rotation }` literals per bone and built
//! once into an immutable [`ScriptedClip`] whose times are in seconds.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::avatar::bone::{euler_to_quat, quat_to_euler};
use crate::avatar::HumanoidBone;
use crate::error::ClipError;

/// Authored rotation of one keyframe
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyRotation {
    /// Quaternion `[x, y, z, w]`
    Quaternion { quaternion: [f32; 4] },
    /// XYZ Euler angles in degrees
    Euler { euler_deg: [f32; 3] },
}

impl KeyRotation {
    fn is_finite(&self) -> bool {
        match self {
            KeyRotation::Quaternion { quaternion } => quaternion.iter().all(|v| v.is_finite()),
            KeyRotation::Euler { euler_deg } => euler_deg.iter().all(|v| v.is_finite()),
        }
    }

    fn to_quat(&self) -> Option<Quat> {
        match self {
            KeyRotation::Quaternion { quaternion } => {
                let q = Quat::from_array(*quaternion);
                if q.length_squared() < 1e-12 {
                    None
                } else {
                    Some(q.normalize())
                }
            }
            KeyRotation::Euler { euler_deg } => Some(euler_to_quat(Vec3::new(
                euler_deg[0].to_radians(),
                euler_deg[1].to_radians(),
                euler_deg[2].to_radians(),
            ))),
        }
    }
}

/// Authored keyframe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeySpec {
    /// Key time in milliseconds
    pub time_ms: f32,
    pub rotation: KeyRotation,
}

/// Authored per-bone track
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackSpec {
    pub bone: HumanoidBone,
    pub keys: Vec<KeySpec>,
}

/// Authored clip literal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipSpec {
    pub name: String,
    pub tracks: Vec<TrackSpec>,
}

impl ClipSpec {
    /// Two-second swing of the left upper arm about Z: rest, 45 degrees, rest.
    pub fn arm_swing() -> Self {
        let key = |time_ms: f32, z: f32| KeySpec {
            time_ms,
            rotation: KeyRotation::Euler { euler_deg: [0.0, 0.0, z] },
        };
        Self {
            name: "arm_swing".to_string(),
            tracks: vec![TrackSpec {
                bone: HumanoidBone::LeftUpperArm,
                keys: vec![key(0.0, 0.0), key(1000.0, 45.0), key(2000.0, 0.0)],
            }],
        }
    }
}

/// A keyframe with its time in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe {
    pub time: f32,
    pub rotation: Quat,
}

/// Keyframes for a single bone, sorted by time
#[derive(Debug, Clone)]
pub struct BoneTrack {
    bone: HumanoidBone,
    keys: Vec<Keyframe>,
}

impl BoneTrack {
    pub fn bone(&self) -> HumanoidBone {
        self.bone
    }

    pub fn keys(&self) -> &[Keyframe] {
        &self.keys
    }

    /// Interpolated rotation at `time` seconds, clamped to the first and last
    /// keyframes.
    pub fn sample(&self, time: f32) -> Quat {
        // Built tracks always hold at least one key
        let first = self.keys[0];
        let last = self.keys[self.keys.len() - 1];
        if !time.is_finite() || time <= first.time {
            return first.rotation;
        }
        if time >= last.time {
            return last.rotation;
        }

        let next = self.keys.partition_point(|k| k.time <= time);
        let a = self.keys[next - 1];
        let b = self.keys[next];
        let span = b.time - a.time;
        if span <= 0.0 {
            return b.rotation;
        }
        a.rotation.slerp(b.rotation, (time - a.time) / span)
    }
}

/// Immutable, validated keyframe clip
#[derive(Debug, Clone)]
pub struct ScriptedClip {
    name: String,
    duration: f32,
    tracks: Vec<BoneTrack>,
}

impl ScriptedClip {
    /// Validate an authored clip and convert its times to seconds.
    pub fn from_spec(spec: &ClipSpec) -> Result<Self, ClipError> {
        if spec.tracks.is_empty() {
            return Err(ClipError::NoTracks(spec.name.clone()));
        }

        let mut seen = BTreeSet::new();
        let mut tracks = Vec::with_capacity(spec.tracks.len());
        let mut duration = 0.0f32;

        for track in &spec.tracks {
            let bone = track.bone.to_string();
            if !seen.insert(track.bone) {
                return Err(ClipError::DuplicateTrack(bone));
            }
            if track.keys.is_empty() {
                return Err(ClipError::EmptyTrack(bone));
            }

            let mut keys = Vec::with_capacity(track.keys.len());
            for (index, key) in track.keys.iter().enumerate() {
                if !key.time_ms.is_finite() || !key.rotation.is_finite() {
                    return Err(ClipError::NonFinite(bone));
                }
                if key.time_ms < 0.0 {
                    return Err(ClipError::NegativeTime { bone, time_ms: key.time_ms });
                }
                if index > 0 && key.time_ms < track.keys[index - 1].time_ms {
                    return Err(ClipError::OutOfOrder { bone, index });
                }
                let rotation = key
                    .rotation
                    .to_quat()
                    .ok_or_else(|| ClipError::DegenerateQuaternion(bone.clone()))?;
                keys.push(Keyframe { time: key.time_ms / 1000.0, rotation });
            }

            duration = duration.max(keys[keys.len() - 1].time);
            tracks.push(BoneTrack { bone: track.bone, keys });
        }

        Ok(Self {
            name: spec.name.clone(),
            duration,
            tracks,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Clip length in seconds (time of the latest keyframe)
    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn tracks(&self) -> &[BoneTrack] {
        &self.tracks
    }

    /// Bones this clip animates
    pub fn bones(&self) -> impl Iterator<Item = HumanoidBone> + '_ {
        self.tracks.iter().map(|t| t.bone)
    }

    /// Euler rotation of `bone` at `time` seconds, `None` if the clip does
    /// not animate it.
    pub fn sample_bone(&self, bone: HumanoidBone, time: f32) -> Option<Vec3> {
        self.tracks
            .iter()
            .find(|t| t.bone == bone)
            .map(|t| quat_to_euler(t.sample(time)))
    }

    /// Euler rotations of every animated bone at `time` seconds
    pub fn sample(&self, time: f32) -> impl Iterator<Item = (HumanoidBone, Vec3)> + '_ {
        self.tracks
            .iter()
            .map(move |t| (t.bone, quat_to_euler(t.sample(time))))
    }
}
