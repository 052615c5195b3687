//! Clip playback: advances a playhead and writes sampled rotations onto an
//! avatar.

use serde::{Deserialize, Serialize};

use super::clip::ScriptedClip;
use crate::avatar::{Avatar, HumanoidBone};

/// What happens when the playhead reaches the end of the clip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopMode {
    /// Wrap around to the start
    #[default]
    Repeat,
    /// Hold the final keyframe
    Once,
}

/// Plays one [`ScriptedClip`]
#[derive(Debug, Clone)]
pub struct ClipPlayer {
    clip: ScriptedClip,
    mode: LoopMode,
    /// Multiplier applied to delta seconds
    time_scale: f32,
    /// Playhead in seconds
    playhead: f32,
    playing: bool,
}

impl ClipPlayer {
    /// A non-finite or negative `time_scale` freezes the playhead.
    pub fn new(clip: ScriptedClip, mode: LoopMode, time_scale: f32) -> Self {
        Self {
            clip,
            mode,
            time_scale: if time_scale.is_finite() { time_scale.max(0.0) } else { 0.0 },
            playhead: 0.0,
            playing: false,
        }
    }

    pub fn clip(&self) -> &ScriptedClip {
        &self.clip
    }

    /// Start (or resume) playback
    pub fn play(&mut self) {
        self.playing = true;
    }

    /// Stop playback and rewind
    pub fn stop(&mut self) {
        self.playing = false;
        self.playhead = 0.0;
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Playhead position in seconds
    pub fn playhead(&self) -> f32 {
        self.playhead
    }

    /// True once a non-looping clip has reached its last keyframe
    pub fn is_finished(&self) -> bool {
        self.mode == LoopMode::Once && self.playhead >= self.clip.duration()
    }

    /// Advance the playhead by `delta` seconds.
    pub fn update(&mut self, delta: f32) {
        if !self.playing || delta <= 0.0 {
            return;
        }

        let duration = self.clip.duration();
        let next = self.playhead + delta * self.time_scale;
        self.playhead = match self.mode {
            LoopMode::Repeat if duration > 0.0 => next.rem_euclid(duration),
            LoopMode::Repeat => 0.0,
            LoopMode::Once => next.min(duration),
        };
    }

    /// Write the current sample onto the avatar, overwriting those bones.
    /// Bones the avatar lacks are skipped. Returns the number of bones written.
    pub fn apply(&self, avatar: &mut Avatar) -> usize {
        if !self.playing {
            return 0;
        }
        self.clip
            .sample(self.playhead)
            .filter(|&(bone, rotation)| avatar.set_bone(bone, rotation))
            .count()
    }

    /// Animated bones the avatar does not map
    pub fn missing_bones(&self, avatar: &Avatar) -> Vec<HumanoidBone> {
        self.clip.bones().filter(|&b| !avatar.has_bone(b)).collect()
    }
}
