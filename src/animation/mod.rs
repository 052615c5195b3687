//! Scripted animation module
//!
//! Keyframe clip literals, validated clips, and clip playback.

pub mod clip;
pub mod player;

pub use clip::{ClipSpec, KeyRotation, KeySpec, ScriptedClip, TrackSpec};
pub use player::{ClipPlayer, LoopMode};
