//! Configuration parsing and management

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::animation::{ClipSpec, LoopMode, ScriptedClip};
use crate::avatar::{BlendShapePreset, HumanoidBone};
use crate::compositor::{DampingRule, ExpressionBinding};
use crate::error::{CompositorError, ConfigError};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub frame: FrameConfig,
    pub avatar: AvatarConfig,
    pub camera: CameraConfig,
    pub animation: AnimationConfig,
    pub tracking: TrackingConfig,
    pub blink: BlinkConfig,
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CompositorError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ConfigError::ReadFile(format!("{}: {}", path.as_ref().display(), e))
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    pub fn from_str(s: &str) -> Result<Self, CompositorError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()).into())
    }

    /// Load configuration from default paths
    pub fn load() -> Result<Self, CompositorError> {
        let paths = [
            PathBuf::from("config.toml"),
            PathBuf::from("config/default.toml"),
            dirs_path().join("config.toml"),
        ];

        for path in &paths {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::from_file(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), CompositorError> {
        if self.frame.fps == 0 {
            return Err(invalid("frame.fps", "FPS must be greater than 0"));
        }

        if !self.animation.time_scale.is_finite() || self.animation.time_scale < 0.0 {
            return Err(invalid("animation.time_scale", "Time scale must be finite and >= 0"));
        }

        if self.animation.enabled {
            ScriptedClip::from_spec(&self.animation.clip)?;
        }

        for pose in &self.avatar.static_pose {
            if !pose.rotation.iter().all(|v| v.is_finite()) {
                return Err(invalid(
                    "avatar.static_pose",
                    &format!("Rotation for {} must be finite", pose.bone),
                ));
            }
        }

        for rule in &self.tracking.damping {
            if !rule.coefficient.is_finite() || !rule.signs.iter().all(|v| v.is_finite()) {
                return Err(invalid(
                    "tracking.damping",
                    &format!("Rule for {} must be finite", rule.bone),
                ));
            }
        }

        if self.tracking.source == TrackingSourceKind::Udp && self.tracking.port == 0 {
            return Err(invalid("tracking.port", "Port must be greater than 0"));
        }

        if !self.blink.rate.is_finite() {
            return Err(invalid("blink.rate", "Blink rate must be finite"));
        }

        if self.camera.viewport_width == 0 || self.camera.viewport_height == 0 {
            return Err(invalid("camera.viewport", "Viewport must not be empty"));
        }

        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> CompositorError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        message: message.to_string(),
    }
    .into()
}

/// Frame loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Target frames per second
    pub fps: u32,
    /// Stop after this many frames (0 = run until interrupted)
    pub max_frames: u64,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            fps: 60,
            max_frames: 0,
        }
    }
}

/// A rotation applied once when the avatar finishes loading
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticBonePose {
    pub bone: HumanoidBone,
    /// XYZ Euler rotation in radians
    pub rotation: [f32; 3],
}

/// Avatar configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AvatarConfig {
    /// Path to the rig description (JSON)
    pub rig_path: PathBuf,
    /// Rotations applied at load time
    pub static_pose: Vec<StaticBonePose>,
}

impl Default for AvatarConfig {
    fn default() -> Self {
        let pose = |bone, rotation| StaticBonePose { bone, rotation };
        Self {
            rig_path: PathBuf::from("assets/avatar_sample_a.json"),
            static_pose: vec![
                pose(HumanoidBone::LeftUpperArm, [0.6, 0.0, 0.0]),
                pose(HumanoidBone::LeftLowerArm, [1.0, -1.0, 0.1]),
                pose(HumanoidBone::LeftHand, [0.0, -0.5, 0.0]),
            ],
        }
    }
}

/// Camera and viewport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Camera position; the avatar's eyes look here
    pub position: [f32; 3],
    /// Orbit target
    pub target: [f32; 3],
    /// Vertical field of view in degrees
    pub fov_deg: f32,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 1.1, -2.0],
            target: [0.0, 0.85, 0.0],
            fov_deg: 45.0,
            viewport_width: 1280,
            viewport_height: 720,
        }
    }
}

/// Scripted animation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Play the scripted clip
    pub enabled: bool,
    pub loop_mode: LoopMode,
    /// Playback speed multiplier (seconds of clip per second of wall time)
    pub time_scale: f32,
    /// Clip literal
    pub clip: ClipSpec,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            loop_mode: LoopMode::Repeat,
            time_scale: 1.0,
            clip: ClipSpec::arm_swing(),
        }
    }
}

/// Which tracking source to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingSourceKind {
    /// No tracking; procedural blink only
    #[default]
    None,
    /// Built-in oscillating tracker
    Synthetic,
    /// JSON-over-UDP receiver
    Udp,
}

impl std::str::FromStr for TrackingSourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "off" => Ok(Self::None),
            "synthetic" | "demo" => Ok(Self::Synthetic),
            "udp" => Ok(Self::Udp),
            other => Err(format!("unknown tracking source: {}", other)),
        }
    }
}

/// Face tracking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub source: TrackingSourceKind,
    /// Listen address for the UDP receiver
    pub listen_address: String,
    /// UDP port
    pub port: u16,
    /// Synthetic tracker start-up delay in milliseconds
    pub warmup_ms: u64,
    /// Per-bone damping of the tracked head rotation
    pub damping: Vec<DampingRule>,
    /// Expression vector index to blend shape bindings
    pub expressions: Vec<ExpressionBinding>,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            source: TrackingSourceKind::None,
            listen_address: "127.0.0.1".to_string(),
            port: 12347,
            warmup_ms: 0,
            damping: DampingRule::defaults(),
            expressions: ExpressionBinding::defaults(),
        }
    }
}

/// Procedural blink used when no tracking drives the eyes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlinkConfig {
    pub enabled: bool,
    /// Blend shape driven by the idle blink
    pub preset: BlendShapePreset,
    /// Angular rate of the idle phase (radians per second)
    pub rate: f32,
}

impl Default for BlinkConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            preset: BlendShapePreset::Blink,
            rate: 1.0,
        }
    }
}

/// Frame output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Periodic summary log lines
    #[default]
    Log,
    /// One JSON object per frame on stdout
    Json,
}

/// Frame output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    /// Log one summary every N frames (log format)
    pub log_every: u64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Log,
            log_every: 60,
        }
    }
}

/// Get the platform-specific configuration directory
fn dirs_path() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        if let Some(config_dir) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(config_dir).join("avatar-compositor");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(".config/avatar-compositor");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join("Library/Application Support/avatar-compositor");
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("avatar-compositor");
        }
    }

    PathBuf::from(".")
}
