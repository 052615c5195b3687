//! Error types for the avatar compositor

use thiserror::Error;

/// Main error type for the avatar compositor
#[derive(Error, Debug)]
pub enum CompositorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Rig error: {0}")]
    Rig(#[from] RigError),

    #[error("Clip error: {0}")]
    Clip(#[from] ClipError),

    #[error("Tracking error: {0}")]
    Tracking(#[from] TrackingError),

    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadFile(String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid configuration value: {field} - {message}")]
    InvalidValue { field: String, message: String },
}

/// Rig loading errors
#[derive(Error, Debug)]
pub enum RigError {
    #[error("Failed to read rig file: {0}")]
    ReadFile(String),

    #[error("Failed to parse rig: {0}")]
    Parse(String),

    #[error("Rig loader dropped before completing")]
    LoaderDropped,
}

/// Scripted clip construction errors
#[derive(Error, Debug, PartialEq)]
pub enum ClipError {
    #[error("Clip '{0}' has no tracks")]
    NoTracks(String),

    #[error("Track for {0} has no keyframes")]
    EmptyTrack(String),

    #[error("Track for {bone} has a negative key time ({time_ms} ms)")]
    NegativeTime { bone: String, time_ms: f32 },

    #[error("Track for {bone} has key times out of order at index {index}")]
    OutOfOrder { bone: String, index: usize },

    #[error("Track for {0} has a non-finite value")]
    NonFinite(String),

    #[error("Track for {0} has a zero-length quaternion")]
    DegenerateQuaternion(String),

    #[error("Bone {0} is animated by more than one track")]
    DuplicateTrack(String),
}

/// Tracking source errors
#[derive(Error, Debug)]
pub enum TrackingError {
    #[error("UDP receiver error: {0}")]
    Receiver(String),

    #[error("Packet parse error: {0}")]
    Parse(String),
}

/// Frame output errors
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to serialize frame: {0}")]
    Serialize(String),

    #[error("Failed to write frame: {0}")]
    Write(String),
}

/// Result type alias for compositor operations
pub type Result<T> = std::result::Result<T, CompositorError>;
