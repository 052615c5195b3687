//! Avatar Compositor - Headless humanoid avatar pose driver
//!
//! Drives a humanoid avatar rig frame by frame:
//! - Loads the rig asynchronously and applies a static pose once it arrives
//! - Plays a scripted keyframe clip on a loop
//! - Follows an optional face tracker for head rotation and expressions
//! - Falls back to a procedural blink when tracking is not running
//!
//! Composed frames go to a [`output::FrameSink`] (JSON lines or log summaries).

pub mod animation;
pub mod avatar;
pub mod clock;
pub mod compositor;
pub mod config;
pub mod error;
pub mod output;
pub mod session;
pub mod tracking;

pub use config::Config;
pub use error::{CompositorError, Result};
pub use session::Session;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
