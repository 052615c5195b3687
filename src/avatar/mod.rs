//! Avatar module
//!
//! Humanoid bone and blend shape identifiers, rig loading, and the live
//! avatar pose state.

pub mod blend_shape;
pub mod bone;
pub mod load;
pub mod rig;

pub use blend_shape::{BlendShapePreset, BlendShapeProxy};
pub use bone::HumanoidBone;
pub use load::{spawn_rig_load, LoadEvent, LoadState};
pub use rig::{Avatar, LookAtSpec, RigDescription};
