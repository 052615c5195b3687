//! Session driver
//!
//! Owns the avatar load, the tracking handle, and the clip player, and runs
//! one compose pass per frame once the avatar is ready.

use glam::Vec3;

use crate::animation::{ClipPlayer, ScriptedClip};
use crate::avatar::{Avatar, LoadEvent, LoadState};
use crate::compositor::{BlinkMode, FrameInputs, PoseCompositor, TrackingInput};
use crate::config::{Config, StaticBonePose};
use crate::error::{CompositorError, ConfigError};
use crate::output::FrameSnapshot;
use crate::tracking::{TrackingHandle, TrackingState};

/// One avatar session
pub struct Session {
    avatar: LoadState<Avatar>,
    tracking: Option<TrackingHandle>,
    clip: Option<ClipPlayer>,
    compositor: PoseCompositor,
    static_pose: Vec<StaticBonePose>,
    look_at_target: Vec3,
    blink_rate: f32,
    elapsed: f32,
    frame: u64,
    blink_mode: Option<BlinkMode>,
}

impl Session {
    /// Create a session around an avatar load and an optional tracker.
    ///
    /// The clip is built from the animation config when enabled. An avatar
    /// that is already loaded gets its load-time setup immediately.
    pub fn new(
        config: &Config,
        avatar: LoadState<Avatar>,
        tracking: Option<TrackingHandle>,
    ) -> Result<Self, CompositorError> {
        let clip = if config.animation.enabled {
            if !config.animation.time_scale.is_finite() {
                return Err(ConfigError::InvalidValue {
                    field: "animation.time_scale".to_string(),
                    message: "Time scale must be finite".to_string(),
                }
                .into());
            }
            let clip = ScriptedClip::from_spec(&config.animation.clip)?;
            tracing::debug!(
                "Clip '{}' ({:.2}s, {} tracks)",
                clip.name(),
                clip.duration(),
                clip.tracks().len()
            );
            Some(ClipPlayer::new(
                clip,
                config.animation.loop_mode,
                config.animation.time_scale,
            ))
        } else {
            None
        };

        let mut session = Self {
            avatar,
            tracking,
            clip,
            compositor: PoseCompositor::from_config(&config.tracking, &config.blink),
            static_pose: config.avatar.static_pose.clone(),
            look_at_target: Vec3::from(config.camera.position),
            blink_rate: config.blink.rate,
            elapsed: 0.0,
            frame: 0,
            blink_mode: None,
        };

        if session.avatar.get().is_some() {
            session.on_avatar_loaded();
        }

        Ok(session)
    }

    pub fn avatar(&self) -> Option<&Avatar> {
        self.avatar.get()
    }

    /// Load failure message, if the avatar could not be loaded
    pub fn load_error(&self) -> Option<&str> {
        self.avatar.error()
    }

    /// `None` when the session runs without tracking
    pub fn tracking_state(&self) -> Option<TrackingState> {
        self.tracking.as_ref().map(|t| t.state())
    }

    pub fn clip(&self) -> Option<&ClipPlayer> {
        self.clip.as_ref()
    }

    /// Seconds of simulated time so far
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Blink source used on the last composed frame
    pub fn blink_mode(&self) -> Option<BlinkMode> {
        self.blink_mode
    }

    /// Advance the session by `delta` seconds.
    ///
    /// Returns the composed frame, or `None` while the avatar is not loaded.
    /// Negative or non-finite deltas count as zero.
    pub fn frame(&mut self, delta: f32) -> Option<FrameSnapshot> {
        let delta = if delta.is_finite() && delta > 0.0 { delta } else { 0.0 };
        self.elapsed += delta;

        match self.avatar.poll() {
            LoadEvent::Loaded => self.on_avatar_loaded(),
            LoadEvent::Failed => {
                tracing::error!(
                    "Avatar failed to load: {}",
                    self.avatar.error().unwrap_or("unknown error")
                );
            }
            LoadEvent::Unchanged => {}
        }

        // Tracking initializes independently of the avatar load
        let sample = self.tracking.as_mut().and_then(|t| t.poll());

        let avatar = self.avatar.get_mut()?;
        avatar.update(delta);

        if let Some(clip) = self.clip.as_mut() {
            clip.update(delta);
        }

        let tracking = match sample {
            Some(sample) => TrackingInput::Tracking(sample),
            None => TrackingInput::Inactive,
        };
        let mode = self.compositor.compose(
            avatar,
            FrameInputs {
                clip: self.clip.as_ref(),
                tracking,
                idle_phase: (self.blink_rate * self.elapsed).sin(),
            },
        );

        if self.blink_mode != Some(mode) {
            tracing::info!("Blink now driven by {:?} source", mode);
            self.blink_mode = Some(mode);
        }

        let snapshot = FrameSnapshot {
            frame: self.frame,
            elapsed: self.elapsed,
            avatar: avatar.name().to_string(),
            tracking: self.tracking.as_ref().map(|t| t.state()),
            blink_mode: mode,
            bones: avatar
                .bones()
                .iter()
                .map(|(bone, rotation)| (*bone, rotation.to_array()))
                .collect(),
            blend_shapes: avatar.blend_shapes().applied().clone(),
        };
        self.frame += 1;

        Some(snapshot)
    }

    fn on_avatar_loaded(&mut self) {
        let Some(avatar) = self.avatar.get_mut() else {
            return;
        };
        tracing::info!(
            "Avatar '{}' loaded ({} bones)",
            avatar.name(),
            avatar.bones().len()
        );

        for pose in &self.static_pose {
            if !avatar.set_bone(pose.bone, Vec3::from(pose.rotation)) {
                tracing::warn!("Rig has no {} bone, static pose skipped", pose.bone);
            }
        }

        avatar.set_look_at_target(self.look_at_target);

        if let Some(clip) = self.clip.as_mut() {
            let missing = clip.missing_bones(avatar);
            if !missing.is_empty() {
                tracing::warn!(
                    "Clip '{}' targets bones the rig lacks: {:?}",
                    clip.clip().name(),
                    missing
                );
            }
            clip.play();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avatar::{BlendShapePreset, HumanoidBone, RigDescription};
    use crate::tracking::tests::FakeSource;
    use crate::tracking::{InitStatus, TrackingSample};

    fn rig(bones: Vec<HumanoidBone>) -> Avatar {
        Avatar::from_rig(RigDescription {
            name: "Sample".into(),
            humanoid: bones,
            blend_shapes: BlendShapePreset::ALL.to_vec(),
            look_at: None,
        })
    }

    fn full_rig() -> Avatar {
        rig(HumanoidBone::ALL.to_vec())
    }

    fn no_clip() -> Config {
        let mut config = Config::default();
        config.animation.enabled = false;
        config
    }

    fn tracked(source: FakeSource) -> Option<TrackingHandle> {
        Some(TrackingHandle::new(Box::new(source)))
    }

    // The default clip overwrites LeftUpperArm, so this runs without it
    #[test]
    fn test_static_pose_and_idle_blink_after_one_second() {
        let mut session =
            Session::new(&no_clip(), LoadState::Loaded(full_rig()), None).unwrap();

        let mut last = None;
        for _ in 0..4 {
            last = session.frame(0.25);
        }
        let frame = last.unwrap();

        assert_eq!(frame.bones[&HumanoidBone::LeftUpperArm][0], 0.6);
        assert_eq!(frame.bones[&HumanoidBone::LeftLowerArm], [1.0, -1.0, 0.1]);
        assert_eq!(frame.bones[&HumanoidBone::LeftHand][1], -0.5);

        let blink = frame.blend_shapes[&BlendShapePreset::Blink];
        assert!((blink - 1f32.sin().abs()).abs() < 1e-5, "{blink}");
        assert_eq!(frame.blink_mode, BlinkMode::Procedural);
        assert_eq!(frame.frame, 3);
        assert!(frame.tracking.is_none());
    }

    #[test]
    fn test_zero_delta_is_idempotent() {
        let source = FakeSource::new(
            [InitStatus::Ready],
            [Some(TrackingSample::new([0.2, -0.1, 0.05], vec![0.3; 11]))],
        );
        let mut session =
            Session::new(&Config::default(), LoadState::Loaded(full_rig()), tracked(source))
                .unwrap();

        session.frame(0.5).unwrap();
        let a = session.frame(0.0).unwrap();
        let b = session.frame(0.0).unwrap();

        assert_eq!(a.elapsed, b.elapsed);
        assert_eq!(a.bones, b.bones);
        assert_eq!(a.blend_shapes, b.blend_shapes);
        assert_eq!(b.blink_mode, BlinkMode::Tracked);
    }

    #[test]
    fn test_negative_delta_counts_as_zero() {
        let mut session =
            Session::new(&no_clip(), LoadState::Loaded(full_rig()), None).unwrap();
        session.frame(0.5);
        session.frame(-3.0);
        session.frame(f32::NAN);
        assert_eq!(session.elapsed(), 0.5);
    }

    #[test]
    fn test_tracking_never_ready_keeps_idle_blink() {
        let source = FakeSource::new(std::iter::repeat(InitStatus::Pending).take(100), []);
        let mut session =
            Session::new(&no_clip(), LoadState::Loaded(full_rig()), tracked(source)).unwrap();

        for _ in 0..10 {
            let frame = session.frame(0.1).unwrap();
            assert_eq!(frame.blink_mode, BlinkMode::Procedural);
            assert_eq!(frame.tracking, Some(TrackingState::Uninitialized));
            assert_eq!(frame.bones[&HumanoidBone::Head], [0.0; 3]);
        }
        let blink = session.avatar().unwrap().blend_shapes();
        assert!((blink.applied_value(BlendShapePreset::Blink) - 1f32.sin()).abs() < 1e-5);
    }

    #[test]
    fn test_init_error_falls_back_for_the_session() {
        let sample = TrackingSample::new([0.5, 0.5, 0.5], vec![1.0; 11]);
        let source = FakeSource::new([InitStatus::Failed(2)], [Some(sample)]);
        let mut session =
            Session::new(&no_clip(), LoadState::Loaded(full_rig()), tracked(source)).unwrap();

        for _ in 0..3 {
            let frame = session.frame(0.1).unwrap();
            assert_eq!(frame.tracking, Some(TrackingState::ErrorDisabled));
            assert_eq!(frame.blink_mode, BlinkMode::Procedural);
            assert_eq!(frame.blend_shapes.get(&BlendShapePreset::A), None);
        }
    }

    #[test]
    fn test_tracking_overrides_head_and_blink() {
        let mut expressions = vec![0.0; 11];
        expressions[8] = 0.7;
        let source = FakeSource::new(
            [InitStatus::Ready],
            [Some(TrackingSample::new([0.1, 0.0, 0.0], expressions))],
        );
        let mut session =
            Session::new(&no_clip(), LoadState::Loaded(full_rig()), tracked(source)).unwrap();

        let frame = session.frame(1.0 / 60.0).unwrap();
        assert_eq!(frame.tracking, Some(TrackingState::ReadyTracking));
        assert_eq!(frame.blink_mode, BlinkMode::Tracked);
        assert!((frame.bones[&HumanoidBone::Head][0] + 0.07).abs() < 1e-6);
        assert_eq!(frame.blend_shapes[&BlendShapePreset::BlinkL], 0.7);
        assert_eq!(session.blink_mode(), Some(BlinkMode::Tracked));
    }

    #[test]
    fn test_idle_blink_cleared_when_tracking_starts() {
        let mut samples: Vec<Option<TrackingSample>> = vec![None; 5];
        samples.push(Some(TrackingSample::new([0.0; 3], vec![0.0; 11])));
        let source = FakeSource::new([InitStatus::Ready], samples);
        let mut session =
            Session::new(&no_clip(), LoadState::Loaded(full_rig()), tracked(source)).unwrap();

        for _ in 0..5 {
            let frame = session.frame(0.25).unwrap();
            assert_eq!(frame.blink_mode, BlinkMode::Procedural);
        }
        let idle = session.avatar().unwrap().blend_shapes();
        assert!(idle.applied_value(BlendShapePreset::Blink) > 0.5);

        let frame = session.frame(0.25).unwrap();
        assert_eq!(frame.blink_mode, BlinkMode::Tracked);
        assert_eq!(frame.blend_shapes[&BlendShapePreset::Blink], 0.0);
        assert_eq!(frame.blend_shapes[&BlendShapePreset::BlinkL], 0.0);
        assert_eq!(frame.blend_shapes[&BlendShapePreset::BlinkR], 0.0);
    }

    #[test]
    fn test_non_finite_time_scale_is_rejected() {
        let mut config = Config::default();
        config.animation.time_scale = f32::NAN;
        let err = Session::new(&config, LoadState::Loaded(full_rig()), None)
            .err()
            .unwrap();
        assert!(matches!(
            err,
            CompositorError::Config(ConfigError::InvalidValue { .. })
        ));

        // Without a clip the scale is unused
        config.animation.enabled = false;
        let mut session = Session::new(&config, LoadState::Loaded(full_rig()), None).unwrap();
        assert!(session.frame(0.1).is_some());
    }

    #[test]
    fn test_missing_bones_are_skipped() {
        let avatar = rig(vec![HumanoidBone::Hips, HumanoidBone::Spine]);
        let mut session =
            Session::new(&Config::default(), LoadState::Loaded(avatar), None).unwrap();

        let frame = session.frame(0.5).unwrap();
        assert_eq!(frame.bones.len(), 2);
        assert!(!frame.bones.contains_key(&HumanoidBone::LeftUpperArm));
        assert!(session.clip().unwrap().is_playing());
    }

    #[test]
    fn test_clip_drives_arm_when_enabled() {
        let mut session =
            Session::new(&Config::default(), LoadState::Loaded(full_rig()), None).unwrap();

        let frame = session.frame(1.0).unwrap();
        let arm = frame.bones[&HumanoidBone::LeftUpperArm];
        assert!((arm[2] - 45f32.to_radians()).abs() < 1e-4, "{arm:?}");
    }

    #[test]
    fn test_failed_load_yields_no_frames() {
        let mut session = Session::new(
            &no_clip(),
            LoadState::Failed("no such file".into()),
            None,
        )
        .unwrap();
        assert!(session.frame(0.1).is_none());
        assert!(session.frame(0.1).is_none());
        assert_eq!(session.load_error(), Some("no such file"));
        assert!((session.elapsed() - 0.2).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_pending_load_then_loaded() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let mut session = Session::new(&no_clip(), LoadState::Pending(rx), None).unwrap();

        assert!(session.frame(0.1).is_none());
        assert!(session.avatar().is_none());

        tx.send(Ok(full_rig())).unwrap();
        let frame = session.frame(0.1).unwrap();
        assert_eq!(frame.avatar, "Sample");
        assert_eq!(frame.frame, 0);
        assert_eq!(frame.bones[&HumanoidBone::LeftUpperArm][0], 0.6);
    }
}
