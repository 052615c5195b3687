//! Tracking module
//!
//! Face tracking sources that drive head rotation and expressions:
//! - Synthetic oscillating tracker (demos, no camera needed)
//! - JSON-over-UDP receiver fed by an external face tracker
//!
//! [`TrackingHandle`] wraps a source with the session-level readiness state
//! machine.

pub mod synthetic;
pub mod udp;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::{TrackingConfig, TrackingSourceKind};

pub use synthetic::SyntheticTracker;
pub use udp::UdpTracker;

/// One frame of inferred head rotation and expression weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingSample {
    /// Head rotation vector (radians)
    pub rotation: [f32; 3],
    /// Expression weights; index meaning is fixed by the tracker
    pub expressions: Vec<f32>,
}

impl TrackingSample {
    pub fn new(rotation: [f32; 3], expressions: Vec<f32>) -> Self {
        Self { rotation, expressions }
    }

    /// A sample is usable when its rotation is finite. Individual expression
    /// weights are checked where they are applied.
    pub fn is_valid(&self) -> bool {
        self.rotation.iter().all(|v| v.is_finite())
    }

    /// Expression weight at `index`, if present and finite
    pub fn expression(&self, index: usize) -> Option<f32> {
        self.expressions.get(index).copied().filter(|v| v.is_finite())
    }
}

/// Outcome of polling a source's initialization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStatus {
    Pending,
    Ready,
    /// Initialization failed with a source-specific error code
    Failed(i32),
}

/// A face tracking backend
pub trait TrackingSource {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Drive initialization forward. Called every frame until it returns
    /// `Ready` or `Failed`.
    fn poll_init(&mut self) -> InitStatus;

    /// Newest sample produced since the last call, if any
    fn poll_sample(&mut self) -> Option<TrackingSample>;
}

/// Session-level tracking integration state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingState {
    Uninitialized,
    /// Init failed; terminal for the session
    ErrorDisabled,
    /// Initialized, no valid sample yet
    ReadyIdle,
    /// At least one valid sample received; persists for the session
    ReadyTracking,
}

impl std::fmt::Display for TrackingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackingState::Uninitialized => write!(f, "uninitialized"),
            TrackingState::ErrorDisabled => write!(f, "error_disabled"),
            TrackingState::ReadyIdle => write!(f, "ready_idle"),
            TrackingState::ReadyTracking => write!(f, "ready_tracking"),
        }
    }
}

/// A tracking source plus its readiness state and the latest sample
pub struct TrackingHandle {
    source: Box<dyn TrackingSource>,
    state: TrackingState,
    latest: Option<TrackingSample>,
}

impl TrackingHandle {
    pub fn new(source: Box<dyn TrackingSource>) -> Self {
        Self {
            source,
            state: TrackingState::Uninitialized,
            latest: None,
        }
    }

    /// Build the configured source, `None` when tracking is off
    pub fn from_config(config: &TrackingConfig) -> Option<Self> {
        let source: Box<dyn TrackingSource> = match config.source {
            TrackingSourceKind::None => return None,
            TrackingSourceKind::Synthetic => Box::new(SyntheticTracker::new(
                Duration::from_millis(config.warmup_ms),
            )),
            TrackingSourceKind::Udp => {
                Box::new(UdpTracker::new(&config.listen_address, config.port))
            }
        };
        Some(Self::new(source))
    }

    pub fn state(&self) -> TrackingState {
        self.state
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Latest valid sample, held once tracking has started
    pub fn latest(&self) -> Option<&TrackingSample> {
        self.latest.as_ref()
    }

    /// Advance the state machine and pull new data. Returns the sample to use
    /// this frame, which is `Some` only in `ReadyTracking`.
    pub fn poll(&mut self) -> Option<&TrackingSample> {
        if self.state == TrackingState::Uninitialized {
            match self.source.poll_init() {
                InitStatus::Pending => return None,
                InitStatus::Ready => {
                    tracing::info!("Tracking source '{}' is ready", self.source.name());
                    self.state = TrackingState::ReadyIdle;
                }
                InitStatus::Failed(code) => {
                    tracing::warn!(
                        "Tracking source '{}' failed to initialize (error code {}), \
                         tracking disabled for this session",
                        self.source.name(),
                        code
                    );
                    self.state = TrackingState::ErrorDisabled;
                    return None;
                }
            }
        }

        if self.state == TrackingState::ErrorDisabled {
            return None;
        }

        if let Some(sample) = self.source.poll_sample() {
            if sample.is_valid() {
                if self.state == TrackingState::ReadyIdle {
                    tracing::info!("First tracking sample received");
                    self.state = TrackingState::ReadyTracking;
                }
                self.latest = Some(sample);
            } else {
                tracing::debug!("Dropping tracking sample with non-finite rotation");
            }
        }

        match self.state {
            TrackingState::ReadyTracking => self.latest.as_ref(),
            _ => None,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Scripted source for state machine tests
    pub(crate) struct FakeSource {
        pub init: VecDeque<InitStatus>,
        pub samples: VecDeque<Option<TrackingSample>>,
    }

    impl FakeSource {
        pub(crate) fn new(
            init: impl IntoIterator<Item = InitStatus>,
            samples: impl IntoIterator<Item = Option<TrackingSample>>,
        ) -> Self {
            Self {
                init: init.into_iter().collect(),
                samples: samples.into_iter().collect(),
            }
        }
    }

    impl TrackingSource for FakeSource {
        fn name(&self) -> &str {
            "fake"
        }

        fn poll_init(&mut self) -> InitStatus {
            self.init.pop_front().unwrap_or(InitStatus::Ready)
        }

        fn poll_sample(&mut self) -> Option<TrackingSample> {
            self.samples.pop_front().flatten()
        }
    }

    fn sample(x: f32) -> TrackingSample {
        TrackingSample::new([x, 0.0, 0.0], vec![])
    }

    #[test]
    fn test_pending_then_ready_idle_then_tracking() {
        let source = FakeSource::new(
            [InitStatus::Pending, InitStatus::Ready],
            [None, Some(sample(0.1))],
        );
        let mut handle = TrackingHandle::new(Box::new(source));

        assert!(handle.poll().is_none());
        assert_eq!(handle.state(), TrackingState::Uninitialized);

        assert!(handle.poll().is_none());
        assert_eq!(handle.state(), TrackingState::ReadyIdle);

        assert_eq!(handle.poll().map(|s| s.rotation[0]), Some(0.1));
        assert_eq!(handle.state(), TrackingState::ReadyTracking);
    }

    #[test]
    fn test_tracking_persists_with_latest_sample() {
        let source = FakeSource::new([InitStatus::Ready], [Some(sample(0.3)), None, None]);
        let mut handle = TrackingHandle::new(Box::new(source));
        handle.poll();
        assert_eq!(handle.poll().map(|s| s.rotation[0]), Some(0.3));
        assert_eq!(handle.poll().map(|s| s.rotation[0]), Some(0.3));
        assert_eq!(handle.state(), TrackingState::ReadyTracking);
    }

    #[test]
    fn test_init_error_is_terminal() {
        let source = FakeSource::new(
            [InitStatus::Failed(3), InitStatus::Ready],
            [Some(sample(0.5))],
        );
        let mut handle = TrackingHandle::new(Box::new(source));
        assert!(handle.poll().is_none());
        assert_eq!(handle.state(), TrackingState::ErrorDisabled);
        assert!(handle.poll().is_none());
        assert_eq!(handle.state(), TrackingState::ErrorDisabled);
    }

    #[test]
    fn test_invalid_sample_does_not_start_tracking() {
        let bad = TrackingSample::new([f32::NAN, 0.0, 0.0], vec![]);
        let source = FakeSource::new([InitStatus::Ready], [Some(bad)]);
        let mut handle = TrackingHandle::new(Box::new(source));
        assert!(handle.poll().is_none());
        assert_eq!(handle.state(), TrackingState::ReadyIdle);
    }

    #[test]
    fn test_from_config() {
        let mut config = TrackingConfig::default();
        assert!(TrackingHandle::from_config(&config).is_none());

        config.source = TrackingSourceKind::Synthetic;
        let handle = TrackingHandle::from_config(&config).unwrap();
        assert_eq!(handle.source_name(), "synthetic");
        assert_eq!(handle.state(), TrackingState::Uninitialized);
    }

    #[test]
    fn test_expression_lookup() {
        let s = TrackingSample::new([0.0; 3], vec![0.1, f32::NAN]);
        assert_eq!(s.expression(0), Some(0.1));
        assert_eq!(s.expression(1), None);
        assert_eq!(s.expression(5), None);
    }
}
