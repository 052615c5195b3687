//! Two-phase asynchronous loading: `Pending -> Loaded | Failed`

use std::path::PathBuf;
use tokio::sync::oneshot::{self, error::TryRecvError};

use super::rig::Avatar;
use crate::error::{CompositorError, RigError};

/// Result of polling a [`LoadState`] once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadEvent {
    /// Nothing changed this poll
    Unchanged,
    /// Transitioned to `Loaded` during this poll
    Loaded,
    /// Transitioned to `Failed` during this poll
    Failed,
}

/// A resource delivered asynchronously by a loader task.
#[derive(Debug)]
pub enum LoadState<T> {
    Pending(oneshot::Receiver<Result<T, CompositorError>>),
    Loaded(T),
    Failed(String),
}

impl<T> LoadState<T> {
    /// Check for completion without blocking.
    pub fn poll(&mut self) -> LoadEvent {
        let rx = match self {
            LoadState::Pending(rx) => rx,
            _ => return LoadEvent::Unchanged,
        };

        match rx.try_recv() {
            Ok(Ok(value)) => {
                *self = LoadState::Loaded(value);
                LoadEvent::Loaded
            }
            Ok(Err(e)) => {
                *self = LoadState::Failed(e.to_string());
                LoadEvent::Failed
            }
            Err(TryRecvError::Empty) => LoadEvent::Unchanged,
            Err(TryRecvError::Closed) => {
                *self = LoadState::Failed(RigError::LoaderDropped.to_string());
                LoadEvent::Failed
            }
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, LoadState::Pending(_))
    }

    pub fn get(&self) -> Option<&T> {
        match self {
            LoadState::Loaded(v) => Some(v),
            _ => None,
        }
    }

    pub fn get_mut(&mut self) -> Option<&mut T> {
        match self {
            LoadState::Loaded(v) => Some(v),
            _ => None,
        }
    }

    /// Failure message, if loading failed
    pub fn error(&self) -> Option<&str> {
        match self {
            LoadState::Failed(msg) => Some(msg),
            _ => None,
        }
    }
}

/// Start loading a rig on the current tokio runtime.
///
/// Must be called from within a runtime context.
pub fn spawn_rig_load(path: impl Into<PathBuf>) -> LoadState<Avatar> {
    let path = path.into();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        tracing::info!("Loading rig from {}", path.display());
        let result = Avatar::load(&path).await;
        // Receiver gone means the session was dropped
        let _ = tx.send(result);
    });

    LoadState::Pending(rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avatar::rig::RigDescription;
    use std::io::Write;

    #[test]
    fn test_pending_until_sent() {
        let (tx, rx) = oneshot::channel::<Result<u32, CompositorError>>();
        let mut state = LoadState::Pending(rx);
        assert_eq!(state.poll(), LoadEvent::Unchanged);
        assert!(state.is_pending());

        tx.send(Ok(7)).unwrap();
        assert_eq!(state.poll(), LoadEvent::Loaded);
        assert_eq!(state.get(), Some(&7));
        assert_eq!(state.poll(), LoadEvent::Unchanged);
    }

    #[test]
    fn test_error_becomes_failed() {
        let (tx, rx) = oneshot::channel::<Result<u32, CompositorError>>();
        let mut state = LoadState::Pending(rx);
        tx.send(Err(RigError::Parse("bad".into()).into())).unwrap();
        assert_eq!(state.poll(), LoadEvent::Failed);
        assert!(state.error().unwrap().contains("bad"));
        assert!(state.get().is_none());
    }

    #[test]
    fn test_dropped_sender_becomes_failed() {
        let (tx, rx) = oneshot::channel::<Result<u32, CompositorError>>();
        let mut state = LoadState::Pending(rx);
        drop(tx);
        assert_eq!(state.poll(), LoadEvent::Failed);
    }

    #[tokio::test]
    async fn test_spawn_rig_load() {
        let rig = RigDescription {
            name: "Disk".into(),
            humanoid: vec![crate::avatar::HumanoidBone::Head],
            blend_shapes: vec![],
            look_at: None,
        };
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(&rig).unwrap().as_bytes()).unwrap();

        let mut state = spawn_rig_load(file.path());
        for _ in 0..100 {
            if state.poll() != LoadEvent::Unchanged {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert_eq!(state.get().map(|a| a.name()), Some("Disk"));
    }

    #[tokio::test]
    async fn test_spawn_rig_load_missing_file() {
        let mut state = spawn_rig_load("/no/such/rig.json");
        for _ in 0..100 {
            if state.poll() != LoadEvent::Unchanged {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert!(state.error().is_some());
    }
}
