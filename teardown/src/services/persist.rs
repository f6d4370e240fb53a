//! Container state persistence.

use std::io::Write;
use std::path::{Path, PathBuf};

use teardown_shared::errors::{TeardownError, TeardownResult};

use crate::container::{Container, ContainerSnapshot};
use crate::runtime::constants::filenames;

/// Durable storage for container state.
pub trait StateStore: Send + Sync {
    /// Write the container's current state to stable storage.
    ///
    /// A container whose on-disk root is already gone must yield an
    /// [`std::io::ErrorKind::NotFound`] I/O error so callers can ignore it.
    fn persist(&self, container: &Container) -> TeardownResult<()>;
}

/// Writes `state.json` into each container's root directory.
///
/// The file is written to a temporary sibling and renamed into place so a
/// crash never leaves a truncated state file behind.
#[derive(Debug, Default, Clone)]
pub struct JsonStateStore;

impl JsonStateStore {
    pub fn new() -> Self {
        Self
    }

    pub fn state_path(root: &Path) -> PathBuf {
        root.join(filenames::STATE_FILE)
    }

    /// Read back a persisted snapshot.
    pub fn load(root: &Path) -> TeardownResult<ContainerSnapshot> {
        let path = Self::state_path(root);
        let content = std::fs::read_to_string(&path)?;
        serde_json::from_str(&content).map_err(|e| {
            TeardownError::Storage(format!("corrupt state file {}: {}", path.display(), e))
        })
    }
}

impl StateStore for JsonStateStore {
    fn persist(&self, container: &Container) -> TeardownResult<()> {
        let root = container.root();
        let json = serde_json::to_vec_pretty(&container.persisted_snapshot()).map_err(|e| {
            TeardownError::Storage(format!(
                "failed to serialize state of {}: {}",
                container.id(),
                e
            ))
        })?;

        // No create_dir_all: a missing root means the container is gone.
        let tmp = root.join(format!(".{}.tmp", filenames::STATE_FILE));
        let mut file = std::fs::File::create(&tmp)?;
        file.write_all(&json)?;
        file.sync_all()?;
        std::fs::rename(&tmp, Self::state_path(root))?;

        tracing::trace!(container_id = %container.id(), "Persisted container state");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{ContainerConfig, RunState};
    use tempfile::TempDir;

    #[test]
    fn test_persist_and_load() {
        let temp = TempDir::new().unwrap();
        let c = Container::new(ContainerConfig::new("web", temp.path().to_path_buf()));
        c.set_dead();

        JsonStateStore::new().persist(&c).unwrap();

        let snap = JsonStateStore::load(temp.path()).unwrap();
        assert_eq!(&snap.id, c.id());
        assert_eq!(snap.run_state, RunState::Dead);
        assert!(snap.state.dead);
    }

    #[test]
    fn test_persist_during_removal_records_dead() {
        let temp = TempDir::new().unwrap();
        let c = Container::new(ContainerConfig::new("web", temp.path().to_path_buf()));
        let _guard = c.try_begin_removal().unwrap();
        c.set_dead();

        JsonStateStore::new().persist(&c).unwrap();

        let snap = JsonStateStore::load(temp.path()).unwrap();
        assert_eq!(snap.run_state, RunState::Dead);
    }

    #[test]
    fn test_missing_root_is_not_found() {
        let temp = TempDir::new().unwrap();
        let c = Container::new(ContainerConfig::new("gone", temp.path().join("gone")));

        let err = JsonStateStore::new().persist(&c).unwrap_err();
        match err {
            TeardownError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
            other => panic!("expected io error, got {other:?}"),
        }
    }
}
