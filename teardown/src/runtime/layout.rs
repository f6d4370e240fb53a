use crate::runtime::types::ContainerId;
use std::path::{Path, PathBuf};
use teardown_shared::errors::{TeardownError, TeardownResult};

/// Directory structure constants
pub mod dirs {
    /// Base directory name for daemon data
    pub const TEARDOWN_DIR: &str = ".teardown";

    /// Subdirectory holding one private root per container
    pub const CONTAINERS_DIR: &str = "containers";

    /// Subdirectory for log files
    pub const LOGS_DIR: &str = "logs";
}

// ============================================================================
// FILESYSTEM LAYOUT (home directory)
// ============================================================================

#[derive(Clone, Debug)]
pub struct FilesystemLayout {
    home_dir: PathBuf,
}

impl FilesystemLayout {
    pub fn new(home_dir: PathBuf) -> Self {
        Self { home_dir }
    }

    pub fn home_dir(&self) -> &Path {
        &self.home_dir
    }

    /// Root directory for all container roots: ~/.teardown/containers
    pub fn containers_dir(&self) -> PathBuf {
        self.home_dir.join(dirs::CONTAINERS_DIR)
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.home_dir.join(dirs::LOGS_DIR)
    }

    /// Private root of one container: ~/.teardown/containers/{id}
    pub fn container_root(&self, id: &ContainerId) -> PathBuf {
        self.containers_dir().join(id.as_str())
    }

    /// Create the directories the daemon writes into.
    pub fn prepare(&self) -> TeardownResult<()> {
        for dir in [self.containers_dir(), self.logs_dir()] {
            std::fs::create_dir_all(&dir).map_err(|e| {
                TeardownError::Storage(format!("failed to create {}: {}", dir.display(), e))
            })?;
        }
        Ok(())
    }
}
