//! Container removal.
//!
//! - **coordinator**: `Daemon::remove` entry point, link-only removal
//! - **cleanup**: ordered resource release for one container
//! - **unregister**: dropping the container from every index

mod cleanup;
mod coordinator;
mod unregister;

pub use cleanup::Cleanup;
pub use coordinator::RemovalOutcome;
pub use unregister::Unregistrar;

use serde::{Deserialize, Serialize};

/// Options for a single removal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovalRequest {
    /// Only drop the link alias named by the target, keep the container.
    pub remove_link: bool,
    /// Kill a running container and unregister even if teardown fails.
    pub force_remove: bool,
    /// Also remove the container's anonymous volumes.
    pub remove_volume: bool,
}

impl RemovalRequest {
    pub fn force(mut self) -> Self {
        self.force_remove = true;
        self
    }

    pub fn link(mut self) -> Self {
        self.remove_link = true;
        self
    }

    pub fn with_volumes(mut self) -> Self {
        self.remove_volume = true;
        self
    }
}
