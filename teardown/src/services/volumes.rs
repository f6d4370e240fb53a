//! Named volume store interface.

use serde::{Deserialize, Serialize};
use teardown_shared::errors::TeardownResult;

/// A named volume as reported by the volume store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    pub name: String,
    /// Volume driver that owns the data.
    pub driver: String,
}

impl Volume {
    pub fn new(name: impl Into<String>, driver: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            driver: driver.into(),
        }
    }
}

/// Store that owns named volumes.
pub trait VolumeStore: Send + Sync {
    /// Look up a volume; [`TeardownError::NotFound`] when it does not exist.
    ///
    /// [`TeardownError::NotFound`]: teardown_shared::TeardownError::NotFound
    fn get(&self, name: &str) -> TeardownResult<Volume>;

    /// Delete a volume and its data.
    ///
    /// Must fail with [`TeardownError::InUse`] while any container still
    /// references the volume.
    ///
    /// [`TeardownError::InUse`]: teardown_shared::TeardownError::InUse
    fn remove(&self, volume: &Volume) -> TeardownResult<()>;
}
