//! Writable layer store interface.

use serde::{Deserialize, Serialize};
use std::fmt;
use teardown_shared::errors::TeardownResult;

/// Ownership token for a container's writable layer.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerHandle(String);

impl LayerHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LayerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for LayerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LayerHandle({})", self.0)
    }
}

/// A layer freed as a consequence of releasing a writable layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerMetadata {
    pub chain_id: String,
    pub diff_id: String,
    pub size: u64,
    pub diff_size: u64,
}

/// Storage driver that owns writable layers.
pub trait LayerStore: Send + Sync {
    /// Graph driver name, used in error messages.
    fn driver_name(&self) -> &str;

    /// Release a writable layer and any parents it was the last user of.
    ///
    /// Returns [`TeardownError::MountNotExist`] when the layer has no
    /// mount, which callers treat as already released.
    ///
    /// [`TeardownError::MountNotExist`]: teardown_shared::TeardownError::MountNotExist
    fn release_rw_layer(&self, handle: &LayerHandle) -> TeardownResult<Vec<LayerMetadata>>;
}

/// Log the layers freed by a release.
pub fn log_release_metadata(metadatas: &[LayerMetadata]) {
    for metadata in metadatas {
        tracing::info!(
            chain_id = %metadata.chain_id,
            diff_id = %metadata.diff_id,
            size = metadata.size,
            diff_size = metadata.diff_size,
            "Layer released"
        );
    }
}
