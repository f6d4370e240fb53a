//! Security-context labels.

use std::collections::HashSet;

use parking_lot::Mutex;
use teardown_shared::errors::{TeardownError, TeardownResult};

/// Allocator of process isolation labels.
pub trait SecurityLabels: Send + Sync {
    /// Return `label` to the pool. Unknown or empty labels are ignored.
    fn release(&self, label: &str);
}

/// In-memory pool of reserved labels.
#[derive(Debug, Default)]
pub struct LabelPool {
    reserved: Mutex<HashSet<String>>,
}

impl LabelPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `label`; fails if it is already in use.
    pub fn reserve(&self, label: &str) -> TeardownResult<()> {
        if !self.reserved.lock().insert(label.to_string()) {
            return Err(TeardownError::Conflict(format!(
                "label {} is already reserved",
                label
            )));
        }
        Ok(())
    }

    pub fn is_reserved(&self, label: &str) -> bool {
        self.reserved.lock().contains(label)
    }
}

impl SecurityLabels for LabelPool {
    fn release(&self, label: &str) {
        if label.is_empty() {
            return;
        }
        if self.reserved.lock().remove(label) {
            tracing::trace!(label, "Released security label");
        }
    }
}
