//! Stats collection interface.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::container::Container;
use crate::runtime::types::ContainerId;

/// Periodic resource-usage sampling for containers.
pub trait StatsCollector: Send + Sync {
    /// Stop sampling `container`. Calling it for a container that is not
    /// being sampled is a no-op.
    fn stop_collection(&self, container: &Container);
}

/// Tracks one cancellation token per sampled container.
///
/// Sampling loops obtain a token from [`StatsRegistry::start_collection`]
/// and exit once it is cancelled.
#[derive(Debug, Default)]
pub struct StatsRegistry {
    active: Mutex<HashMap<ContainerId, CancellationToken>>,
}

impl StatsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `id` for sampling; returns the existing token if already
    /// registered.
    pub fn start_collection(&self, id: &ContainerId) -> CancellationToken {
        self.active
            .lock()
            .entry(id.clone())
            .or_default()
            .clone()
    }

    pub fn is_collecting(&self, id: &ContainerId) -> bool {
        self.active.lock().contains_key(id)
    }
}

impl StatsCollector for StatsRegistry {
    fn stop_collection(&self, container: &Container) {
        if let Some(token) = self.active.lock().remove(container.id()) {
            token.cancel();
            tracing::debug!(container_id = %container.id(), "Stopped stats collection");
        }
    }
}
