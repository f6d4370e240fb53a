//! Live container registry.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::container::Container;
use crate::runtime::types::ContainerId;

/// Every container the daemon currently knows about, keyed by full id.
#[derive(Debug, Default)]
pub struct ContainerStore {
    containers: RwLock<HashMap<ContainerId, Arc<Container>>>,
}

impl ContainerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `container`, returning the previous entry for the same id.
    pub fn add(&self, container: Arc<Container>) -> Option<Arc<Container>> {
        self.containers
            .write()
            .insert(container.id().clone(), container)
    }

    pub fn get(&self, id: &ContainerId) -> Option<Arc<Container>> {
        self.containers.read().get(id).cloned()
    }

    pub fn contains(&self, id: &ContainerId) -> bool {
        self.containers.read().contains_key(id)
    }

    pub fn delete(&self, id: &ContainerId) -> Option<Arc<Container>> {
        self.containers.write().remove(id)
    }

    /// Snapshot of all containers, ordered by name.
    pub fn list(&self) -> Vec<Arc<Container>> {
        let mut all: Vec<_> = self.containers.read().values().cloned().collect();
        all.sort_by(|a, b| a.name().cmp(b.name()));
        all
    }

    pub fn len(&self) -> usize {
        self.containers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
