//! Name reservations.

use std::collections::{BTreeSet, HashMap};

use parking_lot::RwLock;
use teardown_shared::errors::{TeardownError, TeardownResult};

use crate::runtime::types::ContainerId;

/// Maps canonical names (`/web`, `/web/db`) to the container they resolve
/// to. A container may hold several names: its own plus every link alias
/// pointing at it.
#[derive(Debug, Default)]
pub struct NameIndex {
    inner: RwLock<NameIndexInner>,
}

#[derive(Debug, Default)]
struct NameIndexInner {
    names: HashMap<String, ContainerId>,
    by_id: HashMap<ContainerId, BTreeSet<String>>,
}

impl NameIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `name` for `id`. Re-reserving a name for the same id is a
    /// no-op.
    pub fn reserve(&self, name: &str, id: &ContainerId) -> TeardownResult<()> {
        let mut inner = self.inner.write();

        if let Some(owner) = inner.names.get(name) {
            if owner == id {
                return Ok(());
            }
            return Err(TeardownError::Conflict(format!(
                "the name {} is already in use by container {}",
                name, owner
            )));
        }

        inner.names.insert(name.to_string(), id.clone());
        inner
            .by_id
            .entry(id.clone())
            .or_default()
            .insert(name.to_string());
        Ok(())
    }

    pub fn get(&self, name: &str) -> TeardownResult<ContainerId> {
        self.inner
            .read()
            .names
            .get(name)
            .cloned()
            .ok_or_else(|| TeardownError::NotFound(format!("name {} is not reserved", name)))
    }

    /// Drop a single name. Unknown names are ignored.
    pub fn release(&self, name: &str) {
        let mut inner = self.inner.write();
        if let Some(id) = inner.names.remove(name)
            && let Some(names) = inner.by_id.get_mut(&id)
        {
            names.remove(name);
            if names.is_empty() {
                inner.by_id.remove(&id);
            }
        }
    }

    /// Drop every name reserved for `id`.
    pub fn delete(&self, id: &ContainerId) {
        let mut inner = self.inner.write();
        if let Some(names) = inner.by_id.remove(id) {
            for name in names {
                inner.names.remove(&name);
            }
        }
    }

    pub fn names_of(&self, id: &ContainerId) -> Vec<String> {
        self.inner
            .read()
            .by_id
            .get(id)
            .map(|names| names.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
