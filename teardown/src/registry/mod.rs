//! Daemon bookkeeping: names, links, id prefixes, live containers, events.

mod events;
mod ids;
mod links;
mod names;
mod store;

pub use events::{Event, EventLog, EventType};
pub use ids::IdIndex;
pub use links::LinkIndex;
pub use names::NameIndex;
pub use store::ContainerStore;

use std::sync::Arc;

use teardown_shared::errors::{TeardownError, TeardownResult};

use crate::container::{Container, canonical_name};
use crate::runtime::types::ContainerId;

/// All indices a container is reachable through.
#[derive(Debug)]
pub struct Registry {
    pub names: NameIndex,
    pub links: LinkIndex,
    pub ids: IdIndex,
    pub containers: ContainerStore,
    pub events: EventLog,
}

impl Registry {
    pub fn new(event_history: usize) -> Self {
        Self {
            names: NameIndex::new(),
            links: LinkIndex::new(),
            ids: IdIndex::new(),
            containers: ContainerStore::new(),
            events: EventLog::new(event_history),
        }
    }

    /// Make `container` reachable by id, id prefix, and name.
    pub fn register(&self, container: Arc<Container>) -> TeardownResult<()> {
        if self.containers.contains(container.id()) {
            return Err(TeardownError::Conflict(format!(
                "container {} is already registered",
                container.id()
            )));
        }

        self.names.reserve(container.name(), container.id())?;
        self.ids.add(container.id());
        self.containers.add(container.clone());

        tracing::debug!(
            container_id = %container.id(),
            name = %container.name(),
            "Registered container"
        );
        Ok(())
    }

    /// Let `parent` reach `child` under `alias`.
    ///
    /// Reserves `/<parent>/<alias>` for the child and records the edge.
    /// Returns the full alias name.
    pub fn link(
        &self,
        parent: &Container,
        alias: &str,
        child: &Container,
    ) -> TeardownResult<String> {
        let alias = alias.trim_matches('/');
        if alias.is_empty() || alias.contains('/') {
            return Err(TeardownError::InvalidArgument(format!(
                "invalid link alias: {:?}",
                alias
            )));
        }

        let full_name = format!("{}/{}", parent.name(), alias);
        self.names.reserve(&full_name, child.id())?;
        self.links.link(parent.id(), &full_name, child.id());
        Ok(full_name)
    }

    /// Find a live container by full id, name, or unique id prefix.
    pub fn resolve(&self, name_or_id: &str) -> TeardownResult<Arc<Container>> {
        if name_or_id.is_empty() {
            return Err(TeardownError::InvalidArgument(
                "container name or id is empty".into(),
            ));
        }

        if let Some(id) = ContainerId::parse(name_or_id)
            && let Some(container) = self.containers.get(&id)
        {
            return Ok(container);
        }

        if let Ok(id) = self.names.get(&canonical_name(name_or_id))
            && let Some(container) = self.containers.get(&id)
        {
            return Ok(container);
        }

        let id = match self.ids.get(name_or_id) {
            Ok(id) => id,
            Err(e) if e.is_not_found() => return Err(no_such_container(name_or_id)),
            Err(e) => return Err(e),
        };
        self.containers
            .get(&id)
            .ok_or_else(|| no_such_container(name_or_id))
    }
}

fn no_such_container(name_or_id: &str) -> TeardownError {
    TeardownError::NotFound(format!("no such container: {}", name_or_id))
}
