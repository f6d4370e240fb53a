//! Index unregistration.

use std::sync::Arc;

use crate::container::Container;
use crate::registry::Registry;
use crate::runtime::constants::events;
use crate::services::SecurityLabels;

/// Removes a container from every index the daemon keeps.
///
/// After `unregister` the container can no longer be resolved by name, id,
/// or link alias. Every step tolerates the container already being gone.
#[derive(Clone)]
pub struct Unregistrar {
    registry: Arc<Registry>,
    labels: Arc<dyn SecurityLabels>,
}

impl Unregistrar {
    pub fn new(registry: Arc<Registry>, labels: Arc<dyn SecurityLabels>) -> Self {
        Self { registry, labels }
    }

    pub fn unregister(&self, container: &Container) {
        let id = container.id();

        self.registry.names.delete(id);
        // Aliases this container held as a parent are reserved for the
        // children, so `names.delete(id)` does not cover them.
        for alias in self.registry.links.delete(id) {
            self.registry.names.release(&alias);
        }

        self.labels.release(container.process_label());
        self.registry.ids.delete(id);

        if self.registry.containers.delete(id).is_some() {
            self.registry.events.log(container, events::DESTROY);
            tracing::info!(container_id = %id, name = %container.name(), "Container removed");
        } else {
            tracing::debug!(container_id = %id, "Container was already unregistered");
        }
    }
}

impl std::fmt::Debug for Unregistrar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Unregistrar").finish_non_exhaustive()
    }
}

/// Unregisters the container when dropped if teardown succeeded or was
/// forced.
///
/// Armed after the container is marked dead, so it runs on every exit from
/// the rest of teardown, including unwinding.
pub(crate) struct UnregisterOnExit<'a> {
    unregistrar: &'a Unregistrar,
    container: &'a Container,
    force: bool,
    succeeded: bool,
}

impl<'a> UnregisterOnExit<'a> {
    pub(crate) fn arm(unregistrar: &'a Unregistrar, container: &'a Container, force: bool) -> Self {
        Self {
            unregistrar,
            container,
            force,
            succeeded: false,
        }
    }

    pub(crate) fn succeeded(&mut self) {
        self.succeeded = true;
    }
}

impl Drop for UnregisterOnExit<'_> {
    fn drop(&mut self) {
        if self.succeeded || self.force {
            self.unregistrar.unregister(self.container);
        } else {
            tracing::debug!(
                container_id = %self.container.id(),
                "Teardown failed, container stays registered"
            );
        }
    }
}
