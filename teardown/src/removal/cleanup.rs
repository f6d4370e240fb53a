//! Ordered resource release for one container.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use teardown_shared::errors::{TeardownError, TeardownResult, TeardownStep};

use super::unregister::{UnregisterOnExit, Unregistrar};
use crate::cgroup::{CgroupLayout, CgroupReclaimer};
use crate::container::Container;
use crate::services::Services;
use crate::services::layer::log_release_metadata;

/// Releases everything a container holds, then unregisters it.
///
/// Order matters: the process is stopped and the container persisted as
/// dead before anything is deleted, and unregistration only happens once
/// the dead state is on disk. A failure in any fatal step leaves the
/// container registered and dead unless `force` is set.
#[derive(Debug, Clone)]
pub struct Cleanup {
    services: Services,
    unregistrar: Unregistrar,
    cgroups: Arc<CgroupLayout>,
    reclaimer: Arc<CgroupReclaimer>,
    stop_timeout: Duration,
}

impl Cleanup {
    pub fn new(
        services: Services,
        unregistrar: Unregistrar,
        cgroups: Arc<CgroupLayout>,
        reclaimer: Arc<CgroupReclaimer>,
        stop_timeout: Duration,
    ) -> Self {
        Self {
            services,
            unregistrar,
            cgroups,
            reclaimer,
            stop_timeout,
        }
    }

    pub async fn run(&self, container: &Container, force: bool) -> TeardownResult<()> {
        let id = container.id();
        let supervisor = &self.services.supervisor;

        if supervisor.is_running(container) {
            if !force {
                return Err(TeardownError::Conflict(format!(
                    "you cannot remove a running container {}. Stop the container before attempting removal or force remove",
                    id
                )));
            }
            tracing::debug!(container_id = %id, "Force removing running container");
            // Nothing below is safe while the process lives, force or not.
            supervisor
                .kill(container)
                .await
                .map_err(|e| TeardownError::step(TeardownStep::Kill, id.as_str(), e))?;
        }

        self.services.stats.stop_collection(container);

        supervisor
            .stop(container, self.stop_timeout)
            .await
            .map_err(|e| TeardownError::step(TeardownStep::Stop, id.as_str(), e))?;

        container.set_dead();
        if let Err(e) = self.services.state_store.persist(container) {
            if is_missing(&e) {
                tracing::debug!(container_id = %id, "Container root already gone, state not persisted");
            } else {
                tracing::error!(container_id = %id, error = %e, "Failed to persist dead state");
            }
        }

        let mut unregister = UnregisterOnExit::arm(&self.unregistrar, container, force);
        let result = self.release(container).await;
        if result.is_ok() {
            unregister.succeeded();
        }
        drop(unregister);
        result
    }

    async fn release(&self, container: &Container) -> TeardownResult<()> {
        let id = container.id();

        remove_root(container)
            .map_err(|e| TeardownError::step(TeardownStep::RemoveRoot, id.as_str(), e))?;

        if let Some(layer) = container.rw_layer() {
            let layers = &self.services.layers;
            match layers.release_rw_layer(layer) {
                Ok(metadatas) => log_release_metadata(&metadatas),
                Err(TeardownError::MountNotExist) => {
                    tracing::debug!(container_id = %id, layer = %layer, "Writable layer was not mounted");
                }
                Err(e) => {
                    let message = format!(
                        "driver {} failed to remove root filesystem {}: {}",
                        layers.driver_name(),
                        id,
                        e
                    );
                    let source = match e {
                        TeardownError::ResourceBusy(_) => TeardownError::ResourceBusy(message),
                        _ => TeardownError::Storage(message),
                    };
                    return Err(TeardownError::step(
                        TeardownStep::ReleaseLayer,
                        id.as_str(),
                        source,
                    ));
                }
            }
        }

        let mut paths = self
            .cgroups
            .resolve(id)
            .map_err(|e| TeardownError::step(TeardownStep::ReclaimCgroups, id.as_str(), e))?;
        self.reclaimer
            .reclaim(&mut paths)
            .await
            .map_err(|e| TeardownError::step(TeardownStep::ReclaimCgroups, id.as_str(), e))?;

        tracing::debug!(container_id = %id, "Container resources released");
        Ok(())
    }
}

fn remove_root(container: &Container) -> TeardownResult<()> {
    match std::fs::remove_dir_all(container.root()) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(TeardownError::Storage(format!(
            "unable to remove filesystem for {}: {}",
            container.id(),
            e
        ))),
    }
}

fn is_missing(err: &TeardownError) -> bool {
    match err {
        TeardownError::Io(e) => e.kind() == io::ErrorKind::NotFound,
        other => other.is_not_found(),
    }
}
