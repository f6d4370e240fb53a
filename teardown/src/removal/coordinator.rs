//! Removal entry point.
//!
//! Resolves the target, takes the per-container removal lock and hands the
//! actual work to a spawned task. The task owns the lock, so a caller that
//! gives up on the returned future cannot leave teardown half done.
//! Named volumes are removed through the volume store directly.

use std::collections::BTreeMap;
use std::sync::Arc;

use teardown_shared::errors::{TeardownError, TeardownResult};

use super::RemovalRequest;
use crate::container::{Container, RemovalGuard, canonical_name};
use crate::runtime::constants::events;
use crate::runtime::core::{Daemon, DaemonInnerImpl};

/// Result of one target in [`Daemon::remove_many`].
#[derive(Debug)]
pub struct RemovalOutcome {
    pub target: String,
    pub result: TeardownResult<()>,
}

impl Daemon {
    /// Remove a container, or with `remove_link` only one of its link
    /// aliases.
    ///
    /// A concurrent removal of the same container already holding the lock
    /// makes this call return `Ok(())` without doing anything.
    pub async fn remove(&self, name_or_id: &str, request: RemovalRequest) -> TeardownResult<()> {
        let container = self.inner.registry.resolve(name_or_id)?;

        let Some(guard) = container.try_begin_removal() else {
            tracing::debug!(container_id = %container.id(), "Removal already in progress");
            return Ok(());
        };

        let inner = Arc::clone(&self.inner);
        let target = name_or_id.to_string();
        let id = container.id().clone();
        let task = tokio::spawn(async move { remove_locked(&inner, guard, &target, request).await });

        task.await.map_err(|e| {
            TeardownError::Internal(format!("removal of container {} did not complete: {}", id, e))
        })?
    }

    /// Remove several targets concurrently. Outcomes keep the input order.
    pub async fn remove_many<I, S>(&self, targets: I, request: RemovalRequest) -> Vec<RemovalOutcome>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let removals = targets.into_iter().map(|target| {
            let target = target.into();
            async move {
                let result = self.remove(&target, request).await;
                RemovalOutcome { target, result }
            }
        });
        futures::future::join_all(removals).await
    }

    /// Remove a named volume. A volume still referenced by a container is
    /// refused with a conflict.
    pub fn remove_volume(&self, name: &str) -> TeardownResult<()> {
        let volumes = &self.inner.services.volumes;
        let volume = volumes.get(name)?;

        if let Err(e) = volumes.remove(&volume) {
            if e.is_in_use() {
                return Err(TeardownError::Conflict(format!(
                    "unable to remove volume, volume still in use: {}",
                    e
                )));
            }
            return Err(TeardownError::Storage(format!(
                "error while removing volume {}: {}",
                name, e
            )));
        }

        let mut attributes = BTreeMap::new();
        attributes.insert(events::DRIVER_ATTR.to_string(), volume.driver.clone());
        self.inner
            .registry
            .events
            .log_volume(&volume.name, events::DESTROY, attributes);

        tracing::debug!(volume = %volume.name, driver = %volume.driver, "Removed volume");
        Ok(())
    }
}

async fn remove_locked(
    inner: &DaemonInnerImpl,
    guard: RemovalGuard,
    target: &str,
    request: RemovalRequest,
) -> TeardownResult<()> {
    let container = guard.container();

    // A removal that finished between resolve and lock already unregistered it.
    if !inner.registry.containers.contains(container.id()) {
        tracing::debug!(container_id = %container.id(), "Container already removed");
        return Ok(());
    }

    if request.remove_link {
        return remove_link(inner, container, target);
    }

    tracing::debug!(
        container_id = %container.id(),
        force = request.force_remove,
        remove_volume = request.remove_volume,
        "Removing container"
    );

    let result = inner.cleanup.run(container, request.force_remove).await;

    if (result.is_ok() || request.force_remove)
        && let Err(e) = inner
            .services
            .mounts
            .remove_mount_points(container, request.remove_volume)
    {
        tracing::error!(container_id = %container.id(), error = %e, "Failed to remove mount points");
    }

    if let Err(e) = &result {
        tracing::warn!(container_id = %container.id(), error = %e, "Container removal failed");
    }
    result
}

/// Drop the link alias `name` without touching the container behind it.
fn remove_link(inner: &DaemonInnerImpl, child: &Container, name: &str) -> TeardownResult<()> {
    let name = canonical_name(name);
    let (parent, alias) = name.rsplit_once('/').unwrap_or(("", name.as_str()));
    if parent.is_empty() {
        return Err(TeardownError::Conflict(
            "cannot remove the default name of the container".into(),
        ));
    }

    let registry = &inner.registry;
    let parent_id = registry.names.get(parent).map_err(|_| {
        TeardownError::NotFound(format!("cannot get parent {} for name {}", parent, name))
    })?;

    registry.names.release(&name);

    if let Some(parent_container) = registry.containers.get(&parent_id) {
        registry.links.unlink(&name, child.id(), &parent_id);
        if let Err(e) = inner.services.network.update_network(&parent_container) {
            tracing::debug!(
                container_id = %parent_id,
                alias,
                error = %e,
                "Could not update network to remove link"
            );
        }
    }

    tracing::debug!(container_id = %child.id(), name = %name, "Removed link");
    Ok(())
}
