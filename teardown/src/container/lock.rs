//! Per-container removal lock.
//!
//! A single atomic flag on the container. Holding a [`RemovalGuard`] is the
//! right to tear the container down; the flag is cleared when the guard
//! drops, including on early return and unwinding.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use super::Container;

/// Scoped ownership of a container's removal right.
#[must_use = "the removal lock is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct RemovalGuard {
    container: Arc<Container>,
}

impl RemovalGuard {
    /// Try to take the removal right. Returns `None` if another removal
    /// already holds it.
    pub(crate) fn try_acquire(container: &Arc<Container>) -> Option<Self> {
        match container.removal_in_progress.compare_exchange(
            false,
            true,
            Ordering::SeqCst,
            Ordering::SeqCst,
        ) {
            Ok(_) => {
                tracing::trace!(container_id = %container.id(), "Acquired removal lock");
                Some(Self {
                    container: Arc::clone(container),
                })
            }
            Err(_) => None,
        }
    }

    pub fn container(&self) -> &Arc<Container> {
        &self.container
    }
}

impl Drop for RemovalGuard {
    fn drop(&mut self) {
        self.container
            .removal_in_progress
            .store(false, Ordering::SeqCst);
        tracing::trace!(container_id = %self.container.id(), "Released removal lock");
    }
}
