//! Bounded-retry removal of cgroup directories.
//!
//! Removing a cgroup races with the kernel dropping its last references
//! (e.g. an exiting task not yet reaped), so a single `rmdir` pass is not
//! reliable and the release itself cannot be awaited. The reclaimer
//! polls instead: delete, probe, back off, repeat.

use std::sync::Arc;

use teardown_shared::errors::{TeardownError, TeardownResult};

use super::fs::CgroupFs;
use super::paths::CgroupPaths;
use crate::runtime::options::RetryOptions;

pub struct CgroupReclaimer {
    fs: Arc<dyn CgroupFs>,
    policy: RetryOptions,
}

impl std::fmt::Debug for CgroupReclaimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CgroupReclaimer")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl CgroupReclaimer {
    /// A policy with zero attempts is raised to one so every path is tried
    /// at least once.
    pub fn new(fs: Arc<dyn CgroupFs>, mut policy: RetryOptions) -> Self {
        policy.attempts = policy.attempts.max(1);
        Self { fs, policy }
    }

    pub fn policy(&self) -> &RetryOptions {
        &self.policy
    }

    /// Remove every directory in `paths`.
    ///
    /// Entries are dropped from `paths` as soon as their directory is
    /// confirmed absent, so on error `paths` holds exactly the survivors.
    /// Removal errors are never inspected; only the existence probe decides.
    pub async fn reclaim(&self, paths: &mut CgroupPaths) -> TeardownResult<()> {
        let mut delay = self.policy.initial_delay();

        for attempt in 0..self.policy.attempts {
            if attempt != 0 {
                tokio::time::sleep(delay).await;
                delay = delay.saturating_mul(2);
            }

            paths.retain(|subsystem, path| {
                if let Err(e) = self.fs.remove_all(path) {
                    tracing::trace!(
                        subsystem = %subsystem,
                        path = %path.display(),
                        error = %e,
                        "cgroup removal reported error"
                    );
                }
                self.fs.exists(path)
            });

            if paths.is_empty() {
                tracing::debug!(attempts = attempt + 1, "Reclaimed cgroups");
                return Ok(());
            }
        }

        Err(TeardownError::Cgroup(format!(
            "failed to remove paths after {} attempts: {}",
            self.policy.attempts,
            describe(paths)
        )))
    }
}

fn describe(paths: &CgroupPaths) -> String {
    paths
        .iter()
        .map(|(subsystem, path)| format!("{}={}", subsystem, path.display()))
        .collect::<Vec<_>>()
        .join(", ")
}
