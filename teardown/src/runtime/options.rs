//! Configuration for the teardown daemon.

use crate::runtime::constants::{cgroup as cgroup_const, envs as const_envs, reclaim, stop};
use crate::runtime::layout::dirs as const_dirs;
use crate::runtime::types::Seconds;
use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use teardown_shared::errors::{TeardownError, TeardownResult};

// ============================================================================
// Cgroup Options
// ============================================================================

/// Where container cgroups live and how the subsystem set is found.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CgroupOptions {
    /// Cgroup filesystem mount point.
    ///
    /// Default: /sys/fs/cgroup
    pub root: PathBuf,

    /// Parent group the daemon places containers under.
    ///
    /// Default: docker
    pub parent: String,

    /// Scan `root` for mounted hierarchies instead of using the fixed
    /// subsystem table.
    ///
    /// Default: false
    pub discover: bool,
}

impl Default for CgroupOptions {
    fn default() -> Self {
        Self {
            root: PathBuf::from(cgroup_const::ROOT),
            parent: cgroup_const::PARENT.to_string(),
            discover: false,
        }
    }
}

// ============================================================================
// Retry Options
// ============================================================================

/// Bounded retry with doubling backoff.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryOptions {
    /// Total number of rounds, including the first.
    pub attempts: u32,

    /// Delay before the second round; doubled before each later one.
    pub initial_delay_ms: u64,
}

impl RetryOptions {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    /// Sum of all sleeps when every round is used.
    pub fn max_backoff(&self) -> Duration {
        let mut total = Duration::ZERO;
        let mut delay = self.initial_delay();
        for _ in 1..self.attempts {
            total = total.saturating_add(delay);
            delay = delay.saturating_mul(2);
        }
        total
    }
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            attempts: reclaim::ATTEMPTS,
            initial_delay_ms: reclaim::INITIAL_DELAY_MS,
        }
    }
}

// ============================================================================
// Daemon Options
// ============================================================================

/// Daemon configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonOptions {
    /// Daemon home; holds container roots and logs.
    pub home_dir: PathBuf,

    /// Grace period before a stop escalates to a kill.
    pub stop_timeout: Seconds,

    pub cgroup: CgroupOptions,

    /// Cgroup reclaim retry policy.
    pub reclaim: RetryOptions,

    /// Number of events kept for `EventLog::history`.
    pub event_history: usize,
}

impl Default for DaemonOptions {
    fn default() -> Self {
        let home_dir = std::env::var(const_envs::TEARDOWN_HOME)
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let mut path = home_dir().unwrap_or_else(|| PathBuf::from("."));
                path.push(const_dirs::TEARDOWN_DIR);
                path
            });

        Self {
            home_dir,
            stop_timeout: Seconds::from_seconds(stop::GRACE_SECONDS),
            cgroup: CgroupOptions::default(),
            reclaim: RetryOptions::default(),
            event_history: crate::runtime::constants::EVENT_HISTORY,
        }
    }
}

impl DaemonOptions {
    /// Load options from a JSON file; missing fields take their defaults.
    pub fn from_file(path: &Path) -> TeardownResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TeardownError::Storage(format!("failed to read {}: {}", path.display(), e))
        })?;
        let options: Self = serde_json::from_str(&content).map_err(|e| {
            TeardownError::InvalidArgument(format!("invalid options in {}: {}", path.display(), e))
        })?;
        options.validate()?;
        Ok(options)
    }

    /// Check preconditions that would otherwise surface mid-teardown.
    pub fn validate(&self) -> TeardownResult<()> {
        if !self.home_dir.is_absolute() {
            return Err(TeardownError::InvalidArgument(format!(
                "home_dir must be absolute path, got: {}",
                self.home_dir.display()
            )));
        }
        if self.reclaim.attempts == 0 || self.reclaim.attempts > reclaim::MAX_ATTEMPTS {
            return Err(TeardownError::InvalidArgument(format!(
                "reclaim.attempts must be between 1 and {}, got: {}",
                reclaim::MAX_ATTEMPTS,
                self.reclaim.attempts
            )));
        }
        if self.reclaim.initial_delay_ms > reclaim::MAX_INITIAL_DELAY_MS {
            return Err(TeardownError::InvalidArgument(format!(
                "reclaim.initial_delay_ms must be at most {}, got: {}",
                reclaim::MAX_INITIAL_DELAY_MS,
                self.reclaim.initial_delay_ms
            )));
        }
        if !self.cgroup.root.is_absolute() {
            return Err(TeardownError::InvalidArgument(format!(
                "cgroup.root must be absolute path, got: {}",
                self.cgroup.root.display()
            )));
        }
        Ok(())
    }
}
