//! Constants for the teardown daemon.

// Re-export shared constants from teardown-shared
pub use teardown_shared::constants::{cgroup, events, reclaim, stop};

pub mod envs {
    pub const TEARDOWN_HOME: &str = "TEARDOWN_HOME";
}

/// File naming patterns
pub mod filenames {
    /// Persisted container state inside the container root
    pub const STATE_FILE: &str = "state.json";

    /// Daemon log file (rotated daily)
    pub const LOG_FILE: &str = "teardown.log";
}

/// Default number of events kept in memory
pub const EVENT_HISTORY: usize = 256;
