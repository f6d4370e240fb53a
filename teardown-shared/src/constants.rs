//! Shared constants.
//!
//! Values here are relied on by both the pipeline and collaborator
//! implementations, so they must not drift between the two.

/// Cgroup v1 hierarchy defaults.
pub mod cgroup {
    /// Mount point of the cgroup filesystem.
    pub const ROOT: &str = "/sys/fs/cgroup";

    /// Per-daemon parent group under each subsystem.
    pub const PARENT: &str = "docker";

    /// Marker file present only at the root of a unified (v2) hierarchy.
    pub const UNIFIED_MARKER: &str = "cgroup.controllers";

    /// Subsystem name used for the single unified hierarchy.
    pub const UNIFIED: &str = "unified";

    /// Subsystems reclaimed on teardown, including combined-controller
    /// mounts (`cpu,cpuacct`, `net_cls,net_prio`) and the named `systemd`
    /// hierarchy.
    pub const SUBSYSTEMS: &[&str] = &[
        "blkio",
        "cpu",
        "cpu,cpuacct",
        "cpuacct",
        "cpuset",
        "devices",
        "freezer",
        "hugetlb",
        "memory",
        "net_cls",
        "net_cls,net_prio",
        "net_prio",
        "perf_event",
        "pids",
        "systemd",
    ];
}

/// Reclaim retry defaults.
pub mod reclaim {
    /// Number of delete-then-probe rounds.
    pub const ATTEMPTS: u32 = 5;

    /// Delay before the second round; doubled before every later round.
    pub const INITIAL_DELAY_MS: u64 = 10;

    /// Upper bound accepted for the number of rounds.
    pub const MAX_ATTEMPTS: u32 = 16;

    /// Upper bound accepted for the first delay.
    pub const MAX_INITIAL_DELAY_MS: u64 = 1_000;
}

/// Process stop defaults.
pub mod stop {
    /// Grace period handed to the supervisor before it escalates to SIGKILL.
    pub const GRACE_SECONDS: u64 = 3;
}

/// Event actions emitted by the pipeline.
pub mod events {
    pub const DESTROY: &str = "destroy";

    /// Attribute naming the driver that owned a destroyed volume.
    pub const DRIVER_ATTR: &str = "driver";
}
