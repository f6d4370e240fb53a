//! Container teardown pipeline.
//!
//! Removes containers from a daemon: coordinates concurrent removal
//! requests, releases every resource a container holds (process, stats,
//! root directory, writable layer, cgroups, mounts) and drops it from the
//! daemon's indices.
//! Named volumes are removed through the same daemon.
//!
//! ```no_run
//! # async fn example(daemon: teardown::Daemon) -> teardown::TeardownResult<()> {
//! use teardown::RemovalRequest;
//!
//! daemon.remove("web", RemovalRequest::default().force()).await?;
//! # Ok(())
//! # }
//! ```

pub mod cgroup;
pub mod container;
pub mod registry;
pub mod removal;
pub mod runtime;
pub mod services;
pub mod util;

pub use cgroup::{CgroupFs, CgroupLayout, CgroupPaths, CgroupReclaimer, HostCgroupFs};
pub use container::{Container, ContainerConfig, ContainerState, RemovalGuard, RunState};
pub use registry::{Event, EventLog, EventType, Registry};
pub use removal::{RemovalOutcome, RemovalRequest};
pub use runtime::options::{CgroupOptions, DaemonOptions, RetryOptions};
pub use runtime::layout::FilesystemLayout;
pub use runtime::types::{ContainerId, Seconds};
pub use runtime::{Daemon, DaemonBuilder};
pub use util::init_logging_for;

pub use teardown_shared::{ErrorKind, TeardownError, TeardownResult, TeardownStep};
