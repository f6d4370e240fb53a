//! Cgroup reclamation.
//!
//! - [`CgroupLayout`]: where a container's cgroups live (fixed table or
//!   discovered hierarchies)
//! - [`CgroupReclaimer`]: delete-and-probe loop with doubling backoff
//! - [`CgroupFs`]: filesystem seam, [`HostCgroupFs`] on real hosts

mod fs;
mod paths;
mod reclaim;

pub use fs::{CgroupFs, HostCgroupFs};
pub use paths::{CgroupLayout, CgroupPaths, SubsystemSource};
pub use reclaim::CgroupReclaimer;
