//! Cgroup path resolution.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use teardown_shared::errors::{TeardownError, TeardownResult};

use crate::runtime::constants::cgroup as cgroup_const;
use crate::runtime::options::CgroupOptions;
use crate::runtime::types::ContainerId;

/// Concrete subsystem → directory mapping for one container.
///
/// Ordered so error messages and logs are stable.
pub type CgroupPaths = BTreeMap<String, PathBuf>;

/// How the subsystem set is obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubsystemSource {
    /// Fixed list of subsystem directory names.
    Static(Vec<String>),
    /// Scan the cgroup root on every resolve.
    Discover,
}

/// Template for a container's cgroup directories:
/// `{root}/{subsystem}/{parent}/{container_id}`.
#[derive(Debug, Clone)]
pub struct CgroupLayout {
    root: PathBuf,
    parent: String,
    source: SubsystemSource,
}

impl CgroupLayout {
    pub fn new(root: impl Into<PathBuf>, parent: impl Into<String>, source: SubsystemSource) -> Self {
        Self {
            root: root.into(),
            parent: parent.into(),
            source,
        }
    }

    /// Layout over the default v1 subsystem table.
    pub fn with_default_subsystems(root: impl Into<PathBuf>, parent: impl Into<String>) -> Self {
        let subsystems = cgroup_const::SUBSYSTEMS
            .iter()
            .map(|s| s.to_string())
            .collect();
        Self::new(root, parent, SubsystemSource::Static(subsystems))
    }

    pub fn from_options(options: &CgroupOptions) -> Self {
        if options.discover {
            Self::new(&options.root, &options.parent, SubsystemSource::Discover)
        } else {
            Self::with_default_subsystems(&options.root, &options.parent)
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve the directories for `id`.
    pub fn resolve(&self, id: &ContainerId) -> TeardownResult<CgroupPaths> {
        let paths = match &self.source {
            SubsystemSource::Static(subsystems) => subsystems
                .iter()
                .map(|s| (s.clone(), self.path_for(Some(s.as_str()), id)))
                .collect(),
            SubsystemSource::Discover => self.discover(id)?,
        };
        Ok(paths)
    }

    fn path_for(&self, subsystem: Option<&str>, id: &ContainerId) -> PathBuf {
        let mut path = self.root.clone();
        if let Some(subsystem) = subsystem {
            path.push(subsystem);
        }
        path.push(&self.parent);
        path.push(id.as_str());
        path
    }

    /// Unified hierarchy: one entry rooted directly at `root`. Otherwise
    /// every directory under `root` is a mounted v1 hierarchy; symlinked
    /// aliases (`cpu` → `cpu,cpuacct`) are skipped.
    fn discover(&self, id: &ContainerId) -> TeardownResult<CgroupPaths> {
        let mut paths = CgroupPaths::new();

        if self.root.join(cgroup_const::UNIFIED_MARKER).exists() {
            paths.insert(cgroup_const::UNIFIED.to_string(), self.path_for(None, id));
            return Ok(paths);
        }

        let entries = std::fs::read_dir(&self.root).map_err(|e| {
            TeardownError::Cgroup(format!(
                "failed to scan cgroup root {}: {}",
                self.root.display(),
                e
            ))
        })?;

        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let path = self.path_for(Some(name.as_str()), id);
            paths.insert(name, path);
        }

        tracing::trace!(root = %self.root.display(), count = paths.len(), "Discovered cgroup hierarchies");
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_static_layout_resolves_every_subsystem() {
        let layout = CgroupLayout::with_default_subsystems("/sys/fs/cgroup", "docker");
        let id = ContainerId::new();
        let paths = layout.resolve(&id).unwrap();

        assert_eq!(paths.len(), cgroup_const::SUBSYSTEMS.len());
        assert_eq!(
            paths["memory"],
            PathBuf::from("/sys/fs/cgroup/memory/docker").join(id.as_str())
        );
        assert_eq!(
            paths["cpu,cpuacct"],
            PathBuf::from("/sys/fs/cgroup/cpu,cpuacct/docker").join(id.as_str())
        );
        assert!(paths.contains_key("net_cls,net_prio"));
        assert!(paths.contains_key("systemd"));
    }

    #[test]
    fn test_discover_v1_hierarchies() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("memory")).unwrap();
        std::fs::create_dir(temp.path().join("cpu,cpuacct")).unwrap();
        std::os::unix::fs::symlink(temp.path().join("cpu,cpuacct"), temp.path().join("cpu")).unwrap();

        let layout = CgroupLayout::new(temp.path(), "docker", SubsystemSource::Discover);
        let id = ContainerId::new();
        let paths = layout.resolve(&id).unwrap();

        let keys: Vec<_> = paths.keys().cloned().collect();
        assert_eq!(keys, vec!["cpu,cpuacct".to_string(), "memory".to_string()]);
    }

    #[test]
    fn test_discover_unified_hierarchy() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("cgroup.controllers"), "cpu memory pids").unwrap();

        let layout = CgroupLayout::new(temp.path(), "docker", SubsystemSource::Discover);
        let id = ContainerId::new();
        let paths = layout.resolve(&id).unwrap();

        assert_eq!(paths.len(), 1);
        assert_eq!(paths["unified"], temp.path().join("docker").join(id.as_str()));
    }

    #[test]
    fn test_discover_missing_root_fails() {
        let layout = CgroupLayout::new("/nonexistent/cgroup/root", "docker", SubsystemSource::Discover);
        let err = layout.resolve(&ContainerId::new()).unwrap_err();
        assert!(err.to_string().contains("failed to scan"));
    }
}
