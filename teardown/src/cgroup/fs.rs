use std::io;
use std::path::Path;

/// Filesystem operations the reclaimer needs on a cgroup hierarchy.
pub trait CgroupFs: Send + Sync {
    /// Recursively delete `path`.
    ///
    /// The result is informational only: cgroupfs reports errors even for
    /// removals that took effect, so callers confirm with [`exists`].
    ///
    /// [`exists`]: CgroupFs::exists
    fn remove_all(&self, path: &Path) -> io::Result<()>;

    fn exists(&self, path: &Path) -> bool;
}

/// [`CgroupFs`] backed by the host filesystem.
///
/// Cgroup directories cannot be unlinked file by file; only empty groups can
/// be `rmdir`ed. Child groups are removed depth-first, and the control files
/// inside each group vanish with it.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostCgroupFs;

impl HostCgroupFs {
    fn remove_group(path: &Path) -> io::Result<()> {
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                Self::remove_group(&entry.path())?;
            }
        }
        match std::fs::remove_dir(path) {
            Ok(()) => Ok(()),
            // Outside cgroupfs (or in tests) plain files block rmdir.
            Err(_) => std::fs::remove_dir_all(path),
        }
    }
}

impl CgroupFs for HostCgroupFs {
    fn remove_all(&self, path: &Path) -> io::Result<()> {
        match Self::remove_group(path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }

    fn exists(&self, path: &Path) -> bool {
        // symlink_metadata: a dangling entry still counts as present.
        std::fs::symlink_metadata(path).is_ok()
    }
}
