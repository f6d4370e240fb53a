use teardown_shared::errors::TeardownResult;

use crate::container::Container;

/// Volume store hook that detaches a container's mount points.
pub trait MountCleaner: Send + Sync {
    /// Unmount the container's volumes; delete anonymous volumes too when
    /// `remove_volume` is set.
    fn remove_mount_points(&self, container: &Container, remove_volume: bool)
    -> TeardownResult<()>;
}
