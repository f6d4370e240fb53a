use teardown_shared::errors::TeardownResult;

use crate::container::Container;

/// Refreshes a container's network configuration after its links change.
pub trait NetworkUpdater: Send + Sync {
    fn update_network(&self, container: &Container) -> TeardownResult<()>;
}
