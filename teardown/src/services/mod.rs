//! Resource release collaborators.
//!
//! The teardown pipeline only sees these traits. Reference implementations
//! exist for process supervision, stats, state persistence and labels; the
//! layer store, mount cleaner, volume store and network are always supplied
//! by the daemon.

pub mod labels;
pub mod layer;
pub mod mounts;
pub mod network;
pub mod persist;
pub mod stats;
pub mod supervisor;
pub mod volumes;

use std::sync::Arc;

pub use labels::{LabelPool, SecurityLabels};
pub use layer::{LayerHandle, LayerMetadata, LayerStore};
pub use mounts::MountCleaner;
pub use network::NetworkUpdater;
pub use persist::{JsonStateStore, StateStore};
pub use stats::{StatsCollector, StatsRegistry};
pub use supervisor::{ProcessSupervisor, SignalSupervisor};
pub use volumes::{Volume, VolumeStore};

use crate::cgroup::CgroupFs;

/// Every collaborator the pipeline calls into.
#[derive(Clone)]
pub struct Services {
    pub supervisor: Arc<dyn ProcessSupervisor>,
    pub stats: Arc<dyn StatsCollector>,
    pub state_store: Arc<dyn StateStore>,
    pub layers: Arc<dyn LayerStore>,
    pub mounts: Arc<dyn MountCleaner>,
    pub volumes: Arc<dyn VolumeStore>,
    pub network: Arc<dyn NetworkUpdater>,
    pub labels: Arc<dyn SecurityLabels>,
    pub cgroup_fs: Arc<dyn CgroupFs>,
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("layer_driver", &self.layers.driver_name())
            .finish_non_exhaustive()
    }
}
