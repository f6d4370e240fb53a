//! Daemon entry point and construction.

use std::sync::Arc;

use teardown_shared::errors::{TeardownError, TeardownResult};

use crate::cgroup::{CgroupFs, CgroupLayout, CgroupReclaimer, HostCgroupFs};
use crate::container::{Container, ContainerConfig, ContainerSnapshot};
use crate::registry::{EventLog, Registry};
use crate::removal::{Cleanup, Unregistrar};
use crate::runtime::layout::FilesystemLayout;
use crate::runtime::options::DaemonOptions;
use crate::runtime::types::ContainerId;
use crate::services::{
    JsonStateStore, LabelPool, LayerStore, MountCleaner, NetworkUpdater, ProcessSupervisor,
    SecurityLabels, Services, SignalSupervisor, StateStore, StatsCollector, StatsRegistry,
    VolumeStore,
};

// ============================================================================
// PUBLIC API
// ============================================================================

/// Owns the container registry and tears containers down.
///
/// **Cloning**: Daemon is cheaply cloneable via `Arc` - all clones share the
/// same registry and collaborators.
#[derive(Clone)]
pub struct Daemon {
    pub(crate) inner: DaemonInner,
}

/// Shared daemon state.
pub type DaemonInner = Arc<DaemonInnerImpl>;

/// Immutable after construction; every mutable piece carries its own lock.
pub struct DaemonInnerImpl {
    pub(crate) options: DaemonOptions,
    pub(crate) layout: FilesystemLayout,
    pub(crate) registry: Arc<Registry>,
    pub(crate) services: Services,
    pub(crate) cleanup: Cleanup,
}

// ============================================================================
// DAEMON IMPLEMENTATION
// ============================================================================

impl Daemon {
    pub fn builder(options: DaemonOptions) -> DaemonBuilder {
        DaemonBuilder::new(options)
    }

    pub fn options(&self) -> &DaemonOptions {
        &self.inner.options
    }

    pub fn layout(&self) -> &FilesystemLayout {
        &self.inner.layout
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    pub fn services(&self) -> &Services {
        &self.inner.services
    }

    pub fn events(&self) -> &EventLog {
        &self.inner.registry.events
    }

    /// Config for a new container whose root lives under this daemon's home.
    pub fn container_config(&self, name: &str) -> ContainerConfig {
        let id = ContainerId::new();
        let root = self.inner.layout.container_root(&id);
        ContainerConfig::new(name, root).with_id(id)
    }

    /// Make a container known to the daemon.
    pub fn register(&self, container: Arc<Container>) -> TeardownResult<()> {
        self.inner.registry.register(container)
    }

    /// Link `child` into `parent` under `alias`. Returns the full alias name.
    pub fn link(&self, parent: &str, alias: &str, child: &str) -> TeardownResult<String> {
        let parent = self.inner.registry.resolve(parent)?;
        let child = self.inner.registry.resolve(child)?;
        let full_name = self.inner.registry.link(&parent, alias, &child)?;

        tracing::debug!(
            parent = %parent.id(),
            child = %child.id(),
            name = %full_name,
            "Linked containers"
        );
        Ok(full_name)
    }

    /// Find a live container by name, full id, or unique id prefix.
    pub fn get(&self, name_or_id: &str) -> TeardownResult<Arc<Container>> {
        self.inner.registry.resolve(name_or_id)
    }

    pub fn exists(&self, name_or_id: &str) -> bool {
        self.get(name_or_id).is_ok()
    }

    /// Snapshots of every registered container, ordered by name.
    pub fn list(&self) -> Vec<ContainerSnapshot> {
        self.inner
            .registry
            .containers
            .list()
            .iter()
            .map(|c| c.snapshot())
            .collect()
    }
}

impl std::fmt::Debug for Daemon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Daemon")
            .field("home_dir", &self.inner.layout.home_dir())
            .field("containers", &self.inner.registry.containers.len())
            .finish()
    }
}

// ============================================================================
// BUILDER
// ============================================================================

/// Assembles a [`Daemon`] from options and collaborators.
///
/// The layer store, mount cleaner, volume store and network updater have
/// no local equivalent and must be supplied. Everything else falls back to the
/// host implementation.
pub struct DaemonBuilder {
    options: DaemonOptions,
    supervisor: Option<Arc<dyn ProcessSupervisor>>,
    stats: Option<Arc<dyn StatsCollector>>,
    state_store: Option<Arc<dyn StateStore>>,
    layers: Option<Arc<dyn LayerStore>>,
    mounts: Option<Arc<dyn MountCleaner>>,
    volumes: Option<Arc<dyn VolumeStore>>,
    network: Option<Arc<dyn NetworkUpdater>>,
    labels: Option<Arc<dyn SecurityLabels>>,
    cgroup_fs: Option<Arc<dyn CgroupFs>>,
}

impl DaemonBuilder {
    pub fn new(options: DaemonOptions) -> Self {
        Self {
            options,
            supervisor: None,
            stats: None,
            state_store: None,
            layers: None,
            mounts: None,
            volumes: None,
            network: None,
            labels: None,
            cgroup_fs: None,
        }
    }

    pub fn supervisor(mut self, supervisor: Arc<dyn ProcessSupervisor>) -> Self {
        self.supervisor = Some(supervisor);
        self
    }

    pub fn stats(mut self, stats: Arc<dyn StatsCollector>) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn state_store(mut self, state_store: Arc<dyn StateStore>) -> Self {
        self.state_store = Some(state_store);
        self
    }

    pub fn layers(mut self, layers: Arc<dyn LayerStore>) -> Self {
        self.layers = Some(layers);
        self
    }

    pub fn mounts(mut self, mounts: Arc<dyn MountCleaner>) -> Self {
        self.mounts = Some(mounts);
        self
    }

    pub fn volumes(mut self, volumes: Arc<dyn VolumeStore>) -> Self {
        self.volumes = Some(volumes);
        self
    }

    pub fn network(mut self, network: Arc<dyn NetworkUpdater>) -> Self {
        self.network = Some(network);
        self
    }

    pub fn labels(mut self, labels: Arc<dyn SecurityLabels>) -> Self {
        self.labels = Some(labels);
        self
    }

    pub fn cgroup_fs(mut self, cgroup_fs: Arc<dyn CgroupFs>) -> Self {
        self.cgroup_fs = Some(cgroup_fs);
        self
    }

    /// Validate options, prepare the home directory and wire everything up.
    pub fn build(self) -> TeardownResult<Daemon> {
        self.options.validate()?;

        let layout = FilesystemLayout::new(self.options.home_dir.clone());
        layout.prepare()?;

        let services = Services {
            supervisor: self
                .supervisor
                .unwrap_or_else(|| Arc::new(SignalSupervisor::new())),
            stats: self.stats.unwrap_or_else(|| Arc::new(StatsRegistry::new())),
            state_store: self
                .state_store
                .unwrap_or_else(|| Arc::new(JsonStateStore::new())),
            layers: self.layers.ok_or_else(|| missing("layer store"))?,
            mounts: self.mounts.ok_or_else(|| missing("mount cleaner"))?,
            volumes: self.volumes.ok_or_else(|| missing("volume store"))?,
            network: self.network.ok_or_else(|| missing("network updater"))?,
            labels: self.labels.unwrap_or_else(|| Arc::new(LabelPool::new())),
            cgroup_fs: self.cgroup_fs.unwrap_or_else(|| Arc::new(HostCgroupFs)),
        };

        let registry = Arc::new(Registry::new(self.options.event_history));
        let unregistrar = Unregistrar::new(registry.clone(), services.labels.clone());
        let reclaimer = CgroupReclaimer::new(services.cgroup_fs.clone(), self.options.reclaim.clone());
        let cleanup = Cleanup::new(
            services.clone(),
            unregistrar,
            Arc::new(CgroupLayout::from_options(&self.options.cgroup)),
            Arc::new(reclaimer),
            self.options.stop_timeout.as_duration(),
        );

        tracing::debug!(
            home_dir = %layout.home_dir().display(),
            cgroup_root = %self.options.cgroup.root.display(),
            "Initialized daemon"
        );

        Ok(Daemon {
            inner: Arc::new(DaemonInnerImpl {
                options: self.options,
                layout,
                registry,
                services,
                cleanup,
            }),
        })
    }
}

fn missing(what: &str) -> TeardownError {
    TeardownError::InvalidArgument(format!("daemon requires a {}", what))
}

// Compile-time assertions
const _: () = {
    const fn assert_send_sync<T: Send + Sync>() {}
    let _ = assert_send_sync::<Daemon>;
};
