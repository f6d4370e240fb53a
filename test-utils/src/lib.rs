//! Test doubles for the teardown pipeline.
//!
//! Every collaborator trait has a fake here that records what it was asked
//! to do and can be told to fail. [`TestDaemon`] wires them into a daemon
//! rooted in a temporary directory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tempfile::TempDir;
use teardown::cgroup::CgroupFs;
use teardown::services::{
    LabelPool, LayerHandle, LayerMetadata, LayerStore, MountCleaner, NetworkUpdater,
    ProcessSupervisor, StatsCollector, Volume, VolumeStore,
};
use teardown::{CgroupLayout, Container, ContainerId, Daemon, DaemonOptions};
use teardown_shared::errors::{TeardownError, TeardownResult};

// ============================================================================
// PROCESS SUPERVISOR
// ============================================================================

/// Supervisor that only flips container state.
///
/// Tracks how many `stop` calls overlap so tests can detect two teardowns of
/// the same container running at once.
#[derive(Debug, Default)]
pub struct FakeSupervisor {
    kills: AtomicUsize,
    stops: AtomicUsize,
    active_stops: AtomicUsize,
    max_active_stops: AtomicUsize,
    fail_kill: AtomicBool,
    fail_stop: AtomicBool,
    stop_delay: Mutex<Duration>,
}

impl FakeSupervisor {
    pub fn kills(&self) -> usize {
        self.kills.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    /// Highest number of `stop` calls observed in flight at once.
    pub fn max_concurrent_stops(&self) -> usize {
        self.max_active_stops.load(Ordering::SeqCst)
    }

    pub fn fail_kill(&self, fail: bool) {
        self.fail_kill.store(fail, Ordering::SeqCst);
    }

    pub fn fail_stop(&self, fail: bool) {
        self.fail_stop.store(fail, Ordering::SeqCst);
    }

    /// Make every `stop` take `delay` before returning.
    pub fn set_stop_delay(&self, delay: Duration) {
        *self.stop_delay.lock() = delay;
    }
}

#[async_trait]
impl ProcessSupervisor for FakeSupervisor {
    fn is_running(&self, container: &Container) -> bool {
        container.is_running()
    }

    async fn kill(&self, container: &Container) -> TeardownResult<()> {
        self.kills.fetch_add(1, Ordering::SeqCst);
        if self.fail_kill.load(Ordering::SeqCst) {
            return Err(TeardownError::Internal(format!(
                "cannot kill container {}",
                container.id()
            )));
        }
        container.update_state(|s| s.set_stopped(137));
        Ok(())
    }

    async fn stop(&self, container: &Container, _grace: Duration) -> TeardownResult<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        let active = self.active_stops.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active_stops.fetch_max(active, Ordering::SeqCst);

        let delay = *self.stop_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.active_stops.fetch_sub(1, Ordering::SeqCst);

        if self.fail_stop.load(Ordering::SeqCst) {
            return Err(TeardownError::Internal(format!(
                "cannot stop container {}",
                container.id()
            )));
        }
        if container.is_running() {
            container.update_state(|s| s.set_stopped(0));
        }
        Ok(())
    }
}

// ============================================================================
// STATS
// ============================================================================

#[derive(Debug, Default)]
pub struct FakeStats {
    stopped: Mutex<Vec<ContainerId>>,
}

impl FakeStats {
    pub fn stopped(&self) -> Vec<ContainerId> {
        self.stopped.lock().clone()
    }
}

impl StatsCollector for FakeStats {
    fn stop_collection(&self, container: &Container) {
        self.stopped.lock().push(container.id().clone());
    }
}

// ============================================================================
// LAYER STORE
// ============================================================================

/// How [`FakeLayerStore`] fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerFailure {
    MountNotExist,
    Busy,
    Storage,
}

#[derive(Debug, Default)]
pub struct FakeLayerStore {
    released: Mutex<Vec<LayerHandle>>,
    failure: Mutex<Option<LayerFailure>>,
}

impl FakeLayerStore {
    pub const DRIVER: &'static str = "overlay2";

    pub fn released(&self) -> Vec<LayerHandle> {
        self.released.lock().clone()
    }

    pub fn fail_with(&self, failure: Option<LayerFailure>) {
        *self.failure.lock() = failure;
    }
}

impl LayerStore for FakeLayerStore {
    fn driver_name(&self) -> &str {
        Self::DRIVER
    }

    fn release_rw_layer(&self, handle: &LayerHandle) -> TeardownResult<Vec<LayerMetadata>> {
        match *self.failure.lock() {
            Some(LayerFailure::MountNotExist) => return Err(TeardownError::MountNotExist),
            Some(LayerFailure::Busy) => {
                return Err(TeardownError::ResourceBusy(format!("{} is mounted", handle)));
            }
            Some(LayerFailure::Storage) => {
                return Err(TeardownError::Storage(format!("{} is corrupt", handle)));
            }
            None => {}
        }

        self.released.lock().push(handle.clone());
        Ok(vec![LayerMetadata {
            chain_id: format!("sha256:{}", handle),
            diff_id: format!("sha256:{}-diff", handle),
            size: 4096,
            diff_size: 1024,
        }])
    }
}

// ============================================================================
// MOUNTS & NETWORK
// ============================================================================

#[derive(Debug, Default)]
pub struct FakeMounts {
    calls: Mutex<Vec<(ContainerId, bool)>>,
    fail: AtomicBool,
}

impl FakeMounts {
    /// `(container, remove_volume)` for every call, in order.
    pub fn calls(&self) -> Vec<(ContainerId, bool)> {
        self.calls.lock().clone()
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

impl MountCleaner for FakeMounts {
    fn remove_mount_points(&self, container: &Container, remove_volume: bool) -> TeardownResult<()> {
        self.calls
            .lock()
            .push((container.id().clone(), remove_volume));
        if self.fail.load(Ordering::SeqCst) {
            return Err(TeardownError::Storage("volume in use".into()));
        }
        Ok(())
    }
}

/// How [`FakeVolumes::remove`](VolumeStore::remove) should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeFailure {
    /// Report a generic storage error.
    Storage,
}

/// Named volumes keyed by name, with a reference count per volume.
#[derive(Debug, Default)]
pub struct FakeVolumes {
    volumes: Mutex<HashMap<String, (Volume, usize)>>,
    removed: Mutex<Vec<String>>,
    fail_with: Mutex<Option<VolumeFailure>>,
}

impl FakeVolumes {
    pub fn add(&self, name: &str, driver: &str) {
        self.volumes
            .lock()
            .insert(name.to_string(), (Volume::new(name, driver), 0));
    }

    /// Mark the volume as referenced by one more container.
    pub fn reference(&self, name: &str) {
        if let Some((_, refs)) = self.volumes.lock().get_mut(name) {
            *refs += 1;
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.volumes.lock().contains_key(name)
    }

    pub fn removed(&self) -> Vec<String> {
        self.removed.lock().clone()
    }

    pub fn fail_with(&self, failure: Option<VolumeFailure>) {
        *self.fail_with.lock() = failure;
    }
}

impl VolumeStore for FakeVolumes {
    fn get(&self, name: &str) -> TeardownResult<Volume> {
        self.volumes
            .lock()
            .get(name)
            .map(|(volume, _)| volume.clone())
            .ok_or_else(|| TeardownError::NotFound(format!("no such volume: {}", name)))
    }

    fn remove(&self, volume: &Volume) -> TeardownResult<()> {
        if let Some(VolumeFailure::Storage) = *self.fail_with.lock() {
            return Err(TeardownError::Storage("driver returned EIO".into()));
        }

        let mut volumes = self.volumes.lock();
        match volumes.get(&volume.name) {
            Some((_, refs)) if *refs > 0 => Err(TeardownError::InUse(format!(
                "volume {} is referenced by {} container(s)",
                volume.name, refs
            ))),
            Some(_) => {
                volumes.remove(&volume.name);
                self.removed.lock().push(volume.name.clone());
                Ok(())
            }
            None => Err(TeardownError::NotFound(format!(
                "no such volume: {}",
                volume.name
            ))),
        }
    }
}

#[derive(Debug, Default)]
pub struct FakeNetwork {
    updated: Mutex<Vec<ContainerId>>,
    fail: AtomicBool,
}

impl FakeNetwork {
    pub fn updated(&self) -> Vec<ContainerId> {
        self.updated.lock().clone()
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

impl NetworkUpdater for FakeNetwork {
    fn update_network(&self, container: &Container) -> TeardownResult<()> {
        self.updated.lock().push(container.id().clone());
        if self.fail.load(Ordering::SeqCst) {
            return Err(TeardownError::Internal("network controller unavailable".into()));
        }
        Ok(())
    }
}

// ============================================================================
// CGROUP FILESYSTEM
// ============================================================================

/// In-memory cgroup tree.
///
/// Each path needs a configured number of `remove_all` calls before it
/// disappears; `u32::MAX` never does.
#[derive(Debug, Default)]
pub struct FakeCgroupFs {
    remaining: Mutex<HashMap<PathBuf, u32>>,
    removals: AtomicUsize,
}

impl FakeCgroupFs {
    pub const STUBBORN: u32 = u32::MAX;

    pub fn insert(&self, path: impl Into<PathBuf>, removals_needed: u32) {
        self.remaining.lock().insert(path.into(), removals_needed);
    }

    pub fn removals(&self) -> usize {
        self.removals.load(Ordering::SeqCst)
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<_> = self.remaining.lock().keys().cloned().collect();
        paths.sort();
        paths
    }
}

impl CgroupFs for FakeCgroupFs {
    fn remove_all(&self, path: &Path) -> std::io::Result<()> {
        self.removals.fetch_add(1, Ordering::SeqCst);
        let mut remaining = self.remaining.lock();
        let Some(left) = remaining.get_mut(path) else {
            return Ok(());
        };
        if *left == Self::STUBBORN {
            return Err(std::io::Error::from_raw_os_error(16)); // EBUSY
        }
        *left = left.saturating_sub(1);
        if *left == 0 {
            remaining.remove(path);
        }
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.remaining.lock().contains_key(path)
    }
}

// ============================================================================
// DAEMON FIXTURE
// ============================================================================

/// A daemon in a temp home with every collaborator faked.
pub struct TestDaemon {
    pub daemon: Daemon,
    pub supervisor: Arc<FakeSupervisor>,
    pub stats: Arc<FakeStats>,
    pub layers: Arc<FakeLayerStore>,
    pub mounts: Arc<FakeMounts>,
    pub volumes: Arc<FakeVolumes>,
    pub network: Arc<FakeNetwork>,
    pub labels: Arc<LabelPool>,
    pub cgroups: Arc<FakeCgroupFs>,
    pub cgroup_layout: CgroupLayout,
    _home: TempDir,
}

impl TestDaemon {
    pub fn new() -> Self {
        Self::with_options(|_| {})
    }

    /// Build with options tweaked by `configure` after the temp home is set.
    pub fn with_options(configure: impl FnOnce(&mut DaemonOptions)) -> Self {
        let home = TempDir::new().expect("Failed to create temp dir");
        let mut options = DaemonOptions {
            home_dir: home.path().to_path_buf(),
            ..Default::default()
        };
        options.cgroup.root = home.path().join("cgroup");
        configure(&mut options);

        let supervisor = Arc::new(FakeSupervisor::default());
        let stats = Arc::new(FakeStats::default());
        let layers = Arc::new(FakeLayerStore::default());
        let mounts = Arc::new(FakeMounts::default());
        let volumes = Arc::new(FakeVolumes::default());
        let network = Arc::new(FakeNetwork::default());
        let labels = Arc::new(LabelPool::new());
        let cgroups = Arc::new(FakeCgroupFs::default());
        let cgroup_layout = CgroupLayout::from_options(&options.cgroup);

        let daemon = Daemon::builder(options)
            .supervisor(supervisor.clone())
            .stats(stats.clone())
            .layers(layers.clone())
            .mounts(mounts.clone())
            .volumes(volumes.clone())
            .network(network.clone())
            .labels(labels.clone())
            .cgroup_fs(cgroups.clone())
            .build()
            .expect("Failed to build daemon");

        Self {
            daemon,
            supervisor,
            stats,
            layers,
            mounts,
            volumes,
            network,
            labels,
            cgroups,
            cgroup_layout,
            _home: home,
        }
    }

    /// Register a stopped container with a root directory, a writable
    /// layer, a reserved label and one cgroup per subsystem.
    pub fn create(&self, name: &str) -> Arc<Container> {
        let config = self.daemon.container_config(name);
        let short = config.id.short().to_string();
        let label = format!("label-{}", short);
        let config = config
            .with_image("alpine:3.20")
            .with_rw_layer(LayerHandle::new(format!("layer-{}", short)))
            .with_process_label(label.clone());

        std::fs::create_dir_all(&config.root).expect("Failed to create container root");
        std::fs::write(config.root.join("config.json"), "{}").expect("Failed to write config");
        self.labels.reserve(&label).expect("Failed to reserve label");

        let container = Container::new(config);
        self.add_cgroups(&container, 1);
        self.daemon
            .register(container.clone())
            .expect("Failed to register container");
        container
    }

    /// Like [`create`](Self::create) but with a running process.
    pub fn create_running(&self, name: &str) -> Arc<Container> {
        let container = self.create(name);
        container.update_state(|s| s.set_running(4242));
        container
    }

    /// Give every cgroup of `container` the number of removals it needs.
    pub fn add_cgroups(&self, container: &Container, removals_needed: u32) {
        let paths = self
            .cgroup_layout
            .resolve(container.id())
            .expect("Failed to resolve cgroup paths");
        for path in paths.into_values() {
            self.cgroups.insert(path, removals_needed);
        }
    }

    /// Make one subsystem's cgroup of `container` impossible to remove.
    pub fn pin_cgroup(&self, container: &Container, subsystem: &str) -> PathBuf {
        let paths = self
            .cgroup_layout
            .resolve(container.id())
            .expect("Failed to resolve cgroup paths");
        let path = paths
            .get(subsystem)
            .cloned()
            .unwrap_or_else(|| panic!("no {} subsystem", subsystem));
        self.cgroups.insert(path.clone(), FakeCgroupFs::STUBBORN);
        path
    }

    pub fn is_registered(&self, container: &Container) -> bool {
        self.daemon.registry().containers.contains(container.id())
    }
}

impl Default for TestDaemon {
    fn default() -> Self {
        Self::new()
    }
}
