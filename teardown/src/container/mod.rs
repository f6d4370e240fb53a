//! Container record as held by the daemon's registry.
//!
//! - **Container**: immutable identity plus a lock-protected [`ContainerState`]
//! - **RunState**: status derived from the state flags and the removal lock
//! - **RemovalGuard**: scoped right to tear the container down

mod lock;
mod state;

pub use lock::RemovalGuard;
pub use state::{ContainerState, RunState};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::runtime::types::ContainerId;
use crate::services::layer::LayerHandle;

/// Creation-time attributes of a container.
#[derive(Debug, Clone)]
pub struct ContainerConfig {
    pub id: ContainerId,
    /// Canonical name; a leading `/` is added if missing.
    pub name: String,
    pub image: String,
    /// Private on-disk directory (state file, logs, mounts).
    pub root: PathBuf,
    /// Writable layer, absent when creation failed before allocation.
    pub rw_layer: Option<LayerHandle>,
    /// Security-context label released on destroy.
    pub process_label: String,
}

impl ContainerConfig {
    pub fn new(name: impl Into<String>, root: PathBuf) -> Self {
        Self {
            id: ContainerId::new(),
            name: name.into(),
            image: String::new(),
            root,
            rw_layer: None,
            process_label: String::new(),
        }
    }

    pub fn with_id(mut self, id: ContainerId) -> Self {
        self.id = id;
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    pub fn with_rw_layer(mut self, layer: LayerHandle) -> Self {
        self.rw_layer = Some(layer);
        self
    }

    pub fn with_process_label(mut self, label: impl Into<String>) -> Self {
        self.process_label = label.into();
        self
    }
}

/// A container tracked by the daemon.
///
/// Shared as `Arc<Container>`: the registry owns it, removal borrows it for
/// the duration of teardown.
#[derive(Debug)]
pub struct Container {
    id: ContainerId,
    name: String,
    image: String,
    root: PathBuf,
    rw_layer: Option<LayerHandle>,
    process_label: String,
    state: RwLock<ContainerState>,
    pub(crate) removal_in_progress: AtomicBool,
}

impl Container {
    pub fn new(config: ContainerConfig) -> Arc<Self> {
        Self::with_state(config, ContainerState::new())
    }

    /// Rebuild a container with previously persisted state.
    pub fn with_state(config: ContainerConfig, state: ContainerState) -> Arc<Self> {
        Arc::new(Self {
            id: config.id,
            name: canonical_name(&config.name),
            image: config.image,
            root: config.root,
            rw_layer: config.rw_layer,
            process_label: config.process_label,
            state: RwLock::new(state),
            removal_in_progress: AtomicBool::new(false),
        })
    }

    pub fn id(&self) -> &ContainerId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn rw_layer(&self) -> Option<&LayerHandle> {
        self.rw_layer.as_ref()
    }

    pub fn process_label(&self) -> &str {
        &self.process_label
    }

    pub fn run_state(&self) -> RunState {
        self.state.read().run_state(self.is_removal_in_progress())
    }

    /// Whether the process is recorded as running (paused/restarting included).
    pub fn is_running(&self) -> bool {
        self.state.read().running
    }

    pub fn pid(&self) -> Option<u32> {
        self.state.read().pid
    }

    /// Copy of the raw state.
    pub fn state(&self) -> ContainerState {
        self.state.read().clone()
    }

    /// Mutate the raw state under the write lock.
    pub fn update_state<R>(&self, f: impl FnOnce(&mut ContainerState) -> R) -> R {
        let mut state = self.state.write();
        f(&mut state)
    }

    pub fn set_dead(&self) {
        self.state.write().set_dead();
    }

    pub fn is_removal_in_progress(&self) -> bool {
        self.removal_in_progress.load(Ordering::SeqCst)
    }

    /// Take the removal right; `None` if a removal is already underway.
    pub fn try_begin_removal(self: &Arc<Self>) -> Option<RemovalGuard> {
        RemovalGuard::try_acquire(self)
    }

    /// Point-in-time view with the currently visible status.
    pub fn snapshot(&self) -> ContainerSnapshot {
        self.snapshot_with(self.is_removal_in_progress())
    }

    /// View written to disk. The removal lock lives only in memory, so a
    /// container persisted mid-removal is recorded as `dead`, not `removing`.
    pub fn persisted_snapshot(&self) -> ContainerSnapshot {
        self.snapshot_with(false)
    }

    fn snapshot_with(&self, removal_in_progress: bool) -> ContainerSnapshot {
        let state = self.state();
        ContainerSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            image: self.image.clone(),
            rw_layer: self.rw_layer.clone(),
            process_label: self.process_label.clone(),
            run_state: state.run_state(removal_in_progress),
            state,
        }
    }
}

/// Point-in-time persisted form of a [`Container`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerSnapshot {
    pub id: ContainerId,
    pub name: String,
    pub image: String,
    pub rw_layer: Option<LayerHandle>,
    pub process_label: String,
    pub run_state: RunState,
    pub state: ContainerState,
}

/// Prefix a name with `/` unless it already has one.
pub fn canonical_name(name: &str) -> String {
    if name.starts_with('/') {
        name.to_string()
    } else {
        format!("/{}", name)
    }
}

// Compile-time assertion: containers are shared across removal tasks.
const _: () = {
    const fn assert_send_sync<T: Send + Sync>() {}
    let _ = assert_send_sync::<Container>;
};
