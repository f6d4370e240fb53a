//! Integration tests for container removal (Daemon::remove).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use teardown::services::{JsonStateStore, ProcessSupervisor, SecurityLabels, StateStore};
use teardown::{
    Container, ContainerId, Daemon, DaemonOptions, ErrorKind, RemovalRequest, RunState,
    TeardownResult, TeardownStep,
};
use teardown_test_utils::{
    FakeCgroupFs, FakeLayerStore, FakeMounts, FakeNetwork, FakeVolumes, LayerFailure, TestDaemon,
};

const DESTROY: &str = "destroy";

fn strict() -> RemovalRequest {
    RemovalRequest::default()
}

fn forced() -> RemovalRequest {
    RemovalRequest::default().force()
}

/// Leave the container registered and dead after a failed strict removal.
fn assert_preserved(t: &TestDaemon, container: &Container) {
    assert!(t.is_registered(container), "container should stay registered");
    assert_eq!(container.run_state(), RunState::Dead);
    assert!(!container.is_removal_in_progress());
    assert_eq!(t.daemon.events().count(container.id(), DESTROY), 0);
}

fn assert_gone(t: &TestDaemon, container: &Container) {
    assert!(!t.is_registered(container));
    assert!(t.daemon.get(container.name()).unwrap_err().is_not_found());
    assert!(t.daemon.get(container.id().as_str()).unwrap_err().is_not_found());
    assert_eq!(t.daemon.events().count(container.id(), DESTROY), 1);
}

// ============================================================================
// SUCCESSFUL REMOVAL
// ============================================================================

#[tokio::test]
async fn remove_stopped_container_releases_everything() {
    let t = TestDaemon::new();
    let web = t.create("web");
    let root = web.root().to_path_buf();
    assert!(root.exists());

    t.daemon.remove("web", strict()).await.unwrap();

    assert_gone(&t, &web);
    assert!(!root.exists());
    assert_eq!(t.layers.released(), vec![web.rw_layer().unwrap().clone()]);
    assert_eq!(t.stats.stopped(), vec![web.id().clone()]);
    assert_eq!(t.supervisor.stops(), 1);
    assert_eq!(t.supervisor.kills(), 0);
    assert_eq!(t.mounts.calls(), vec![(web.id().clone(), false)]);
    assert!(t.cgroups.paths().is_empty());
    assert!(!t.labels.is_reserved(web.process_label()));
    assert!(t.daemon.list().is_empty());
}

#[tokio::test]
async fn remove_by_id_prefix() {
    let t = TestDaemon::new();
    let web = t.create("web");

    t.daemon.remove(web.id().short(), strict()).await.unwrap();
    assert_gone(&t, &web);
}

#[tokio::test]
async fn remove_forwards_volume_flag() {
    let t = TestDaemon::new();
    let web = t.create("web");

    t.daemon
        .remove("web", strict().with_volumes())
        .await
        .unwrap();
    assert_eq!(t.mounts.calls(), vec![(web.id().clone(), true)]);
}

#[tokio::test]
async fn remove_without_layer_or_root() {
    let t = TestDaemon::new();
    let config = t.daemon.container_config("bare");
    let bare = Container::new(config);
    t.daemon.register(bare.clone()).unwrap();

    t.daemon.remove("bare", strict()).await.unwrap();
    assert_gone(&t, &bare);
    assert!(t.layers.released().is_empty());
}

#[tokio::test]
async fn mount_cleanup_failure_is_not_reported() {
    let t = TestDaemon::new();
    let web = t.create("web");
    t.mounts.fail(true);

    t.daemon.remove("web", strict()).await.unwrap();
    assert_gone(&t, &web);
}

#[tokio::test]
async fn unmounted_layer_counts_as_released() {
    let t = TestDaemon::new();
    let web = t.create("web");
    t.layers.fail_with(Some(LayerFailure::MountNotExist));

    t.daemon.remove("web", strict()).await.unwrap();
    assert_gone(&t, &web);
}

#[tokio::test]
async fn remove_unknown_container() {
    let t = TestDaemon::new();
    let err = t.daemon.remove("ghost", strict()).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(t.mounts.calls().is_empty());
}

// ============================================================================
// RUNNING CONTAINERS
// ============================================================================

#[tokio::test]
async fn strict_removal_of_running_container_conflicts() {
    let t = TestDaemon::new();
    let web = t.create_running("web");

    let err = t.daemon.remove("web", strict()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert!(err.to_string().contains(&format!(
        "you cannot remove a running container {}. Stop the container before attempting removal or force remove",
        web.id()
    )));
    assert!(t.is_registered(&web));
    assert_eq!(web.run_state(), RunState::Running);
    assert!(web.root().exists());
    assert_eq!(t.supervisor.kills(), 0);
    assert_eq!(t.supervisor.stops(), 0);
    assert!(t.mounts.calls().is_empty());
    assert!(!web.is_removal_in_progress());
}

#[tokio::test]
async fn strict_then_forced_removal_of_running_container() {
    let t = TestDaemon::new();
    let c1 = t.create_running("c1");

    let err = t.daemon.remove("c1", strict()).await.unwrap_err();
    assert!(err.is_conflict());
    assert!(t.is_registered(&c1));

    t.daemon.remove("c1", forced()).await.unwrap();

    assert_eq!(t.supervisor.kills(), 1);
    assert_eq!(t.supervisor.stops(), 1);
    assert_gone(&t, &c1);
    assert_eq!(t.daemon.events().history().len(), 1);
}

#[tokio::test]
async fn kill_failure_keeps_container_even_when_forced() {
    let t = TestDaemon::new();
    let web = t.create_running("web");
    t.supervisor.fail_kill(true);

    let err = t.daemon.remove("web", forced()).await.unwrap_err();

    assert_eq!(err.failed_step(), Some(TeardownStep::Kill));
    assert!(t.is_registered(&web));
    assert_eq!(web.run_state(), RunState::Running);
    assert!(web.root().exists());
    assert!(!web.is_removal_in_progress());
}

#[tokio::test]
async fn stop_failure_keeps_container() {
    let t = TestDaemon::new();
    let web = t.create("web");
    t.supervisor.fail_stop(true);

    let err = t.daemon.remove("web", strict()).await.unwrap_err();

    assert_eq!(err.failed_step(), Some(TeardownStep::Stop));
    assert!(err.is_retryable());
    assert!(t.is_registered(&web));
    assert!(web.root().exists());
    assert!(t.mounts.calls().is_empty());
}

// ============================================================================
// PARTIAL FAILURES
// ============================================================================

/// Replace the container root with a plain file so deleting it fails.
fn break_root(container: &Container) {
    std::fs::remove_dir_all(container.root()).unwrap();
    std::fs::write(container.root(), "not a directory").unwrap();
}

#[tokio::test]
async fn strict_removal_preserves_container_when_root_delete_fails() {
    let t = TestDaemon::new();
    let web = t.create("web");
    break_root(&web);

    let err = t.daemon.remove("web", strict()).await.unwrap_err();

    assert_eq!(err.failed_step(), Some(TeardownStep::RemoveRoot));
    assert_eq!(err.kind(), ErrorKind::Storage);
    assert_preserved(&t, &web);
    assert!(t.layers.released().is_empty());
    assert!(t.mounts.calls().is_empty());
    assert!(t.labels.is_reserved(web.process_label()));
}

#[tokio::test]
async fn forced_removal_unregisters_when_root_delete_fails() {
    let t = TestDaemon::new();
    let web = t.create("web");
    break_root(&web);

    let err = t.daemon.remove("web", forced()).await.unwrap_err();

    assert_eq!(err.failed_step(), Some(TeardownStep::RemoveRoot));
    assert_gone(&t, &web);
    assert_eq!(t.mounts.calls().len(), 1);
}

#[tokio::test]
async fn busy_layer_is_retryable_and_names_driver() {
    let t = TestDaemon::new();
    let web = t.create("web");
    t.layers.fail_with(Some(LayerFailure::Busy));

    let err = t.daemon.remove("web", strict()).await.unwrap_err();

    assert_eq!(err.failed_step(), Some(TeardownStep::ReleaseLayer));
    assert_eq!(err.kind(), ErrorKind::ResourceBusy);
    assert!(err.is_retryable());
    let message = err.to_string();
    assert!(message.contains(FakeLayerStore::DRIVER), "{message}");
    assert!(message.contains(web.id().as_str()), "{message}");
    assert_preserved(&t, &web);

    // Once the layer frees up the same container can be removed.
    t.layers.fail_with(None);
    t.daemon.remove("web", strict()).await.unwrap();
    assert_gone(&t, &web);
}

#[tokio::test]
async fn forced_removal_unregisters_when_layer_release_fails() {
    let t = TestDaemon::new();
    let web = t.create("web");
    t.layers.fail_with(Some(LayerFailure::Storage));

    let err = t.daemon.remove("web", forced()).await.unwrap_err();

    assert_eq!(err.failed_step(), Some(TeardownStep::ReleaseLayer));
    assert_gone(&t, &web);
}

#[tokio::test(start_paused = true)]
async fn pinned_cgroup_fails_after_retries() {
    let t = TestDaemon::new();
    let web = t.create("web");
    let pinned = t.pin_cgroup(&web, "memory");

    let started = tokio::time::Instant::now();
    let err = t.daemon.remove("web", strict()).await.unwrap_err();

    assert_eq!(started.elapsed(), Duration::from_millis(150));
    assert_eq!(err.failed_step(), Some(TeardownStep::ReclaimCgroups));
    assert_eq!(err.kind(), ErrorKind::Cgroup);
    assert!(err.to_string().contains(&pinned.display().to_string()));
    assert_eq!(t.cgroups.paths(), vec![pinned.clone()]);
    assert_preserved(&t, &web);

    // The kernel lets go; a retry finishes the job.
    t.cgroups.insert(pinned, 1);
    t.daemon.remove("web", strict()).await.unwrap();
    assert_gone(&t, &web);
}

#[tokio::test(start_paused = true)]
async fn slow_cgroups_converge_within_retries() {
    let t = TestDaemon::new();
    let web = t.create("web");
    t.add_cgroups(&web, 3);

    let started = tokio::time::Instant::now();
    t.daemon.remove("web", strict()).await.unwrap();

    // 10ms + 20ms of backoff before the third round.
    assert_eq!(started.elapsed(), Duration::from_millis(30));
    assert!(t.cgroups.paths().is_empty());
    assert_gone(&t, &web);
}

// ============================================================================
// PERSISTENCE
// ============================================================================

/// Writes real state files and records the run state read back from disk.
#[derive(Default)]
struct RecordingStore {
    inner: JsonStateStore,
    persisted: Mutex<Vec<(ContainerId, RunState)>>,
}

impl StateStore for RecordingStore {
    fn persist(&self, container: &Container) -> TeardownResult<()> {
        self.inner.persist(container)?;
        let on_disk = JsonStateStore::load(container.root())?;
        self.persisted
            .lock()
            .push((on_disk.id, on_disk.run_state));
        Ok(())
    }
}

#[tokio::test]
async fn dead_state_is_persisted_before_unregistration() {
    let home = tempfile::TempDir::new().unwrap();
    let mut options = DaemonOptions {
        home_dir: home.path().to_path_buf(),
        ..Default::default()
    };
    options.cgroup.root = home.path().join("cgroup");

    let store = Arc::new(RecordingStore::default());
    let daemon = Daemon::builder(options)
        .supervisor(Arc::new(teardown_test_utils::FakeSupervisor::default()))
        .state_store(store.clone())
        .layers(Arc::new(FakeLayerStore::default()))
        .mounts(Arc::new(FakeMounts::default()))
        .volumes(Arc::new(FakeVolumes::default()))
        .network(Arc::new(FakeNetwork::default()))
        .cgroup_fs(Arc::new(FakeCgroupFs::default()))
        .build()
        .unwrap();

    let web = Container::new(daemon.container_config("web"));
    std::fs::create_dir_all(web.root()).unwrap();
    daemon.register(web.clone()).unwrap();
    daemon.remove("web", strict()).await.unwrap();

    assert_eq!(
        store.persisted.lock().clone(),
        vec![(web.id().clone(), RunState::Dead)]
    );
}

#[tokio::test]
async fn missing_root_does_not_fail_persistence() {
    let t = TestDaemon::new();
    let web = t.create("web");
    std::fs::remove_dir_all(web.root()).unwrap();

    t.daemon.remove("web", strict()).await.unwrap();
    assert_gone(&t, &web);
}

// ============================================================================
// CONCURRENCY
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_removals_tear_down_once() {
    let t = TestDaemon::new();
    let web = t.create("web");
    t.supervisor.set_stop_delay(Duration::from_millis(50));

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let daemon = t.daemon.clone();
            tokio::spawn(async move { daemon.remove("web", strict()).await })
        })
        .collect();

    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => {}
            Err(e) => assert!(e.is_not_found(), "unexpected error: {e}"),
        }
    }

    assert_eq!(t.supervisor.stops(), 1);
    assert_eq!(t.layers.released().len(), 1);
    assert_eq!(t.mounts.calls().len(), 1);
    assert_gone(&t, &web);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn removals_of_one_container_never_overlap() {
    let t = TestDaemon::new();
    let web = t.create("web");
    // Keep the container around so every attempt gets a chance to run.
    t.layers.fail_with(Some(LayerFailure::Busy));
    t.supervisor.set_stop_delay(Duration::from_millis(5));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let daemon = t.daemon.clone();
            tokio::spawn(async move { daemon.remove("web", strict()).await })
        })
        .collect();

    for handle in handles {
        if let Err(e) = handle.await.unwrap() {
            assert_eq!(e.failed_step(), Some(TeardownStep::ReleaseLayer));
        }
    }

    assert!(t.supervisor.stops() >= 1);
    assert_eq!(t.supervisor.max_concurrent_stops(), 1);
    assert_preserved(&t, &web);
}

#[tokio::test]
async fn remove_many_reports_each_target() {
    let t = TestDaemon::new();
    let web = t.create("web");
    let db = t.create("db");
    t.create_running("api");

    let outcomes = t
        .daemon
        .remove_many(["web", "db", "api", "ghost"], strict())
        .await;

    let targets: Vec<_> = outcomes.iter().map(|o| o.target.as_str()).collect();
    assert_eq!(targets, vec!["web", "db", "api", "ghost"]);
    assert!(outcomes[0].result.is_ok());
    assert!(outcomes[1].result.is_ok());
    assert!(outcomes[2].result.as_ref().unwrap_err().is_conflict());
    assert!(outcomes[3].result.as_ref().unwrap_err().is_not_found());

    assert_gone(&t, &web);
    assert_gone(&t, &db);
    assert!(t.daemon.exists("api"));
}

#[tokio::test]
async fn dropping_the_caller_does_not_cancel_teardown() {
    let t = TestDaemon::new();
    let web = t.create("web");
    t.supervisor.set_stop_delay(Duration::from_millis(100));

    let abandoned =
        tokio::time::timeout(Duration::from_millis(10), t.daemon.remove("web", strict())).await;
    assert!(abandoned.is_err(), "removal should still be in flight");

    // Teardown keeps going on its own task.
    for _ in 0..100 {
        if !t.is_registered(&web) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_gone(&t, &web);
    assert!(!web.is_removal_in_progress());
}

// ============================================================================
// PANICS
// ============================================================================

struct PanickingSupervisor;

#[async_trait]
impl ProcessSupervisor for PanickingSupervisor {
    fn is_running(&self, _container: &Container) -> bool {
        false
    }

    async fn kill(&self, _container: &Container) -> TeardownResult<()> {
        Ok(())
    }

    async fn stop(&self, _container: &Container, _grace: Duration) -> TeardownResult<()> {
        panic!("supervisor crashed");
    }
}

struct NoLabels;

impl SecurityLabels for NoLabels {
    fn release(&self, _label: &str) {}
}

#[tokio::test]
async fn panicking_teardown_surfaces_as_internal_and_releases_lock() {
    let home = tempfile::TempDir::new().unwrap();
    let mut options = DaemonOptions {
        home_dir: home.path().to_path_buf(),
        ..Default::default()
    };
    options.cgroup.root = home.path().join("cgroup");

    let daemon = Daemon::builder(options)
        .supervisor(Arc::new(PanickingSupervisor))
        .labels(Arc::new(NoLabels))
        .layers(Arc::new(FakeLayerStore::default()))
        .mounts(Arc::new(FakeMounts::default()))
        .volumes(Arc::new(FakeVolumes::default()))
        .network(Arc::new(FakeNetwork::default()))
        .cgroup_fs(Arc::new(FakeCgroupFs::default()))
        .build()
        .unwrap();

    let web = Container::new(daemon.container_config("web"));
    daemon.register(web.clone()).unwrap();

    let err = daemon.remove("web", forced()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert!(!web.is_removal_in_progress());
    assert!(daemon.exists("web"));
}
