//! Process supervision interface and a signal-based implementation.

use std::time::Duration;

use async_trait::async_trait;
use teardown_shared::errors::{TeardownError, TeardownResult};

use crate::container::Container;
use crate::util::process::{is_process_alive, send_signal};

/// Controls the process backing a container.
#[async_trait]
pub trait ProcessSupervisor: Send + Sync {
    /// Whether the container's process is currently running.
    fn is_running(&self, container: &Container) -> bool;

    /// Kill the process immediately.
    async fn kill(&self, container: &Container) -> TeardownResult<()>;

    /// Stop the process, escalating to a kill after `grace`.
    ///
    /// Stopping a container that is not running is a no-op.
    async fn stop(&self, container: &Container, grace: Duration) -> TeardownResult<()>;
}

/// Supervisor that drives container processes with Unix signals.
///
/// `stop` sends SIGTERM, polls liveness until `grace` runs out, then
/// SIGKILLs. Exit is recorded on the container state.
#[derive(Debug, Clone)]
pub struct SignalSupervisor {
    poll_interval: Duration,
    kill_wait: Duration,
}

impl SignalSupervisor {
    pub fn new() -> Self {
        Self {
            poll_interval: Duration::from_millis(50),
            kill_wait: Duration::from_secs(2),
        }
    }

    async fn wait_exit(&self, pid: u32, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if !is_process_alive(pid) {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn kill_pid(&self, container: &Container, pid: u32) -> TeardownResult<()> {
        send_signal(pid, libc::SIGKILL).map_err(|e| {
            TeardownError::Internal(format!(
                "failed to SIGKILL pid {} of container {}: {}",
                pid,
                container.id(),
                e
            ))
        })?;

        if !self.wait_exit(pid, self.kill_wait).await {
            return Err(TeardownError::Internal(format!(
                "pid {} of container {} survived SIGKILL",
                pid,
                container.id()
            )));
        }

        container.update_state(|s| s.set_stopped(128 + libc::SIGKILL));
        Ok(())
    }
}

impl Default for SignalSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProcessSupervisor for SignalSupervisor {
    fn is_running(&self, container: &Container) -> bool {
        container.is_running() && container.pid().is_some_and(is_process_alive)
    }

    async fn kill(&self, container: &Container) -> TeardownResult<()> {
        let Some(pid) = container.pid() else {
            container.update_state(|s| s.set_stopped(128 + libc::SIGKILL));
            return Ok(());
        };

        tracing::debug!(container_id = %container.id(), pid, "Killing container process");
        self.kill_pid(container, pid).await
    }

    async fn stop(&self, container: &Container, grace: Duration) -> TeardownResult<()> {
        let pid = match container.pid() {
            Some(pid) if is_process_alive(pid) => pid,
            _ => {
                if container.is_running() {
                    container.update_state(|s| s.set_stopped(0));
                }
                return Ok(());
            }
        };

        tracing::debug!(
            container_id = %container.id(),
            pid,
            grace_ms = grace.as_millis() as u64,
            "Stopping container process"
        );

        // ESRCH here means it exited between the liveness check and the signal.
        if send_signal(pid, libc::SIGTERM).is_ok() && self.wait_exit(pid, grace).await {
            container.update_state(|s| s.set_stopped(128 + libc::SIGTERM));
            return Ok(());
        }

        tracing::warn!(
            container_id = %container.id(),
            pid,
            "Container did not exit within grace period, sending SIGKILL"
        );
        self.kill_pid(container, pid).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::ContainerConfig;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_stop_without_pid_is_noop() {
        let supervisor = SignalSupervisor::new();
        let c = Container::new(ContainerConfig::new("idle", PathBuf::from("/tmp/idle")));

        supervisor
            .stop(&c, Duration::from_millis(10))
            .await
            .unwrap();
        assert!(!supervisor.is_running(&c));
    }

    #[tokio::test]
    async fn test_stale_running_flag_is_cleared() {
        let supervisor = SignalSupervisor::new();
        let c = Container::new(ContainerConfig::new("stale", PathBuf::from("/tmp/stale")));
        // Spawn and reap a child so its pid is known to be dead.
        let mut child = std::process::Command::new("true").spawn().unwrap();
        let pid = child.id();
        child.wait().unwrap();
        c.update_state(|s| s.set_running(pid));

        supervisor
            .stop(&c, Duration::from_millis(10))
            .await
            .unwrap();
        assert!(!c.is_running());
    }

    #[tokio::test]
    async fn test_stop_terminates_live_process() {
        let supervisor = SignalSupervisor::new();
        let c = Container::new(ContainerConfig::new("sleeper", PathBuf::from("/tmp/sleeper")));
        let mut child = std::process::Command::new("sleep").arg("30").spawn().unwrap();
        c.update_state(|s| s.set_running(child.id()));

        // Reap in the background so the pid does not linger as a zombie.
        let reaper = std::thread::spawn(move || child.wait());

        supervisor.stop(&c, Duration::from_secs(5)).await.unwrap();
        reaper.join().unwrap().unwrap();
        assert!(!c.is_running());
        assert!(!supervisor.is_running(&c));
    }
}
