//! Container run state.
//!
//! `ContainerState` holds the raw flags the supervisor and the teardown
//! pipeline flip; `RunState` is the single status derived from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Externally visible status of a container.
///
/// ```text
/// created ─start→ running ─stop→ exited
///                   │ ↕ pause/unpause: paused
///                   │ ↕ restart policy: restarting
/// any ─removal lock held→ removing ─cleanup→ dead ─unregister→ (gone)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    /// Never started.
    Created,
    Running,
    Paused,
    Restarting,
    /// Started at least once, process no longer running.
    Exited,
    /// A removal holds the container's removal lock.
    Removing,
    /// Marked for destruction; never restarted.
    Dead,
}

impl RunState {
    /// Whether the container's process is live in this state.
    pub fn is_running(&self) -> bool {
        matches!(
            self,
            RunState::Running | RunState::Paused | RunState::Restarting
        )
    }

    pub fn is_dead(&self) -> bool {
        matches!(self, RunState::Dead)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Created => "created",
            RunState::Running => "running",
            RunState::Paused => "paused",
            RunState::Restarting => "restarting",
            RunState::Exited => "exited",
            RunState::Removing => "removing",
            RunState::Dead => "dead",
        }
    }
}

impl std::str::FromStr for RunState {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(RunState::Created),
            "running" => Ok(RunState::Running),
            "paused" => Ok(RunState::Paused),
            "restarting" => Ok(RunState::Restarting),
            "exited" => Ok(RunState::Exited),
            "removing" => Ok(RunState::Removing),
            "dead" => Ok(RunState::Dead),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Raw process state of a container.
///
/// Persisted alongside the container so a restarted daemon sees `dead`
/// containers as dead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerState {
    pub running: bool,
    pub paused: bool,
    pub restarting: bool,
    pub dead: bool,
    pub pid: Option<u32>,
    pub exit_code: Option<i32>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ContainerState {
    /// Initial state for a container that was never started.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_running(&mut self, pid: u32) {
        self.running = true;
        self.paused = false;
        self.restarting = false;
        self.pid = Some(pid);
        self.exit_code = None;
        self.started_at = Some(Utc::now());
    }

    pub fn set_paused(&mut self, paused: bool) {
        if self.running {
            self.paused = paused;
        }
    }

    /// Record process exit. PID is cleared since the process is gone.
    pub fn set_stopped(&mut self, exit_code: i32) {
        self.running = false;
        self.paused = false;
        self.restarting = false;
        self.pid = None;
        self.exit_code = Some(exit_code);
        self.finished_at = Some(Utc::now());
    }

    /// Mark for destruction. A dead container is never restarted.
    pub fn set_dead(&mut self) {
        self.dead = true;
        self.restarting = false;
    }

    /// Derive the visible status; `removing` overrides everything except a
    /// live process.
    pub fn run_state(&self, removal_in_progress: bool) -> RunState {
        if self.running {
            if self.paused {
                return RunState::Paused;
            }
            if self.restarting {
                return RunState::Restarting;
            }
            return RunState::Running;
        }
        if removal_in_progress {
            return RunState::Removing;
        }
        if self.dead {
            return RunState::Dead;
        }
        if self.started_at.is_none() {
            return RunState::Created;
        }
        RunState::Exited
    }
}
