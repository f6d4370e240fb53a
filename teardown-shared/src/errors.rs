//! Error types for the teardown pipeline.
//!
//! Errors are categorized by how a caller is expected to react:
//! - [`ErrorKind::NotFound`]: target does not exist, surfaced verbatim
//! - [`ErrorKind::Conflict`]: illegal given current state, not retryable as-is
//! - [`ErrorKind::ResourceBusy`]: retryable once the holder lets go
//! - [`TeardownError::Step`]: a fatal teardown step, the container is left
//!   `dead` but registered unless removal was forced

use std::fmt;
use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result alias used across the workspace.
pub type TeardownResult<T> = Result<T, TeardownError>;

/// Teardown steps whose failure aborts the cleanup sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeardownStep {
    /// Killing a running process (forced removal only).
    Kill,
    /// Stopping the supervising process loop.
    Stop,
    /// Deleting the container's private root directory.
    RemoveRoot,
    /// Releasing the writable filesystem layer.
    ReleaseLayer,
    /// Removing the container's cgroup directories.
    ReclaimCgroups,
}

impl TeardownStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            TeardownStep::Kill => "kill",
            TeardownStep::Stop => "stop",
            TeardownStep::RemoveRoot => "remove_root",
            TeardownStep::ReleaseLayer => "release_layer",
            TeardownStep::ReclaimCgroups => "reclaim_cgroups",
        }
    }
}

impl fmt::Display for TeardownStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse classification of a [`TeardownError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    ResourceBusy,
    InUse,
    InvalidArgument,
    MountNotExist,
    Cgroup,
    Storage,
    Internal,
    Io,
}

/// Errors that can occur while tearing a container down.
#[derive(Debug, Error)]
pub enum TeardownError {
    /// Container or alias does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Operation is illegal given the current state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Resource is held by something else; retry after it is released.
    #[error("resource busy: {0}")]
    ResourceBusy(String),

    /// Resource is still referenced by a container and cannot be deleted.
    #[error("in use: {0}")]
    InUse(String),

    /// Malformed input (empty name, ambiguous id prefix).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The writable layer has no mount; treated as already released.
    #[error("mount does not exist")]
    MountNotExist,

    /// Cgroup directories survived every reclaim attempt.
    #[error("cgroup: {0}")]
    Cgroup(String),

    /// Persistent state could not be read or written.
    #[error("storage: {0}")]
    Storage(String),

    #[error("internal: {0}")]
    Internal(String),

    #[error("io: {0}")]
    Io(#[from] io::Error),

    /// A fatal teardown step failed.
    #[error("{step} failed for container {container_id}: {source}")]
    Step {
        step: TeardownStep,
        container_id: String,
        #[source]
        source: Box<TeardownError>,
    },
}

impl TeardownError {
    /// Wrap `source` as the failure of `step` for `container_id`.
    pub fn step(step: TeardownStep, container_id: impl Into<String>, source: TeardownError) -> Self {
        TeardownError::Step {
            step,
            container_id: container_id.into(),
            source: Box::new(source),
        }
    }

    /// Classify the error, looking through [`TeardownError::Step`] wrappers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TeardownError::NotFound(_) => ErrorKind::NotFound,
            TeardownError::Conflict(_) => ErrorKind::Conflict,
            TeardownError::ResourceBusy(_) => ErrorKind::ResourceBusy,
            TeardownError::InUse(_) => ErrorKind::InUse,
            TeardownError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            TeardownError::MountNotExist => ErrorKind::MountNotExist,
            TeardownError::Cgroup(_) => ErrorKind::Cgroup,
            TeardownError::Storage(_) => ErrorKind::Storage,
            TeardownError::Internal(_) => ErrorKind::Internal,
            TeardownError::Io(_) => ErrorKind::Io,
            TeardownError::Step { source, .. } => source.kind(),
        }
    }

    /// The failed step, if this error came out of the cleanup sequence.
    pub fn failed_step(&self) -> Option<TeardownStep> {
        match self {
            TeardownError::Step { step, .. } => Some(*step),
            _ => None,
        }
    }

    /// Whether retrying the same request may succeed without changing it.
    ///
    /// Conflicts and missing targets need a different request; busy
    /// resources and failed steps leave a `dead` container behind that a
    /// later removal can resume.
    pub fn is_retryable(&self) -> bool {
        match self {
            TeardownError::ResourceBusy(_) => true,
            TeardownError::Step { source, .. } => {
                !matches!(source.kind(), ErrorKind::Conflict | ErrorKind::NotFound)
            }
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub fn is_conflict(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }

    pub fn is_in_use(&self) -> bool {
        self.kind() == ErrorKind::InUse
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_error_message_names_step_and_container() {
        let err = TeardownError::step(
            TeardownStep::RemoveRoot,
            "abc123",
            TeardownError::Storage("permission denied".into()),
        );
        let msg = err.to_string();
        assert!(msg.contains("remove_root"));
        assert!(msg.contains("abc123"));
        assert!(msg.contains("permission denied"));
    }

    #[test]
    fn test_kind_looks_through_step() {
        let err = TeardownError::step(
            TeardownStep::ReleaseLayer,
            "abc",
            TeardownError::ResourceBusy("layer mounted".into()),
        );
        assert_eq!(err.kind(), ErrorKind::ResourceBusy);
        assert_eq!(err.failed_step(), Some(TeardownStep::ReleaseLayer));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_conflict_not_retryable() {
        let err = TeardownError::Conflict("running".into());
        assert!(err.is_conflict());
        assert!(!err.is_retryable());
        assert_eq!(err.failed_step(), None);
    }

    #[test]
    fn test_io_conversion() {
        let err: TeardownError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
