pub mod process;

use teardown_shared::errors::{TeardownError, TeardownResult};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::runtime::constants::filenames;
use crate::runtime::layout::FilesystemLayout;

pub fn register_to_tracing(non_blocking: NonBlocking, env_filter: EnvFilter) {
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .with_ansi(false),
        )
        .try_init();
}

/// Route `tracing` output to `<home>/logs/teardown.log`, rotated daily.
///
/// The filter defaults to `info` and is overridden by `RUST_LOG`. Keep the
/// returned guard alive for as long as logs should be flushed. A global
/// subscriber installed earlier wins; this call then only creates the file.
pub fn init_logging_for(layout: &FilesystemLayout) -> TeardownResult<WorkerGuard> {
    let logs_dir = layout.logs_dir();
    std::fs::create_dir_all(&logs_dir).map_err(|e| {
        TeardownError::Storage(format!(
            "failed to create logs directory {}: {}",
            logs_dir.display(),
            e
        ))
    })?;

    let file_appender = tracing_appender::rolling::daily(&logs_dir, filenames::LOG_FILE);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| TeardownError::InvalidArgument(format!("invalid log filter: {}", e)))?;

    register_to_tracing(non_blocking, env_filter);
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_creates_logs_dir() {
        let temp = tempfile::TempDir::new().unwrap();
        let layout = FilesystemLayout::new(temp.path().to_path_buf());

        let guard = init_logging_for(&layout).unwrap();
        tracing::info!("logging initialised");
        drop(guard);

        assert!(layout.logs_dir().is_dir());
    }
}
