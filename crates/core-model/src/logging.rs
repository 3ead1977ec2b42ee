use anyhow::{Context, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Install a global fmt subscriber writing to `dir/file_name` through a
/// non-blocking appender. Filtering follows `RUST_LOG`.
///
/// Returns the writer guard the embedder must keep alive for the lifetime of
/// the process, or `None` when a global subscriber was already installed.
pub fn init_file_logging(dir: &Path, file_name: &str) -> Result<Option<WorkerGuard>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("creating log directory {}", dir.display()))?;
    let file_appender = tracing_appender::rolling::never(dir, file_name);
    let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
    match tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_ansi(false)
        .with_writer(nb_writer)
        .try_init()
    {
        Ok(()) => Ok(Some(guard)),
        // Already installed; dropping the guard shuts the unused writer down.
        Err(_err) => Ok(None),
    }
}
