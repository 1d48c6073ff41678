use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Routes tracing output to `daybook.log` in `dir`; stdout belongs to the terminal UI.
/// Keep the returned guard alive until exit so buffered lines get flushed.
pub fn init(dir: &Path) -> Result<WorkerGuard> {
    fs::create_dir_all(dir).with_context(|| format!("creating {:?}", dir))?;
    let appender = tracing_appender::rolling::never(dir, "daybook.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|err| anyhow!("initializing logging: {err}"))?;
    Ok(guard)
}
