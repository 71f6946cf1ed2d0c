//! File logging. The terminal belongs to the UI, so nothing is written to stdout.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::constants::constants;

/// Install the global subscriber. `RUST_LOG` overrides the default `info` filter.
///
/// Keep the returned guard alive for the whole session; dropping it flushes
/// and stops the background writer.
pub fn init_logging() -> Result<WorkerGuard> {
  let proj_dirs = ProjectDirs::from("", "", &constants().app_name).context("No home directory for log files")?;
  let log_dir = proj_dirs.data_local_dir().join("logs");
  std::fs::create_dir_all(&log_dir).with_context(|| format!("Failed to create {}", log_dir.display()))?;

  let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, format!("{}.log", constants().app_name));
  let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

  let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

  tracing_subscriber::registry()
    .with(env_filter)
    .with(fmt::layer().with_ansi(false).with_target(false).with_writer(non_blocking))
    .try_init()
    .context("Failed to install tracing subscriber")?;

  tracing::info!(dir = %log_dir.display(), "logging initialized");
  Ok(guard)
}
