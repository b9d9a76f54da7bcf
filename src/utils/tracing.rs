//! Tracing Utilities Module
//!
//! This module contains the logging setup shared by the plugin binaries.
//! Plugins must never log to stdout: the host reads replies from it.

use crate::utils::error::{PluginError, Result};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::OnceLock;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static WORKER_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Initializes the tracing subscriber with file output and optional stderr output
///
/// # Arguments
/// * `log_file` - File the log is appended to
/// * `default_level` - Filter used when `RUST_LOG` is not set
/// * `to_stderr` - Also write log lines to stderr
///
/// # Returns
/// * `Result<()>` - Ok once the subscriber is installed, or an error if it already was
pub fn setup_tracing(log_file: &Path, default_level: &str, to_stderr: bool) -> Result<()> {
    if let Some(dir) = log_file.parent() {
        std::fs::create_dir_all(dir)?;
    }

    let file = OpenOptions::new().append(true).create(true).open(log_file)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);
    WORKER_GUARD
        .set(guard)
        .map_err(|_| PluginError::Logging("tracing is already initialized".to_string()))?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_filter(env_filter.clone());

    let stderr_layer = to_stderr.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_filter(env_filter)
    });

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(|e| PluginError::Logging(e.to_string()))
}
