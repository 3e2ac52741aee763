//! Tracing subscriber setup for the binaries.
//!
//! Library code only emits `tracing` events; nothing here is touched by the
//! router or the engine, so tests can run with no subscriber or a scoped one.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_FILE_NAME: &str = "adapter.log";

const DEFAULT_FILTER: &str = "info,cortex_a2a_adapter=debug,tower_http=debug";

/// Open (creating if needed) the append-only log file under `log_dir`.
pub fn open_log_file(log_dir: &Path) -> std::io::Result<(File, PathBuf)> {
    std::fs::create_dir_all(log_dir)?;
    let path = log_dir.join(LOG_FILE_NAME);
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    Ok((file, path))
}

/// Install the global subscriber: console output plus `log_dir/adapter.log`.
///
/// `RUST_LOG` overrides the default filter.
pub fn init(log_dir: &Path) -> anyhow::Result<PathBuf> {
    let (file, path) = open_log_file(log_dir)?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))?;

    Ok(path)
}

/// Console-only subscriber for short-lived command line tools.
pub fn init_console() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
