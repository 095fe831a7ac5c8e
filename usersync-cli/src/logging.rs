//! Subscriber setup for the binary.
//!
//! `run` logs to stdout and appends to the configured log file; read-only
//! commands log to stderr so their stdout stays machine-readable. The filter
//! defaults to `info` and honours `RUST_LOG`.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing_subscriber::{fmt, fmt::writer::MakeWriterExt, EnvFilter};
use usersync_host::rotate_log;

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Log to stderr only.
pub fn init_stderr() {
    let _ = fmt()
        .with_env_filter(filter())
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Log to stdout and to `log_file`, rotating it first.
///
/// If the file cannot be opened the run still proceeds, logging to stdout.
pub fn init_with_file(log_file: &Path) {
    rotate_log(log_file);
    match open_append(log_file) {
        Ok(file) => {
            let writer = std::io::stdout.and(Arc::new(file));
            let _ = fmt()
                .with_env_filter(filter())
                .with_target(false)
                .with_ansi(false)
                .with_writer(writer)
                .try_init();
        }
        Err(err) => {
            let _ = fmt()
                .with_env_filter(filter())
                .with_target(false)
                .try_init();
            tracing::warn!(
                path = %log_file.display(),
                error = %err,
                "could not open log file, logging to stdout only"
            );
        }
    }
}

fn open_append(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Brackets one run in the log with start and end banners.
pub struct RunBanner {
    started: Instant,
}

impl RunBanner {
    pub fn start() -> Self {
        tracing::info!("====== Start Log ======");
        Self {
            started: Instant::now(),
        }
    }

    pub fn finish(self) -> u128 {
        let elapsed = self.started.elapsed().as_millis();
        tracing::info!("====== End Log (Done in {elapsed}ms) ======");
        elapsed
    }
}
