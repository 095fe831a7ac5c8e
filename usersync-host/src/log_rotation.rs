//! Size-based rotation of the run log.
//!
//! The log is appended to by every run, so it is rotated before the run
//! opens it: once `iamusersync.log` reaches [`MAX_LOG_BYTES`] it becomes
//! `iamusersync.log.1`, older copies shift up by one, and anything past
//! `.{MAX_ROTATED_FILES}` is dropped.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// 10 MiB.
pub const MAX_LOG_BYTES: u64 = 10 * 1024 * 1024;

pub const MAX_ROTATED_FILES: usize = 5;

/// Rotate `log_path` if it is at least `max_bytes` long.
///
/// Returns whether a rotation happened. A missing log is not an error; the
/// first run simply has nothing to rotate. After a rotation `log_path` does
/// not exist until the caller reopens it.
pub fn rotate_if_needed(log_path: &Path, max_bytes: u64, max_files: usize) -> io::Result<bool> {
    let len = match fs::metadata(log_path) {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    if len < max_bytes || max_files == 0 {
        return Ok(false);
    }

    remove_if_present(&numbered(log_path, max_files))?;
    for n in (1..max_files).rev() {
        rename_if_present(&numbered(log_path, n), &numbered(log_path, n + 1))?;
    }
    fs::rename(log_path, numbered(log_path, 1))?;
    Ok(true)
}

/// Rotate the run log with the default limits. Failures are logged, not returned.
pub fn rotate_log(log_path: &Path) {
    match rotate_if_needed(log_path, MAX_LOG_BYTES, MAX_ROTATED_FILES) {
        Ok(true) => tracing::info!(path = %log_path.display(), "log file rotated"),
        Ok(false) => {}
        Err(err) => {
            tracing::warn!(path = %log_path.display(), error = %err, "log rotation failed")
        }
    }
}

/// `<log>.<n>`
pub fn numbered(base: &Path, n: usize) -> PathBuf {
    let mut name = base.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".{n}"));
    base.with_file_name(name)
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

fn rename_if_present(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
