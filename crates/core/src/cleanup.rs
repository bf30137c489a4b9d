//! Removal of generated files after delivery.
//!
//! Cleanup is best effort: failures are logged and reported through the
//! return value, never raised.

use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

/// Files younger than this survive a `keep_recent` sweep.
pub const RECENT_AGE: Duration = Duration::from_secs(3600);

/// Deletes one file. Returns whether a file was removed.
pub fn cleanup_file(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }

    match fs::remove_file(path) {
        Ok(()) => {
            tracing::info!("Cleaned up file: {}", path.display());
            true
        }
        Err(e) => {
            tracing::warn!("Failed to cleanup file {}: {}", path.display(), e);
            false
        }
    }
}

fn is_recent(path: &Path, now: SystemTime) -> bool {
    fs::metadata(path)
        .and_then(|meta| meta.modified())
        .ok()
        .and_then(|modified| now.duration_since(modified).ok())
        .is_some_and(|age| age < RECENT_AGE)
}

/// Deletes every regular file directly inside `dir`.
///
/// With `keep_recent`, files modified within the last hour are kept.
/// Returns the number of files removed.
pub fn cleanup_output_directory(dir: &Path, keep_recent: bool) -> usize {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return 0,
        Err(e) => {
            tracing::error!("Error during cleanup of {}: {}", dir.display(), e);
            return 0;
        }
    };

    let now = SystemTime::now();
    let mut cleaned = 0;

    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if keep_recent && is_recent(&path, now) {
            continue;
        }
        if cleanup_file(&path) {
            cleaned += 1;
        }
    }

    if cleaned > 0 {
        tracing::info!("Cleaned up {} files from output directory", cleaned);
    }
    cleaned
}
