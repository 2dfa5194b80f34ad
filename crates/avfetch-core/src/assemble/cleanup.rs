//! Lock-tolerant deletion of temporary inputs after a successful assembly.
//!
//! The encoder may release its file handles a moment after it exits (notably
//! on Windows), so deletion is retried a few times with a short delay. A file
//! that still cannot be removed is reported as a warning; it never fails the job.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupPolicy {
    /// Attempts per file (including the first).
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for CleanupPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_millis(500),
        }
    }
}

/// A temp file that could not be deleted within the retry budget.
#[derive(Debug, thiserror::Error)]
#[error("could not delete {} after {attempts} attempt(s): {source}", .path.display())]
pub struct CleanupWarning {
    pub path: PathBuf,
    pub attempts: u32,
    #[source]
    pub source: io::Error,
}

/// Deletes `path` with `remove`, retrying on any error but `NotFound` (which
/// counts as deleted). Returns the number of attempts used.
pub fn remove_with_retry<F>(path: &Path, policy: &CleanupPolicy, mut remove: F) -> Result<u32, CleanupWarning>
where
    F: FnMut(&Path) -> io::Result<()>,
{
    let max = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match remove(path) {
            Ok(()) => return Ok(attempt),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(attempt),
            Err(e) if attempt >= max => {
                return Err(CleanupWarning {
                    path: path.to_path_buf(),
                    attempts: attempt,
                    source: e,
                })
            }
            Err(e) => {
                tracing::debug!(path = %path.display(), attempt, "delete failed, retrying: {}", e);
                std::thread::sleep(policy.delay);
                attempt += 1;
            }
        }
    }
}

/// Best-effort deletion of every path in `paths`. Failures are logged and
/// returned; the caller never turns them into a job failure.
pub fn cleanup_temp_files(paths: &[PathBuf], policy: &CleanupPolicy) -> Vec<CleanupWarning> {
    let mut warnings = Vec::new();
    for path in paths {
        match remove_with_retry(path, policy, |p| std::fs::remove_file(p)) {
            Ok(_) => tracing::debug!(path = %path.display(), "removed temp file"),
            Err(w) => {
                tracing::warn!("{}", w);
                warnings.push(w);
            }
        }
    }
    warnings
}

/// Removes `dir` if it is empty; anything else is left alone.
pub fn remove_dir_if_empty(dir: &Path) {
    if let Ok(mut entries) = std::fs::read_dir(dir) {
        if entries.next().is_none() {
            let _ = std::fs::remove_dir(dir);
        }
    }
}
