//! Resumable single-stream transfer engine.
//!
//! Fetches one stream URL into a destination file with libcurl. An existing
//! destination is treated as a resume checkpoint: its size becomes the range
//! start and the body is appended. A failed transfer leaves the partial file
//! in place, so the next invocation (usually the next retry attempt) picks up
//! where this one stopped.

mod budget;
mod error;
mod progress;

pub use budget::TransferBudget;
pub use error::TransferError;
pub use progress::{ProgressReporter, ProgressThrottle, TransferProgress};

use std::cell::RefCell;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::control::CancelToken;
use crate::retry::{run_with_retry, RetryPolicy};

/// One stream to fetch into one local file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferTask {
    pub source_url: String,
    pub destination: PathBuf,
    /// Bytes already on disk; the request starts at this offset.
    pub resume_offset: u64,
    /// Size to verify against when the server does not report one.
    pub expected_total: Option<u64>,
}

impl TransferTask {
    /// Builds a task whose resume offset is the current size of `destination`
    /// (0 when the file does not exist yet).
    pub fn for_destination(source_url: &str, destination: &Path) -> Self {
        let resume_offset = fs::metadata(destination).map(|m| m.len()).unwrap_or(0);
        Self {
            source_url: source_url.to_string(),
            destination: destination.to_path_buf(),
            resume_offset,
            expected_total: None,
        }
    }

    /// Size reported by the resolver, used when the response has no length.
    pub fn with_expected_total(mut self, total: Option<u64>) -> Self {
        self.expected_total = total;
        self
    }
}

/// Curl settings for stream transfers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOptions {
    /// `scheme://host:port`, passed to curl as-is.
    pub proxy: Option<String>,
    /// Receive buffer size (curl clamps to its own limits).
    pub buffer_size: Option<usize>,
    pub connect_timeout: Duration,
    /// Abort when throughput stays below `low_speed_limit` bytes/s for `low_speed_time`.
    pub low_speed_limit: u32,
    pub low_speed_time: Duration,
    pub progress_interval: Duration,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            proxy: None,
            buffer_size: Some(64 * 1024),
            connect_timeout: Duration::from_secs(30),
            low_speed_limit: 1024,
            low_speed_time: Duration::from_secs(60),
            progress_interval: ProgressThrottle::DEFAULT_INTERVAL,
        }
    }
}

/// Mutable state shared between curl's header and write callbacks.
struct WriteState<'a> {
    destination: &'a Path,
    cancel: &'a CancelToken,
    progress: Option<&'a ProgressReporter>,
    throttle: ProgressThrottle,
    started: Instant,
    file: Option<File>,
    /// Status of the current response (reset on each redirect hop).
    status: u32,
    content_length: Option<u64>,
    content_range_total: Option<u64>,
    /// Where this response's body starts in the file (0 when the server ignored the range).
    base_offset: u64,
    written: u64,
    skip_body: bool,
    cancelled: bool,
    storage_error: Option<std::io::Error>,
}

impl WriteState<'_> {
    fn on_header(&mut self, line: &[u8]) {
        let Ok(line) = std::str::from_utf8(line) else {
            return;
        };
        let line = line.trim();
        if line.starts_with("HTTP/") {
            self.status = line
                .split_whitespace()
                .nth(1)
                .and_then(|s| s.parse().ok())
                .unwrap_or(0);
            self.content_length = None;
            self.content_range_total = None;
            return;
        }
        let Some((name, value)) = line.split_once(':') else {
            return;
        };
        let value = value.trim();
        if name.eq_ignore_ascii_case("content-length") {
            self.content_length = value.parse().ok();
        } else if name.eq_ignore_ascii_case("content-range") {
            // "bytes 100-199/200" or "bytes */200"
            self.content_range_total = value
                .rsplit_once('/')
                .and_then(|(_, total)| total.trim().parse().ok());
        }
    }

    /// Opens the destination on the first body chunk, choosing append or
    /// truncate from the response status.
    fn open_destination(&mut self) -> std::io::Result<()> {
        if self.status == 206 {
            self.file = Some(File::options().create(true).append(true).open(self.destination)?);
        } else {
            if self.base_offset > 0 {
                tracing::info!(
                    path = %self.destination.display(),
                    "server ignored range request; restarting stream from zero"
                );
            }
            self.base_offset = 0;
            self.file = Some(
                File::options()
                    .create(true)
                    .write(true)
                    .truncate(true)
                    .open(self.destination)?,
            );
        }
        Ok(())
    }

    fn on_body(&mut self, data: &[u8]) -> usize {
        if self.cancel.is_cancelled() {
            self.cancelled = true;
            return 0;
        }
        if self.skip_body {
            return data.len();
        }
        if self.file.is_none() {
            if !(200..300).contains(&self.status) {
                self.skip_body = true;
                return data.len();
            }
            if let Err(e) = self.open_destination() {
                self.storage_error = Some(e);
                return 0;
            }
        }
        let Some(file) = self.file.as_mut() else {
            return 0;
        };
        if let Err(e) = file.write_all(data) {
            self.storage_error = Some(e);
            return 0;
        }
        self.written += data.len() as u64;
        if let Some(reporter) = self.progress {
            let on_disk = self.base_offset + self.written;
            if let Some(speed) = self.throttle.tick(Instant::now(), on_disk) {
                reporter.report(on_disk, self.total(), speed);
            }
        }
        data.len()
    }

    /// Full stream size implied by the response headers.
    fn total(&self) -> Option<u64> {
        if self.status == 206 {
            self.content_range_total
                .or_else(|| self.content_length.map(|l| self.base_offset + l))
        } else {
            self.content_length
        }
    }
}

/// Fetches `task.source_url` into `task.destination`, resuming from
/// `task.resume_offset`. Returns the number of bytes written by this call.
///
/// The destination is exclusively owned by this call; callers must not run two
/// transfers to the same path at once.
pub fn transfer(
    task: &TransferTask,
    opts: &TransferOptions,
    progress: Option<&ProgressReporter>,
    cancel: &CancelToken,
) -> Result<u64, TransferError> {
    cancel.check()?;
    if let Some(parent) = task.destination.parent() {
        fs::create_dir_all(parent).map_err(TransferError::Storage)?;
    }

    let offset = task.resume_offset;
    if let Some(remote) = task.expected_total.filter(|&n| offset > n) {
        let _ = fs::remove_file(&task.destination);
        return Err(TransferError::StalePartial { size: offset, remote });
    }
    let mut easy = curl::easy::Easy::new();
    easy.url(&task.source_url)?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    easy.connect_timeout(opts.connect_timeout)?;
    easy.low_speed_limit(opts.low_speed_limit)?;
    easy.low_speed_time(opts.low_speed_time)?;
    if let Some(sz) = opts.buffer_size {
        easy.buffer_size(sz)?;
    }
    if let Some(proxy) = opts.proxy.as_deref() {
        easy.proxy(proxy)?;
    }
    // libcurl calls the progress callback about once a second even when no
    // data arrives, so a stalled connection still sees the cancel token.
    easy.progress(true)?;
    if offset > 0 {
        // curl expects "start-end"; an open end means "to EOF".
        easy.range(&format!("{}-", offset))?;
    }

    let state = RefCell::new(WriteState {
        destination: &task.destination,
        cancel,
        progress,
        throttle: ProgressThrottle::new(Instant::now(), offset, opts.progress_interval),
        started: Instant::now(),
        file: None,
        status: 0,
        content_length: None,
        content_range_total: None,
        base_offset: offset,
        written: 0,
        skip_body: false,
        cancelled: false,
        storage_error: None,
    });

    let perform_result = {
        let mut transfer = easy.transfer();
        transfer.header_function(|line| {
            state.borrow_mut().on_header(line);
            true
        })?;
        transfer.write_function(|data| Ok(state.borrow_mut().on_body(data)))?;
        transfer.progress_function(|_, _, _, _| !cancel.is_cancelled())?;
        transfer.perform()
    };

    let mut state = state.into_inner();
    if let Some(file) = state.file.as_mut() {
        if let Err(e) = file.flush() {
            state.storage_error.get_or_insert(e);
        }
    }
    drop(state.file.take());

    if let Err(e) = perform_result {
        if e.is_aborted_by_callback() && cancel.is_cancelled() {
            return Err(TransferError::Cancelled);
        }
        if e.is_write_error() {
            if state.cancelled {
                return Err(TransferError::Cancelled);
            }
            if let Some(io_err) = state.storage_error.take() {
                return Err(TransferError::Storage(io_err));
            }
        }
        return Err(TransferError::Curl(e));
    }
    if let Some(io_err) = state.storage_error.take() {
        return Err(TransferError::Storage(io_err));
    }

    let code = easy.response_code()?;
    if code == 416 && offset > 0 {
        return match state.content_range_total {
            Some(remote) if remote < offset => {
                let _ = fs::remove_file(&task.destination);
                Err(TransferError::StalePartial {
                    size: offset,
                    remote,
                })
            }
            _ => {
                tracing::debug!(path = %task.destination.display(), "stream already complete on disk");
                Ok(0)
            }
        };
    }
    if !(200..300).contains(&code) {
        return Err(TransferError::Http(code));
    }

    if code != 206 && offset > 0 && state.written == 0 {
        // Full (non-range) response with no body: the old partial is not a
        // prefix of anything we received.
        let _ = fs::remove_file(&task.destination);
        return Err(TransferError::EmptyArtifact);
    }

    let on_disk = state.base_offset + state.written;
    if let Some(expected) = state.total().or(task.expected_total) {
        if on_disk < expected {
            return Err(TransferError::Incomplete {
                expected,
                received: on_disk,
            });
        }
    }
    if on_disk == 0 {
        return Err(TransferError::EmptyArtifact);
    }
    if let Some(reporter) = progress {
        let secs = state.started.elapsed().as_secs_f64().max(1e-3);
        reporter.report(on_disk, Some(on_disk), state.written as f64 / secs);
    }
    Ok(state.written)
}

/// Runs `transfer` under `policy`. Every attempt re-reads the destination size,
/// so bytes from a failed attempt are kept and the next one resumes after them.
/// `expected_total` is the size the resolver reported, if any.
pub fn transfer_with_retry(
    source_url: &str,
    destination: &Path,
    expected_total: Option<u64>,
    opts: &TransferOptions,
    policy: &RetryPolicy,
    progress: Option<&ProgressReporter>,
    cancel: &CancelToken,
) -> Result<u64, TransferError> {
    run_with_retry(policy, cancel, |_| TransferError::Cancelled, |attempt| {
        let task = TransferTask::for_destination(source_url, destination).with_expected_total(expected_total);
        if attempt > 1 {
            tracing::info!(
                attempt,
                offset = task.resume_offset,
                path = %destination.display(),
                "resuming transfer"
            );
        }
        transfer(&task, opts, progress, cancel)
    })
}
