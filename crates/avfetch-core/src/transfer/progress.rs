//! Progress reporting for stream transfers (bytes done, percent, speed).

use std::sync::Arc;
use std::time::{Duration, Instant};

/// Snapshot of one transfer's progress.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferProgress {
    /// Which stream this is (e.g. "0003-abc video").
    pub label: Arc<str>,
    /// Bytes on disk for this stream, including bytes from earlier attempts.
    pub bytes_downloaded: u64,
    /// Total size when the server reported one.
    pub total: Option<u64>,
    /// Percent complete in [0, 100]; present only with a known total.
    pub percent: Option<f64>,
    /// Bytes per second since the previous event.
    pub speed_bytes_per_sec: f64,
}

/// Channel end the transfer reports into. Sends never block: when the
/// consumer lags, events are dropped.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    sink: tokio::sync::mpsc::Sender<TransferProgress>,
    label: Arc<str>,
}

impl ProgressReporter {
    pub fn new(sink: tokio::sync::mpsc::Sender<TransferProgress>, label: impl Into<Arc<str>>) -> Self {
        Self {
            sink,
            label: label.into(),
        }
    }

    pub fn report(&self, bytes_downloaded: u64, total: Option<u64>, speed_bytes_per_sec: f64) {
        let percent = total
            .filter(|t| *t > 0)
            .map(|t| (bytes_downloaded as f64 / t as f64 * 100.0).min(100.0));
        let _ = self.sink.try_send(TransferProgress {
            label: Arc::clone(&self.label),
            bytes_downloaded,
            total,
            percent,
            speed_bytes_per_sec,
        });
    }
}

/// Rate limiter for progress events: at most one per `interval`.
#[derive(Debug)]
pub struct ProgressThrottle {
    interval: Duration,
    last_emit: Instant,
    last_bytes: u64,
}

impl ProgressThrottle {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

    pub fn new(start: Instant, start_bytes: u64, interval: Duration) -> Self {
        Self {
            interval,
            last_emit: start,
            last_bytes: start_bytes,
        }
    }

    /// Returns the speed to report if an event is due at `now`, else `None`.
    pub fn tick(&mut self, now: Instant, bytes: u64) -> Option<f64> {
        let elapsed = now.saturating_duration_since(self.last_emit);
        if elapsed < self.interval {
            return None;
        }
        let speed = bytes.saturating_sub(self.last_bytes) as f64 / elapsed.as_secs_f64();
        self.last_emit = now;
        self.last_bytes = bytes;
        Some(speed)
    }
}
