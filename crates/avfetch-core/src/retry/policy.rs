use serde::{Deserialize, Serialize};
use std::time::Duration;

/// High-level classification of an error for retry purposes.
///
/// Callers map curl errors, HTTP status codes, IO failures and verification
/// mismatches into these kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Operation timed out (connect/read/low-speed).
    Timeout,
    /// Server asked us to slow down (e.g. 429, 503).
    Throttled,
    /// Network-level failure (connection reset, DNS, etc.).
    Connection,
    /// HTTP status that is retryable but not strictly throttling (5xx).
    Http5xx(u16),
    /// Transfer ended short of the advertised size or produced an empty file.
    Incomplete,
    /// Local disk failure (disk full, permission denied). Never retried.
    Storage,
    /// Stopped by the user. Never retried.
    Cancelled,
    /// Any other error (not retried).
    Other,
}

impl ErrorKind {
    /// Whether another attempt could plausibly succeed.
    pub fn is_recoverable(self) -> bool {
        matches!(
            self,
            ErrorKind::Timeout
                | ErrorKind::Throttled
                | ErrorKind::Connection
                | ErrorKind::Http5xx(_)
                | ErrorKind::Incomplete
        )
    }
}

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this error.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Shape of the delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backoff {
    /// Same delay after every failed attempt.
    #[default]
    Fixed,
    /// base * 2^(attempt-1), capped at `max_delay`.
    Exponential,
}

/// Retry policy: attempt ceiling plus backoff shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Base delay for backoff.
    pub base_delay: Duration,
    /// Upper bound on backoff delay.
    pub max_delay: Duration,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::for_transfers()
    }
}

impl RetryPolicy {
    /// Long-lived media connections drop often; keep resuming for a long time.
    pub fn for_transfers() -> Self {
        Self {
            max_attempts: 300,
            base_delay: Duration::from_secs(3),
            max_delay: Duration::from_secs(3),
            backoff: Backoff::Fixed,
        }
    }

    /// Catalogue resolution: a handful of attempts with exponential backoff.
    pub fn for_resolution() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff: Backoff::Exponential,
        }
    }

    /// No delay between attempts; for tests and local sources.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff: Backoff::Fixed,
        }
    }

    /// Decide what to do after a failed attempt.
    ///
    /// `attempt` is 1-based (1 = first attempt). Returns `RetryDecision::NoRetry`
    /// when we should stop retrying.
    pub fn decide(&self, attempt: u32, kind: ErrorKind) -> RetryDecision {
        if !kind.is_recoverable() || attempt >= self.max_attempts {
            return RetryDecision::NoRetry;
        }
        let delay = match self.backoff {
            Backoff::Fixed => self.base_delay,
            Backoff::Exponential => {
                let exp = 1u32 << attempt.saturating_sub(1).min(8);
                self.base_delay.saturating_mul(exp).min(self.max_delay)
            }
        };
        RetryDecision::RetryAfter(delay)
    }
}
