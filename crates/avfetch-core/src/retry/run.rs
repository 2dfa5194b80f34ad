//! Retry loop: run a closure until success or policy says stop.

use super::classify::Classify;
use super::policy::{ErrorKind, RetryDecision, RetryPolicy};
use crate::control::{CancelToken, Cancelled};

/// Runs a closure until it succeeds or the retry policy says to stop.
///
/// On a recoverable failure, sleeps for the backoff duration then tries again;
/// `f` is invoked at most `policy.max_attempts` times. Non-recoverable errors
/// return immediately. The closure receives the 1-based attempt number.
/// Cancellation is checked before each attempt and during the sleep; when it
/// fires the error comes from `on_cancel`, never from the failed attempt.
pub fn run_with_retry<T, E, F>(
    policy: &RetryPolicy,
    cancel: &CancelToken,
    on_cancel: impl Fn(Cancelled) -> E,
    mut f: F,
) -> Result<T, E>
where
    E: Classify + std::fmt::Display,
    F: FnMut(u32) -> Result<T, E>,
{
    let mut attempt = 1u32;
    loop {
        if let Err(c) = cancel.check() {
            return Err(on_cancel(c));
        }
        let err = match f(attempt) {
            Ok(v) => return Ok(v),
            Err(e) => e,
        };
        let kind = err.kind();
        match policy.decide(attempt, kind) {
            RetryDecision::NoRetry => {
                if kind.is_recoverable() {
                    tracing::warn!(attempt, "giving up after {} attempt(s): {}", attempt, err);
                } else if kind != ErrorKind::Cancelled {
                    tracing::debug!(attempt, ?kind, "not retrying: {}", err);
                }
                return Err(err);
            }
            RetryDecision::RetryAfter(d) => {
                tracing::debug!(attempt, ?kind, delay_ms = d.as_millis() as u64, "retrying: {}", err);
                if let Err(c) = cancel.sleep(d) {
                    tracing::debug!(attempt, "cancelled while waiting to retry: {}", err);
                    return Err(on_cancel(c));
                }
                attempt += 1;
            }
        }
    }
}
