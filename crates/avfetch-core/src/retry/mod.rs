//! Retry and backoff policy.
//!
//! This module encapsulates error classification (timeouts, throttling,
//! connection failures, short artifacts) and backoff decisions so that the
//! transfer engine and the catalogue resolution step share one policy.

mod classify;
mod policy;
mod run;

pub use classify::{classify_curl_error, classify_http_status, classify_io_error, Classify};
pub use policy::{Backoff, ErrorKind, RetryDecision, RetryPolicy};
pub use run::run_with_retry;
