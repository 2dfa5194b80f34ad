//! Transfer error type, classified for the retry loop.

use crate::control::Cancelled;
use crate::retry::{classify_curl_error, classify_http_status, classify_io_error, Classify, ErrorKind};

/// Error returned by a single transfer invocation.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// Curl reported an error (timeout, connection reset, etc.).
    #[error("{0}")]
    Curl(#[from] curl::Error),
    /// HTTP response had a non-2xx status.
    #[error("HTTP {0}")]
    Http(u32),
    /// Stream ended before the advertised size (server closed early).
    #[error("partial transfer: expected {expected} bytes, have {received}")]
    Incomplete { expected: u64, received: u64 },
    /// Transfer finished cleanly but the destination is empty.
    #[error("transfer produced an empty file")]
    EmptyArtifact,
    /// Local partial file is longer than the remote stream; it was discarded
    /// so the next attempt starts from zero.
    #[error("partial file ({size} bytes) exceeds remote size ({remote} bytes); discarded")]
    StalePartial { size: u64, remote: u64 },
    /// Disk/storage failure (disk full, permission denied). Not retried.
    #[error("storage: {0}")]
    Storage(#[source] std::io::Error),
    #[error("transfer cancelled")]
    Cancelled,
}

impl From<Cancelled> for TransferError {
    fn from(_: Cancelled) -> Self {
        TransferError::Cancelled
    }
}

impl Classify for TransferError {
    fn kind(&self) -> ErrorKind {
        match self {
            TransferError::Curl(e) => classify_curl_error(e),
            TransferError::Http(code) => classify_http_status(*code),
            TransferError::Incomplete { .. }
            | TransferError::EmptyArtifact
            | TransferError::StalePartial { .. } => ErrorKind::Incomplete,
            TransferError::Storage(e) => classify_io_error(e),
            TransferError::Cancelled => ErrorKind::Cancelled,
        }
    }
}
