use crate::assemble::AssemblyError;
use crate::control::Cancelled;
use crate::naming::StreamRole;
use crate::resolver::ResolveError;
use crate::transfer::TransferError;

/// Why an item ended in `Failed`. The display string is the reported reason.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("no suitable {0} stream")]
    NoSuitableStream(StreamRole),
    #[error("resolve failed: {0}")]
    Resolve(#[source] ResolveError),
    #[error("source is a playlist, not a single item")]
    UnexpectedPlaylist,
    #[error("{role} download failed: {source}")]
    Transfer {
        role: StreamRole,
        #[source]
        source: TransferError,
    },
    #[error("assembly failed: {0}")]
    Assembly(#[from] AssemblyError),
    #[error("cancelled")]
    Cancelled,
    #[error("worker fault: {0}")]
    WorkerFault(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl From<Cancelled> for JobError {
    fn from(_: Cancelled) -> Self {
        JobError::Cancelled
    }
}

impl From<ResolveError> for JobError {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::Cancelled => JobError::Cancelled,
            other => JobError::Resolve(other),
        }
    }
}

impl JobError {
    pub fn transfer(role: StreamRole, source: TransferError) -> Self {
        match source {
            TransferError::Cancelled => JobError::Cancelled,
            source => JobError::Transfer { role, source },
        }
    }

    pub fn worker_fault(e: tokio::task::JoinError) -> Self {
        if e.is_panic() {
            let payload = e.into_panic();
            let msg = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "panic".to_string());
            JobError::WorkerFault(msg)
        } else {
            JobError::WorkerFault(e.to_string())
        }
    }
}
