//! Transfer budget shared across concurrently running jobs.
//!
//! Each job holds one permit while a stream is downloading, so the number of
//! simultaneous HTTP transfers across the whole pool stays under
//! `fragment_concurrency`, independent of how many workers are running.

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[derive(Debug, Clone)]
pub struct TransferBudget {
    max_total: usize,
    permits: Arc<Semaphore>,
}

impl TransferBudget {
    /// Create a budget with the given maximum number of concurrent transfers.
    pub fn new(max_total: usize) -> Self {
        let max_total = max_total.max(1);
        Self {
            max_total,
            permits: Arc::new(Semaphore::new(max_total)),
        }
    }

    pub fn max_total(&self) -> usize {
        self.max_total
    }

    /// Slots currently free.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Slots currently held by running transfers.
    pub fn in_use(&self) -> usize {
        self.max_total - self.available()
    }

    /// Wait for a slot. The slot is released when the permit is dropped.
    pub async fn acquire(&self) -> OwnedSemaphorePermit {
        Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .expect("transfer budget semaphore is never closed")
    }
}
