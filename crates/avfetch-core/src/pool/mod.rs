//! Playlist worker pool.
//!
//! A fixed set of async workers pulls items from a shared queue until it is
//! empty or the run is cancelled. Each item runs in its own task so a panic
//! inside a job is recorded as that item's failure and the worker moves on.

mod report;

pub use report::PlaylistReport;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc::UnboundedSender;

use crate::config::CONCURRENCY_RANGE;
use crate::job::{self, JobContext, JobError};
use crate::model::{JobItem, JobOutcome};

type WorkQueue = Arc<Mutex<VecDeque<JobItem>>>;

/// Runs every item of a playlist with up to `concurrency` items in flight.
///
/// `concurrency` is clamped to 1..=10 and to the number of items. Each outcome
/// is also sent to `events` as soon as it is known. Items still queued when
/// `ctx.cancel` fires are not started and show up in `not_started()`.
pub async fn run_playlist(
    ctx: Arc<JobContext>,
    items: Vec<JobItem>,
    concurrency: usize,
    events: Option<UnboundedSender<JobOutcome>>,
) -> PlaylistReport {
    let total = items.len();
    let workers = concurrency
        .clamp(*CONCURRENCY_RANGE.start(), *CONCURRENCY_RANGE.end())
        .min(total);
    let queue: WorkQueue = Arc::new(Mutex::new(
        items
            .into_iter()
            .enumerate()
            .map(|(i, item)| match item.ordinal {
                Some(_) => item,
                None => item.with_ordinal(i as u32 + 1),
            })
            .collect(),
    ));
    tracing::info!(total, workers, "starting playlist");

    let mut join_set = tokio::task::JoinSet::new();
    for worker_id in 0..workers {
        let ctx = Arc::clone(&ctx);
        let queue = Arc::clone(&queue);
        let events = events.clone();
        join_set.spawn(worker(worker_id, ctx, queue, events));
    }

    let mut outcomes = Vec::with_capacity(total);
    while let Some(res) = join_set.join_next().await {
        match res {
            Ok(done) => outcomes.extend(done),
            Err(e) => tracing::error!("playlist worker task failed: {}", e),
        }
    }
    outcomes.sort_by_key(|o: &JobOutcome| o.item.ordinal);
    ctx.sweep_temp_root();

    let report = PlaylistReport {
        outcomes,
        total,
        cancelled: ctx.cancel.is_cancelled(),
    };
    tracing::info!(cancelled = report.cancelled, "playlist finished: {}", report.summary());
    report
}

fn next_item(queue: &WorkQueue) -> Option<JobItem> {
    queue.lock().unwrap_or_else(|e| e.into_inner()).pop_front()
}

async fn worker(
    worker_id: usize,
    ctx: Arc<JobContext>,
    queue: WorkQueue,
    events: Option<UnboundedSender<JobOutcome>>,
) -> Vec<JobOutcome> {
    let mut done = Vec::new();
    loop {
        if ctx.cancel.is_cancelled() {
            tracing::debug!(worker_id, "cancelled; not taking more items");
            break;
        }
        let Some(item) = next_item(&queue) else {
            break;
        };
        tracing::debug!(worker_id, item = %item.id, ordinal = ?item.ordinal, "took item");

        let job_ctx = Arc::clone(&ctx);
        let job_item = item.clone();
        let outcome = match tokio::spawn(async move { job::run_item(&job_ctx, job_item).await }).await {
            Ok(outcome) => outcome,
            Err(e) => {
                let err = JobError::worker_fault(e);
                tracing::error!(worker_id, item = %item.id, "{}", err);
                JobOutcome::failed(item, err.to_string())
            }
        };
        if let Some(tx) = &events {
            let _ = tx.send(outcome.clone());
        }
        done.push(outcome);
    }
    done
}
