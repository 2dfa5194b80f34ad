use crate::model::JobOutcome;

/// Result of a playlist run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaylistReport {
    /// One entry per item that was started, in playlist order.
    pub outcomes: Vec<JobOutcome>,
    /// Items submitted.
    pub total: usize,
    pub cancelled: bool,
}

impl PlaylistReport {
    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded).count()
    }

    pub fn failure_count(&self) -> usize {
        self.outcomes.len() - self.success_count()
    }

    /// Items never dequeued (only non-zero after cancellation).
    pub fn not_started(&self) -> usize {
        self.total.saturating_sub(self.outcomes.len())
    }

    pub fn failures(&self) -> impl Iterator<Item = &JobOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded)
    }

    pub fn all_succeeded(&self) -> bool {
        !self.cancelled && self.success_count() == self.total
    }

    /// "N/M succeeded".
    pub fn summary(&self) -> String {
        format!("{}/{} succeeded", self.success_count(), self.total)
    }
}
