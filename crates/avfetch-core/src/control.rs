//! Cancellation for a running job or playlist.
//!
//! A single `CancelToken` is shared by the pool, every worker, the retry loop
//! and the transfer callbacks. Setting it stops further dequeuing and makes
//! in-flight transfers abandon within about a second, even on a stalled
//! connection, leaving their partial files in place for a later resume.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Error returned when work is stopped by the user (Ctrl-C).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cancelled by user")]
pub struct Cancelled;

/// Shared cancellation flag. Cheap to clone; all clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// `Err(Cancelled)` once cancellation was requested.
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }

    /// Blocking sleep that wakes early on cancellation (polls every 50ms).
    /// Returns `Err(Cancelled)` if the token was set before the delay elapsed.
    pub fn sleep(&self, delay: Duration) -> Result<(), Cancelled> {
        const TICK: Duration = Duration::from_millis(50);
        let deadline = Instant::now() + delay;
        loop {
            self.check()?;
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            std::thread::sleep((deadline - now).min(TICK));
        }
    }
}
