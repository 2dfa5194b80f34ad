use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::assemble::{remove_dir_if_empty, CleanupPolicy, Encoder};
use crate::config::AppConfig;
use crate::control::CancelToken;
use crate::naming::TEMP_ROOT;
use crate::resolver::Resolver;
use crate::retry::RetryPolicy;
use crate::select::SelectOptions;
use crate::transfer::{TransferBudget, TransferOptions, TransferProgress};

/// Everything a job needs besides its item. Shared read-only by all workers.
#[derive(Clone)]
pub struct JobContext {
    /// Root for outputs and the temp tree.
    pub output_dir: PathBuf,
    pub select: SelectOptions,
    /// Extension of the assembled file, without the dot.
    pub output_ext: String,
    pub transfer: TransferOptions,
    pub transfer_retry: RetryPolicy,
    pub resolve_retry: RetryPolicy,
    pub cleanup: CleanupPolicy,
    pub budget: TransferBudget,
    pub resolver: Arc<dyn Resolver>,
    pub encoder: Arc<dyn Encoder>,
    pub cancel: CancelToken,
    pub progress: Option<mpsc::Sender<TransferProgress>>,
    /// Re-fetch items whose output already exists.
    pub overwrite: bool,
    /// Passed to the resolver; transfers use `transfer.proxy`.
    pub proxy: Option<String>,
    /// Set for playlist runs: outputs go to `<output_dir>/<playlist_title>/`.
    pub playlist_title: Option<String>,
}

impl JobContext {
    /// Context with built-in defaults (merge mode, mp4 output, 4 transfer slots).
    pub fn new(output_dir: impl Into<PathBuf>, resolver: Arc<dyn Resolver>, encoder: Arc<dyn Encoder>) -> Self {
        Self::from_config(&AppConfig::default(), output_dir, resolver, encoder)
    }

    pub fn from_config(
        cfg: &AppConfig,
        output_dir: impl Into<PathBuf>,
        resolver: Arc<dyn Resolver>,
        encoder: Arc<dyn Encoder>,
    ) -> Self {
        Self {
            output_dir: output_dir.into(),
            select: cfg.select_options(),
            output_ext: cfg.encoder.output_ext(cfg.mode()).to_string(),
            transfer: cfg.transfer_options(),
            transfer_retry: cfg.retry.policy(),
            resolve_retry: RetryPolicy::for_resolution(),
            cleanup: cfg.cleanup.policy(),
            budget: TransferBudget::new(cfg.fragment_concurrency),
            resolver,
            encoder,
            cancel: CancelToken::new(),
            progress: None,
            overwrite: cfg.overwrite,
            proxy: cfg.proxy.clone(),
            playlist_title: None,
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, tx: mpsc::Sender<TransferProgress>) -> Self {
        self.progress = Some(tx);
        self
    }

    pub fn with_playlist_title(mut self, title: impl Into<String>) -> Self {
        self.playlist_title = Some(title.into());
        self
    }

    /// Shared parent of every item's temp directory.
    pub fn temp_root(&self) -> PathBuf {
        self.output_dir.join(TEMP_ROOT)
    }

    /// Removes the temp root if no item left anything behind. Call once no
    /// job using this context is running.
    pub fn sweep_temp_root(&self) {
        remove_dir_if_empty(&self.temp_root());
    }
}
