//! Job orchestrator: drives one item from source URL to finished file.
//!
//! `Resolving → Selecting → Downloading(video) → Downloading(audio) →
//! Assembling → CleaningUp → Done`, with `Failed(reason)` reachable from every
//! non-terminal state. Blocking work (resolver, curl, encoder, cleanup) runs
//! on the blocking pool so a job never stalls the async workers. Whatever
//! happens, the caller gets a `JobOutcome`.

mod context;
mod error;
mod state;

pub use context::JobContext;
pub use error::JobError;
pub use state::JobState;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::assemble::{self, AssemblyInputs};
use crate::model::{JobItem, JobOutcome, StreamDescriptor};
use crate::naming::{ItemLayout, StreamRole};
use crate::resolver::ResolveError;
use crate::retry::run_with_retry;
use crate::select::{select, Mode};
use crate::transfer::{transfer_with_retry, ProgressReporter};

/// Resolves `item.source_ref`, then downloads and assembles it.
pub async fn run_item(ctx: &JobContext, item: JobItem) -> JobOutcome {
    let mut job = Job::new(ctx, item);
    let result = job.drive(None).await;
    job.finish(result)
}

/// Same as [`run_item`] for a caller that already holds the catalogue.
pub async fn run_resolved(ctx: &JobContext, item: JobItem, catalogue: Vec<StreamDescriptor>) -> JobOutcome {
    let mut job = Job::new(ctx, item);
    let result = job.drive(Some(catalogue)).await;
    job.finish(result)
}

struct Job<'a> {
    ctx: &'a JobContext,
    item: JobItem,
    state: JobState,
}

impl<'a> Job<'a> {
    fn new(ctx: &'a JobContext, item: JobItem) -> Self {
        Self {
            ctx,
            item,
            state: JobState::Pending,
        }
    }

    fn enter(&mut self, next: JobState) {
        debug_assert!(!self.state.is_terminal(), "transition out of {}", self.state);
        tracing::info!(item = %self.item.id, from = %self.state, to = %next, "job state");
        self.state = next;
    }

    fn layout(&self) -> ItemLayout {
        ItemLayout::new(
            &self.ctx.output_dir,
            &self.item,
            self.ctx.playlist_title.as_deref(),
            &self.ctx.output_ext,
        )
    }

    /// Existing output and no overwrite: nothing to do.
    fn existing_output(&self) -> Option<PathBuf> {
        if self.ctx.overwrite || self.item.title.is_empty() {
            return None;
        }
        let out = self.layout().output_path;
        out.is_file().then_some(out)
    }

    fn finish(mut self, result: Result<PathBuf, JobError>) -> JobOutcome {
        match result {
            Ok(path) => {
                self.enter(JobState::Done);
                JobOutcome::done(self.item, path)
            }
            Err(e) => {
                let reason = e.to_string();
                tracing::warn!(item = %self.item.id, "item failed: {}", reason);
                self.enter(JobState::Failed(reason.clone()));
                JobOutcome::failed(self.item, reason)
            }
        }
    }

    async fn drive(&mut self, catalogue: Option<Vec<StreamDescriptor>>) -> Result<PathBuf, JobError> {
        self.ctx.cancel.check()?;
        if let Some(out) = self.existing_output() {
            tracing::info!(item = %self.item.id, path = %out.display(), "output exists; skipping");
            return Ok(out);
        }

        let catalogue = match catalogue {
            Some(c) => c,
            None => {
                self.enter(JobState::Resolving);
                let catalogue = self.resolve().await?;
                if let Some(out) = self.existing_output() {
                    tracing::info!(item = %self.item.id, path = %out.display(), "output exists; skipping");
                    return Ok(out);
                }
                catalogue
            }
        };

        self.ctx.cancel.check()?;
        self.enter(JobState::Selecting);
        let selection = select(&catalogue, self.ctx.select);
        let audio = selection
            .best_audio
            .ok_or(JobError::NoSuitableStream(StreamRole::Audio))?;
        let video = match self.ctx.select.mode {
            Mode::Merge => Some(
                selection
                    .best_video
                    .ok_or(JobError::NoSuitableStream(StreamRole::Video))?,
            ),
            Mode::AudioOnly => None,
        };
        tracing::debug!(
            item = %self.item.id,
            video = %video.as_ref().map(|v| v.label()).unwrap_or_default(),
            audio = %audio.label(),
            "selected streams"
        );

        let layout = self.layout();
        std::fs::create_dir_all(&layout.temp_dir)?;

        let video_path = match &video {
            Some(v) => {
                self.ctx.cancel.check()?;
                self.enter(JobState::Downloading(StreamRole::Video));
                let path = layout.stream_path(StreamRole::Video, v);
                self.download(StreamRole::Video, v, &path).await?;
                Some(path)
            }
            None => None,
        };

        self.ctx.cancel.check()?;
        self.enter(JobState::Downloading(StreamRole::Audio));
        let audio_path = layout.stream_path(StreamRole::Audio, &audio);
        if let Err(e) = self.download(StreamRole::Audio, &audio, &audio_path).await {
            // The partial audio stays as a resume checkpoint; the finished
            // video is useless on its own. Cancellation keeps both.
            if let (Some(v), false) = (&video_path, matches!(e, JobError::Cancelled)) {
                self.cleanup(vec![v.clone()], None).await;
            }
            return Err(e);
        }

        self.ctx.cancel.check()?;
        self.enter(JobState::Assembling);
        let inputs = AssemblyInputs {
            mode: self.ctx.select.mode,
            video: video_path.clone(),
            audio: audio_path.clone(),
            output: layout.output_path.clone(),
        };
        let encoder = Arc::clone(&self.ctx.encoder);
        let output = tokio::task::spawn_blocking(move || assemble::assemble(encoder.as_ref(), &inputs))
            .await
            .map_err(JobError::worker_fault)??;

        self.enter(JobState::CleaningUp);
        let temp_files = video_path.into_iter().chain([audio_path]).collect();
        self.cleanup(temp_files, Some(layout.temp_dir)).await;

        Ok(output)
    }

    async fn resolve(&mut self) -> Result<Vec<StreamDescriptor>, JobError> {
        let resolver = Arc::clone(&self.ctx.resolver);
        let policy = self.ctx.resolve_retry;
        let cancel = self.ctx.cancel.clone();
        let source_ref = self.item.source_ref.clone();
        let proxy = self.ctx.proxy.clone();
        let resolved = tokio::task::spawn_blocking(move || {
            run_with_retry(&policy, &cancel, |_| ResolveError::Cancelled, |_| {
                resolver.resolve(&source_ref, proxy.as_deref())
            })
        })
        .await
        .map_err(JobError::worker_fault)??;

        if resolved.is_playlist() {
            return Err(JobError::UnexpectedPlaylist);
        }
        if self.item.title.is_empty() {
            self.item.title = resolved.title;
        }
        Ok(resolved.catalogue)
    }

    /// One stream, holding a transfer slot for the whole download.
    async fn download(&self, role: StreamRole, stream: &StreamDescriptor, dest: &Path) -> Result<u64, JobError> {
        let _permit = self.ctx.budget.acquire().await;
        self.ctx.cancel.check()?;

        let label = match self.item.ordinal {
            Some(n) if self.ctx.playlist_title.is_some() => format!("{:02} {} [{}]", n, self.item.title, role),
            _ => format!("{} [{}]", self.item.title, role),
        };
        let reporter = self.ctx.progress.clone().map(|tx| ProgressReporter::new(tx, label));
        let url = stream.url.clone();
        let expected_total = stream.filesize;
        let dest = dest.to_path_buf();
        let opts = self.ctx.transfer.clone();
        let policy = self.ctx.transfer_retry;
        let cancel = self.ctx.cancel.clone();
        tracing::debug!(item = %self.item.id, %role, format_id = %stream.format_id, path = %dest.display(), "downloading stream");

        let bytes = tokio::task::spawn_blocking(move || {
            transfer_with_retry(&url, &dest, expected_total, &opts, &policy, reporter.as_ref(), &cancel)
        })
        .await
        .map_err(JobError::worker_fault)?
        .map_err(|e| JobError::transfer(role, e))?;
        Ok(bytes)
    }

    /// Best effort; never changes the outcome.
    async fn cleanup(&self, files: Vec<PathBuf>, temp_dir: Option<PathBuf>) {
        let policy = self.ctx.cleanup;
        let res = tokio::task::spawn_blocking(move || {
            let warnings = assemble::cleanup_temp_files(&files, &policy);
            // Only the item's own directory: the shared root may be in use by
            // another item that is creating its directory right now.
            if let Some(dir) = temp_dir {
                assemble::remove_dir_if_empty(&dir);
            }
            warnings.len()
        })
        .await;
        match res {
            Ok(0) => {}
            Ok(n) => tracing::warn!(item = %self.item.id, "{} temp file(s) left behind", n),
            Err(e) => tracing::warn!(item = %self.item.id, "cleanup task failed: {}", e),
        }
    }
}
