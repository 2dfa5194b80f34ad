//! `avfetch get` – download one video or a whole playlist.

use anyhow::{Context, Result};
use avfetch_core::assemble::FfmpegEncoder;
use avfetch_core::config::AppConfig;
use avfetch_core::control::CancelToken;
use avfetch_core::job::{self, JobContext};
use avfetch_core::model::JobItem;
use avfetch_core::pool;
use avfetch_core::resolver::{Resolver, YtDlpResolver};
use avfetch_core::transfer::TransferProgress;
use std::sync::Arc;

use super::progress::{format_outcome, print_outcomes, print_progress};
use super::resolve_source;

/// Returns `Ok(true)` only when every item succeeded and nothing was cancelled.
pub async fn run_get(cfg: &AppConfig, url: &str) -> Result<bool> {
    let output_dir = match &cfg.output_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("current directory")?,
    };

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\ninterrupted; stopping (partial files are kept for resume)");
                cancel.cancel();
            }
        });
    }

    let resolver: Arc<dyn Resolver> = Arc::new(YtDlpResolver::new(cfg.resolver_program.clone()));
    let encoder = Arc::new(FfmpegEncoder::new(cfg.encoder.clone()));

    println!("Resolving {} ...", url);
    let resolved = resolve_source(Arc::clone(&resolver), url, cfg.proxy.clone(), cancel.clone()).await?;

    let (progress_tx, progress_rx) = tokio::sync::mpsc::channel::<TransferProgress>(64);
    let progress_handle = tokio::spawn(print_progress(progress_rx));
    let ctx = JobContext::from_config(cfg, &output_dir, resolver, encoder)
        .with_cancel(cancel.clone())
        .with_progress(progress_tx);

    let ok = match resolved.entries {
        Some(entries) => {
            println!("Playlist \"{}\": {} item(s)", resolved.title, entries.len());
            let ctx = Arc::new(ctx.with_playlist_title(resolved.title.clone()));
            let (events_tx, events_rx) = tokio::sync::mpsc::unbounded_channel();
            let outcomes_handle = tokio::spawn(print_outcomes(events_rx));

            let report = pool::run_playlist(ctx, entries, cfg.playlist_concurrency, Some(events_tx)).await;
            let _ = outcomes_handle.await;
            let _ = progress_handle.await;

            if report.cancelled {
                println!("Cancelled; {} item(s) not started.", report.not_started());
            }
            println!("{}", report.summary());
            report.all_succeeded()
        }
        None => {
            let item = JobItem::new(resolved.id, resolved.title, url);
            let outcome = job::run_resolved(&ctx, item, resolved.catalogue).await;
            ctx.sweep_temp_root();
            drop(ctx);
            let _ = progress_handle.await;

            let line = format_outcome(&outcome);
            if outcome.succeeded {
                println!("{}", line);
            } else {
                eprintln!("{}", line);
            }
            println!("{}/1 succeeded", u8::from(outcome.succeeded));
            outcome.succeeded && !cancel.is_cancelled()
        }
    };
    Ok(ok)
}
