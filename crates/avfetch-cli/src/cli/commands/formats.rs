//! `avfetch formats` – show the catalogue and the selection without downloading.

use anyhow::Result;
use avfetch_core::config::AppConfig;
use avfetch_core::control::CancelToken;
use avfetch_core::resolver::YtDlpResolver;
use avfetch_core::select::select;
use std::sync::Arc;

use super::resolve_source;

pub async fn run_formats(cfg: &AppConfig, url: &str) -> Result<()> {
    let resolver = Arc::new(YtDlpResolver::new(cfg.resolver_program.clone()));
    let resolved = resolve_source(resolver, url, cfg.proxy.clone(), CancelToken::new()).await?;

    if let Some(entries) = &resolved.entries {
        println!("Playlist \"{}\" ({} item(s)):", resolved.title, entries.len());
        for e in entries {
            println!("  {:>3}  {}  {}", e.ordinal.unwrap_or(0), e.id, e.title);
        }
        return Ok(());
    }

    println!("{} ({} stream(s)):", resolved.title, resolved.catalogue.len());
    for d in &resolved.catalogue {
        println!("  {:<12} {}", format!("{:?}", d.media_kind), d.label());
    }
    let selection = select(&resolved.catalogue, cfg.select_options());
    let show = |d: Option<&avfetch_core::model::StreamDescriptor>| {
        d.map(|d| d.label()).unwrap_or_else(|| "none".to_string())
    };
    if cfg.only_audio {
        println!("Selected audio: {}", show(selection.best_audio.as_ref()));
    } else {
        println!("Selected video: {}", show(selection.best_video.as_ref()));
        println!("Selected audio: {}", show(selection.best_audio.as_ref()));
    }
    Ok(())
}
