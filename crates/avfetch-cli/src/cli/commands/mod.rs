//! CLI command handlers. Each command is in its own file.

mod config;
mod formats;
mod get;
mod progress;

pub use config::run_config;
pub use formats::run_formats;
pub use get::run_get;

use anyhow::{Context, Result};
use avfetch_core::config::{self as core_config, AppConfig};
use avfetch_core::control::CancelToken;
use avfetch_core::resolver::{ResolvedSource, Resolver};
use avfetch_core::retry::{run_with_retry, RetryPolicy};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Command-line values that take precedence over the config file.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Overrides {
    pub audio_only: bool,
    pub proxy: Option<String>,
    pub jobs: Option<usize>,
    pub fragments: Option<usize>,
    pub output_dir: Option<PathBuf>,
    pub overwrite: bool,
}

impl Overrides {
    pub fn apply(self, cfg: &mut AppConfig) {
        if self.audio_only {
            cfg.only_audio = true;
        }
        if self.proxy.is_some() {
            cfg.proxy = self.proxy;
        }
        if let Some(n) = self.jobs {
            cfg.playlist_concurrency = n;
        }
        if let Some(n) = self.fragments {
            cfg.fragment_concurrency = n;
        }
        if self.output_dir.is_some() {
            cfg.output_dir = self.output_dir;
        }
        if self.overwrite {
            cfg.overwrite = true;
        }
    }
}

/// Loads the config file (explicit path or the XDG default), applies the
/// command-line overrides and validates the result.
pub fn effective_config(path: Option<&Path>, overrides: Overrides) -> Result<AppConfig> {
    let mut cfg = match path {
        Some(p) => core_config::load_from_path(p)?,
        None => core_config::load_or_init()?,
    };
    overrides.apply(&mut cfg);
    cfg.validate().context("invalid options")?;
    Ok(cfg)
}

/// Resolves `url` on a blocking thread with the resolution retry policy.
pub(crate) async fn resolve_source(
    resolver: Arc<dyn Resolver>,
    url: &str,
    proxy: Option<String>,
    cancel: CancelToken,
) -> Result<ResolvedSource> {
    let source_ref = url.to_string();
    let policy = RetryPolicy::for_resolution();
    let resolved = tokio::task::spawn_blocking(move || {
        run_with_retry(
            &policy,
            &cancel,
            |_| avfetch_core::resolver::ResolveError::Cancelled,
            |_| resolver.resolve(&source_ref, proxy.as_deref()),
        )
    })
    .await
    .context("resolver task")?
    .with_context(|| format!("resolving {}", url))?;
    Ok(resolved)
}
