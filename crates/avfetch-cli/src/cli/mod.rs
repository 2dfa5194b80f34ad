//! CLI for the avfetch media downloader.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::{effective_config, run_config, run_formats, run_get, Overrides};

/// Top-level CLI for avfetch.
#[derive(Debug, Parser)]
#[command(name = "avfetch")]
#[command(about = "avfetch: download and merge the best video and audio streams", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download a video or a whole playlist.
    Get {
        /// Page or playlist URL.
        url: String,
        /// Produce an audio-only file instead of merged video.
        #[arg(long)]
        audio_only: bool,
        /// Proxy for resolution and transfers, as scheme://host:port.
        #[arg(long, value_name = "URL")]
        proxy: Option<String>,
        /// Playlist items processed at once (1-10).
        #[arg(long, short = 'j', value_name = "N")]
        jobs: Option<usize>,
        /// Stream transfers in flight at once across all items (1-10).
        #[arg(long, value_name = "N")]
        fragments: Option<usize>,
        /// Directory for finished files (default: config output_dir, else current directory).
        #[arg(long, short = 'o', value_name = "DIR")]
        output_dir: Option<PathBuf>,
        /// Re-download items whose output file already exists.
        #[arg(long)]
        overwrite: bool,
        /// Use this config file instead of ~/.config/avfetch/config.toml.
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// List the available streams and the ones that would be selected.
    Formats {
        /// Page URL.
        url: String,
        /// Show the audio-only selection.
        #[arg(long)]
        audio_only: bool,
        /// Proxy for resolution, as scheme://host:port.
        #[arg(long, value_name = "URL")]
        proxy: Option<String>,
        /// Use this config file instead of ~/.config/avfetch/config.toml.
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// Show the config file location and the effective configuration.
    Config,
}

impl CliCommand {
    /// Returns `Ok(false)` when the command ran but something failed (or was cancelled).
    pub async fn run_from_args() -> Result<bool> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Get {
                url,
                audio_only,
                proxy,
                jobs,
                fragments,
                output_dir,
                overwrite,
                config,
            } => {
                let cfg = effective_config(
                    config.as_deref(),
                    Overrides {
                        audio_only,
                        proxy,
                        jobs,
                        fragments,
                        output_dir,
                        overwrite,
                    },
                )?;
                tracing::debug!("effective config: {:?}", cfg);
                run_get(&cfg, &url).await
            }
            CliCommand::Formats {
                url,
                audio_only,
                proxy,
                config,
            } => {
                let cfg = effective_config(
                    config.as_deref(),
                    Overrides {
                        audio_only,
                        proxy,
                        ..Overrides::default()
                    },
                )?;
                run_formats(&cfg, &url).await?;
                Ok(true)
            }
            CliCommand::Config => {
                run_config()?;
                Ok(true)
            }
        }
    }
}

#[cfg(test)]
mod tests;
