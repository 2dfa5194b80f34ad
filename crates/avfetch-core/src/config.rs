use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::assemble::CleanupPolicy;
use crate::retry::{Backoff, RetryPolicy};
use crate::select::{Mode, SelectOptions};
use crate::transfer::{ProgressThrottle, TransferOptions};

/// Bounds for `playlist_concurrency` and `fragment_concurrency`.
pub const CONCURRENCY_RANGE: std::ops::RangeInclusive<usize> = 1..=10;

/// Transfer retry policy (optional section in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts per stream (including the first).
    pub max_attempts: u32,
    /// Delay in seconds between attempts (base delay for exponential backoff).
    pub delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
    pub backoff: Backoff,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let p = RetryPolicy::for_transfers();
        Self {
            max_attempts: p.max_attempts,
            delay_secs: p.base_delay.as_secs_f64(),
            max_delay_secs: p.max_delay.as_secs(),
            backoff: p.backoff,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        let base_delay = Duration::from_secs_f64(self.delay_secs.max(0.0));
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            base_delay,
            max_delay: Duration::from_secs(self.max_delay_secs).max(base_delay),
            backoff: self.backoff,
        }
    }
}

/// Temp-file deletion after assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupConfig {
    pub max_attempts: u32,
    pub delay_ms: u64,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        let p = CleanupPolicy::default();
        Self {
            max_attempts: p.max_attempts,
            delay_ms: p.delay.as_millis() as u64,
        }
    }
}

impl CleanupConfig {
    pub fn policy(&self) -> CleanupPolicy {
        CleanupPolicy {
            max_attempts: self.max_attempts.max(1),
            delay: Duration::from_millis(self.delay_ms),
        }
    }
}

/// External encoder program and its fixed codec settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    pub program: String,
    /// Audio codec when muxing (video is always stream-copied).
    pub audio_codec: String,
    pub audio_bitrate: String,
    /// Codec for audio-only output.
    pub audio_only_codec: String,
    /// VBR quality for audio-only output (`-q:a`).
    pub audio_only_quality: u8,
    pub merge_ext: String,
    pub audio_only_ext: String,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            program: "ffmpeg".into(),
            audio_codec: "aac".into(),
            audio_bitrate: "192k".into(),
            audio_only_codec: "libmp3lame".into(),
            audio_only_quality: 2,
            merge_ext: "mp4".into(),
            audio_only_ext: "mp3".into(),
        }
    }
}

impl EncoderConfig {
    /// Output file extension for `mode`.
    pub fn output_ext(&self, mode: Mode) -> &str {
        match mode {
            Mode::Merge => &self.merge_ext,
            Mode::AudioOnly => &self.audio_only_ext,
        }
    }
}

/// Curl tuning for stream transfers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Receive buffer size in bytes (None = curl default).
    pub buffer_size: Option<usize>,
    pub connect_timeout_secs: u64,
    /// Bytes/s below which a transfer counts as stalled.
    pub low_speed_limit: u32,
    pub low_speed_time_secs: u64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        let o = TransferOptions::default();
        Self {
            buffer_size: o.buffer_size,
            connect_timeout_secs: o.connect_timeout.as_secs(),
            low_speed_limit: o.low_speed_limit,
            low_speed_time_secs: o.low_speed_time.as_secs(),
        }
    }
}

/// Global configuration loaded from `~/.config/avfetch/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// `scheme://host:port`, used for both resolution and transfers.
    pub proxy: Option<String>,
    /// Produce audio-only files instead of merged video.
    pub only_audio: bool,
    /// Exclude combined audio+video streams from audio selection.
    pub pure_audio: bool,
    /// Playlist items processed at once.
    pub playlist_concurrency: usize,
    /// Stream transfers in flight at once across all items.
    pub fragment_concurrency: usize,
    /// Where finished files go (None = current directory).
    pub output_dir: Option<PathBuf>,
    /// Re-download items whose output file already exists.
    pub overwrite: bool,
    pub resolver_program: String,
    pub retry: RetryConfig,
    pub cleanup: CleanupConfig,
    pub encoder: EncoderConfig,
    pub transfer: TransferConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            only_audio: false,
            pure_audio: true,
            playlist_concurrency: 3,
            fragment_concurrency: 4,
            output_dir: None,
            overwrite: false,
            resolver_program: "yt-dlp".into(),
            retry: RetryConfig::default(),
            cleanup: CleanupConfig::default(),
            encoder: EncoderConfig::default(),
            transfer: TransferConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        if !CONCURRENCY_RANGE.contains(&self.playlist_concurrency) {
            bail!(
                "playlist_concurrency must be between 1 and 10 (got {})",
                self.playlist_concurrency
            );
        }
        if !CONCURRENCY_RANGE.contains(&self.fragment_concurrency) {
            bail!(
                "fragment_concurrency must be between 1 and 10 (got {})",
                self.fragment_concurrency
            );
        }
        if let Some(proxy) = &self.proxy {
            validate_proxy(proxy)?;
        }
        Ok(())
    }

    pub fn mode(&self) -> Mode {
        if self.only_audio {
            Mode::AudioOnly
        } else {
            Mode::Merge
        }
    }

    pub fn select_options(&self) -> SelectOptions {
        SelectOptions {
            mode: self.mode(),
            pure_audio: self.pure_audio,
        }
    }

    pub fn transfer_options(&self) -> TransferOptions {
        TransferOptions {
            proxy: self.proxy.clone(),
            buffer_size: self.transfer.buffer_size,
            connect_timeout: Duration::from_secs(self.transfer.connect_timeout_secs),
            low_speed_limit: self.transfer.low_speed_limit,
            low_speed_time: Duration::from_secs(self.transfer.low_speed_time_secs),
            progress_interval: ProgressThrottle::DEFAULT_INTERVAL,
        }
    }
}

/// Accepts `scheme://host:port` with an http(s) or socks scheme.
pub fn validate_proxy(proxy: &str) -> Result<()> {
    let url = url::Url::parse(proxy).with_context(|| format!("invalid proxy {:?}", proxy))?;
    match url.scheme() {
        "http" | "https" | "socks4" | "socks4a" | "socks5" | "socks5h" => {}
        other => bail!("unsupported proxy scheme {:?} in {:?}", other, proxy),
    }
    if url.host_str().map_or(true, str::is_empty) {
        bail!("proxy {:?} has no host", proxy);
    }
    if url.port_or_known_default().is_none() {
        bail!("proxy {:?} has no port", proxy);
    }
    Ok(())
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("avfetch")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<AppConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = AppConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

/// Load and validate configuration from an explicit file.
pub fn load_from_path(path: &Path) -> Result<AppConfig> {
    let data = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let cfg: AppConfig =
        toml::from_str(&data).with_context(|| format!("parsing {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.playlist_concurrency, 3);
        assert_eq!(cfg.fragment_concurrency, 4);
        assert!(cfg.pure_audio);
        assert!(!cfg.only_audio);
        assert_eq!(cfg.retry.policy(), RetryPolicy::for_transfers());
        assert_eq!(cfg.cleanup.policy(), CleanupPolicy::default());
        assert_eq!(cfg.encoder.output_ext(Mode::Merge), "mp4");
        assert_eq!(cfg.encoder.output_ext(Mode::AudioOnly), "mp3");
        cfg.validate().unwrap();
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = AppConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: AppConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn config_toml_partial_file_uses_defaults() {
        let toml = r#"
            proxy = "http://127.0.0.1:7890"
            only_audio = true
            playlist_concurrency = 5

            [retry]
            max_attempts = 3
            backoff = "exponential"
        "#;
        let cfg: AppConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.proxy.as_deref(), Some("http://127.0.0.1:7890"));
        assert_eq!(cfg.mode(), Mode::AudioOnly);
        assert_eq!(cfg.playlist_concurrency, 5);
        assert_eq!(cfg.fragment_concurrency, 4);
        assert_eq!(cfg.retry.max_attempts, 3);
        assert_eq!(cfg.retry.backoff, Backoff::Exponential);
        assert_eq!(cfg.encoder, EncoderConfig::default());
        cfg.validate().unwrap();
        assert_eq!(
            cfg.transfer_options().proxy.as_deref(),
            Some("http://127.0.0.1:7890")
        );
    }

    #[test]
    fn concurrency_out_of_range_is_rejected() {
        let mut cfg = AppConfig::default();
        cfg.playlist_concurrency = 0;
        assert!(cfg.validate().is_err());
        cfg.playlist_concurrency = 10;
        cfg.validate().unwrap();
        cfg.fragment_concurrency = 11;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn proxy_validation() {
        validate_proxy("http://127.0.0.1:7890").unwrap();
        validate_proxy("socks5://localhost:1080").unwrap();
        assert!(validate_proxy("127.0.0.1:7890").is_err());
        assert!(validate_proxy("ftp://host:21").is_err());
        assert!(validate_proxy("not a url").is_err());
    }

    #[test]
    fn load_from_path_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "fragment_concurrency = 0\n").unwrap();
        let err = load_from_path(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("fragment_concurrency"));

        fs::write(&path, "fragment_concurrency = 2\n").unwrap();
        assert_eq!(load_from_path(&path).unwrap().fragment_concurrency, 2);
    }
}
