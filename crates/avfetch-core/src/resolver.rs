//! Resolver interface for turning a page URL into a stream catalogue.
//!
//! The orchestrator only depends on the [`Resolver`] trait. [`YtDlpResolver`]
//! is the production implementation: it runs yt-dlp once per URL and parses
//! its JSON dump.

use std::process::{Command, Stdio};

use serde::Deserialize;

use crate::model::{JobItem, MediaKind, StreamDescriptor};
use crate::retry::{Classify, ErrorKind};

/// What a source URL resolves to.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResolvedSource {
    /// Extractor id of the video or playlist.
    pub id: String,
    pub title: String,
    /// Streams of a single item. Empty for playlists.
    pub catalogue: Vec<StreamDescriptor>,
    /// Playlist entries, each resolved again on its own.
    pub entries: Option<Vec<JobItem>>,
}

impl ResolvedSource {
    pub fn is_playlist(&self) -> bool {
        self.entries.is_some()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },
    #[error("unreadable resolver output: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("cancelled")]
    Cancelled,
}

impl From<crate::control::Cancelled> for ResolveError {
    fn from(_: crate::control::Cancelled) -> Self {
        ResolveError::Cancelled
    }
}

impl Classify for ResolveError {
    fn kind(&self) -> ErrorKind {
        match self {
            ResolveError::Failed { stderr, .. } => classify_resolver_stderr(stderr),
            ResolveError::Cancelled => ErrorKind::Cancelled,
            ResolveError::Spawn { .. } | ResolveError::Parse(_) => ErrorKind::Other,
        }
    }
}

/// yt-dlp reports network trouble only as text on stderr.
fn classify_resolver_stderr(stderr: &str) -> ErrorKind {
    let s = stderr.to_ascii_lowercase();
    if s.contains("http error 429") || s.contains("too many requests") {
        ErrorKind::Throttled
    } else if s.contains("timed out") {
        ErrorKind::Timeout
    } else if s.contains("http error 5") {
        ErrorKind::Http5xx(500)
    } else if s.contains("connection") || s.contains("temporary failure in name resolution") {
        ErrorKind::Connection
    } else {
        ErrorKind::Other
    }
}

/// Turns a source URL into a catalogue or a list of playlist entries.
/// Implementations block; callers run them on a blocking thread.
pub trait Resolver: Send + Sync {
    fn resolve(&self, source_ref: &str, proxy: Option<&str>) -> Result<ResolvedSource, ResolveError>;
}

/// Runs `yt-dlp --dump-single-json --flat-playlist`.
#[derive(Debug, Clone)]
pub struct YtDlpResolver {
    program: String,
}

impl Default for YtDlpResolver {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

impl YtDlpResolver {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn args(url: &str, proxy: Option<&str>) -> Vec<String> {
        let mut args = vec![
            "--dump-single-json".to_string(),
            "--flat-playlist".to_string(),
            "--no-warnings".to_string(),
        ];
        if let Some(p) = proxy {
            args.push("--proxy".to_string());
            args.push(p.to_string());
        }
        args.push(url.to_string());
        args
    }
}

impl Resolver for YtDlpResolver {
    fn resolve(&self, source_ref: &str, proxy: Option<&str>) -> Result<ResolvedSource, ResolveError> {
        let args = Self::args(source_ref, proxy);
        tracing::debug!(program = %self.program, ?args, "running resolver");
        let out = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| ResolveError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        if !out.status.success() {
            return Err(ResolveError::Failed {
                program: self.program.clone(),
                status: out.status.to_string(),
                stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            });
        }
        parse_dump(&out.stdout)
    }
}

#[derive(Debug, Deserialize)]
struct Dump {
    #[serde(rename = "_type")]
    kind: Option<String>,
    id: Option<String>,
    title: Option<String>,
    #[serde(default)]
    formats: Vec<RawFormat>,
    entries: Option<Vec<Option<RawEntry>>>,
}

#[derive(Debug, Deserialize)]
struct RawFormat {
    format_id: Option<String>,
    vcodec: Option<String>,
    acodec: Option<String>,
    tbr: Option<f64>,
    abr: Option<f64>,
    vbr: Option<f64>,
    width: Option<u32>,
    height: Option<u32>,
    asr: Option<u32>,
    audio_channels: Option<u32>,
    ext: Option<String>,
    url: Option<String>,
    protocol: Option<String>,
    filesize: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    id: Option<String>,
    title: Option<String>,
    url: Option<String>,
    webpage_url: Option<String>,
}

fn codec_present(codec: Option<&str>, hint: bool) -> bool {
    match codec {
        Some(c) => c != "none",
        None => hint,
    }
}

impl RawFormat {
    fn into_descriptor(self) -> Option<StreamDescriptor> {
        // HLS/DASH/f4m/ism urls point at a manifest, not at the media bytes.
        if let Some(p) = self.protocol.as_deref() {
            if !matches!(p, "http" | "https") {
                return None;
            }
        }
        let url = self.url.filter(|u| !u.is_empty())?;
        let has_video = codec_present(self.vcodec.as_deref(), self.height.is_some());
        let has_audio = codec_present(self.acodec.as_deref(), self.asr.is_some());
        let media_kind = match (has_video, has_audio) {
            (true, true) => MediaKind::VideoAudio,
            (true, false) => MediaKind::Video,
            (false, true) => MediaKind::Audio,
            (false, false) => return None,
        };
        let bitrate = self.tbr.or(match (self.abr, self.vbr) {
            (Some(a), Some(v)) => Some(a + v),
            (a, v) => a.or(v),
        });
        Some(StreamDescriptor {
            format_id: self.format_id.unwrap_or_default(),
            media_kind,
            bitrate,
            width: self.width,
            height: self.height,
            sample_rate: self.asr,
            channel_count: self.audio_channels,
            filesize: self.filesize.filter(|&n| n > 0),
            ext: self.ext.unwrap_or_default(),
            url,
        })
    }
}

/// Parses a `--dump-single-json` document.
pub fn parse_dump(json: &[u8]) -> Result<ResolvedSource, ResolveError> {
    let dump: Dump = serde_json::from_slice(json)?;
    let id = dump.id.unwrap_or_default();
    let title = dump
        .title
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| if id.is_empty() { "untitled".to_string() } else { id.clone() });

    let is_playlist = dump.kind.as_deref() == Some("playlist") || dump.entries.is_some();
    if is_playlist {
        let entries = dump
            .entries
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .filter_map(|(i, e)| {
                let e = e?;
                let source_ref = e.url.or(e.webpage_url)?;
                let id = e.id.unwrap_or_else(|| format!("entry{}", i + 1));
                let title = e.title.unwrap_or_else(|| id.clone());
                Some(JobItem::new(id, title, source_ref).with_ordinal(i as u32 + 1))
            })
            .collect();
        return Ok(ResolvedSource {
            id,
            title,
            catalogue: Vec::new(),
            entries: Some(entries),
        });
    }

    let catalogue = dump
        .formats
        .into_iter()
        .filter_map(RawFormat::into_descriptor)
        .collect();
    Ok(ResolvedSource {
        id,
        title,
        catalogue,
        entries: None,
    })
}
