//! Catalogue and job data types shared by selection, orchestration and the pool.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What a stream carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Video,
    Audio,
    VideoAudio,
}

impl MediaKind {
    pub fn has_video(self) -> bool {
        matches!(self, MediaKind::Video | MediaKind::VideoAudio)
    }

    pub fn has_audio(self) -> bool {
        matches!(self, MediaKind::Audio | MediaKind::VideoAudio)
    }
}

/// One available encoding of a remote asset, as reported by the resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    /// Opaque identifier, unique within a catalogue; compared numerically.
    pub format_id: String,
    pub media_kind: MediaKind,
    /// Total bitrate in kbit/s when known.
    pub bitrate: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub sample_rate: Option<u32>,
    pub channel_count: Option<u32>,
    /// Exact size in bytes when the resolver reports one.
    #[serde(default)]
    pub filesize: Option<u64>,
    /// Container extension without the dot (e.g. "mp4", "m4a", "webm").
    pub ext: String,
    /// Direct URL for the transfer engine.
    pub url: String,
}

impl StreamDescriptor {
    /// True when the descriptor carries picture dimensions.
    pub fn has_dimensions(&self) -> bool {
        self.width.is_some() || self.height.is_some()
    }

    /// Short human-readable label used in logs and `avfetch formats`.
    pub fn label(&self) -> String {
        let mut s = format!("{} [{}]", self.format_id, self.ext);
        if let (Some(w), Some(h)) = (self.width, self.height) {
            s.push_str(&format!(" {}x{}", w, h));
        }
        if let Some(br) = self.bitrate {
            s.push_str(&format!(" {:.0}k", br));
        }
        if let Some(sr) = self.sample_rate {
            s.push_str(&format!(" {}Hz", sr));
        }
        s
    }
}

/// One playlist entry (or the single item of a non-playlist job).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobItem {
    pub id: String,
    pub title: String,
    /// URL handed back to the resolver to obtain this item's catalogue.
    pub source_ref: String,
    /// 1-based position in the playlist, when known.
    pub ordinal: Option<u32>,
}

impl JobItem {
    pub fn new(id: impl Into<String>, title: impl Into<String>, source_ref: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            source_ref: source_ref.into(),
            ordinal: None,
        }
    }

    pub fn with_ordinal(mut self, ordinal: u32) -> Self {
        self.ordinal = Some(ordinal);
        self
    }

    /// Key for this item's temporary directory. Includes the ordinal so that a
    /// playlist listing the same video twice still gets two distinct directories.
    pub fn temp_key(&self) -> String {
        let id = crate::naming::sanitize_filename(&self.id);
        let id = if id.is_empty() { "item".to_string() } else { id };
        match self.ordinal {
            Some(n) => format!("{:04}-{}", n, id),
            None => id,
        }
    }
}

/// Terminal record for one processed item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutcome {
    pub item: JobItem,
    pub succeeded: bool,
    pub output_path: Option<PathBuf>,
    pub failure_reason: Option<String>,
}

impl JobOutcome {
    pub fn done(item: JobItem, output_path: PathBuf) -> Self {
        Self {
            item,
            succeeded: true,
            output_path: Some(output_path),
            failure_reason: None,
        }
    }

    pub fn failed(item: JobItem, reason: impl Into<String>) -> Self {
        Self {
            item,
            succeeded: false,
            output_path: None,
            failure_reason: Some(reason.into()),
        }
    }
}
