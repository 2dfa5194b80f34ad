//! Output and temporary file layout.
//!
//! Every job writes its temporary streams into its own directory under
//! `<output_dir>/.avfetch-tmp/<temp_key>/`, so no two items (even two entries
//! for the same video in one playlist) ever share a temp path. Final files go
//! to `<output_dir>/<title>.<ext>` or, for playlists,
//! `<output_dir>/<playlist>/<NN> - <title>.<ext>`.

mod sanitize;

pub use sanitize::{sanitize_component, sanitize_filename};

use std::path::{Path, PathBuf};

use crate::model::{JobItem, StreamDescriptor};

/// Directory under the output root that holds per-item temp directories.
pub const TEMP_ROOT: &str = ".avfetch-tmp";

/// Suffix for in-progress stream files.
pub const PART_SUFFIX: &str = ".part";

/// Fallback when a title sanitizes to nothing.
const UNTITLED: &str = "untitled";

/// Title budget leaves room for the ordinal prefix and extension.
const TITLE_MAX: usize = 200;

/// Which stream a temp file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamRole {
    Video,
    Audio,
}

impl StreamRole {
    pub fn as_str(self) -> &'static str {
        match self {
            StreamRole::Video => "video",
            StreamRole::Audio => "audio",
        }
    }
}

impl std::fmt::Display for StreamRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-item paths: where temp streams live and where the result goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemLayout {
    pub temp_dir: PathBuf,
    pub output_path: PathBuf,
}

impl ItemLayout {
    /// Builds the layout for `item`. `playlist_title` puts the output in a
    /// subdirectory named after the playlist and prefixes the ordinal.
    pub fn new(
        output_dir: &Path,
        item: &JobItem,
        playlist_title: Option<&str>,
        output_ext: &str,
    ) -> Self {
        let title = title_or_untitled(&item.title);
        let (dir, stem) = match playlist_title {
            Some(playlist) => {
                let dir = output_dir.join(title_or_untitled(playlist));
                let stem = match item.ordinal {
                    Some(n) => format!("{:02} - {}", n, title),
                    None => title,
                };
                (dir, stem)
            }
            None => (output_dir.to_path_buf(), title),
        };
        Self {
            temp_dir: output_dir.join(TEMP_ROOT).join(item.temp_key()),
            output_path: dir.join(format!("{}.{}", stem, output_ext)),
        }
    }

    /// Temp path for one stream, e.g. `<temp_dir>/video.mp4.part`.
    pub fn stream_path(&self, role: StreamRole, stream: &StreamDescriptor) -> PathBuf {
        let ext = sanitize_component(&stream.ext, 16);
        let ext = if ext.is_empty() { "bin".to_string() } else { ext };
        self.temp_dir
            .join(format!("{}.{}{}", role.as_str(), ext, PART_SUFFIX))
    }
}

fn title_or_untitled(title: &str) -> String {
    let s = sanitize_component(title, TITLE_MAX);
    if s.is_empty() {
        UNTITLED.to_string()
    } else {
        s
    }
}
