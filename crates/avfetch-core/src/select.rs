//! Stream selection: pick the best video and best audio stream from a catalogue.
//!
//! Pure function over descriptors the resolver already fetched. Quality order:
//! bitrate when both the candidate and the current champion report one,
//! otherwise the numeric value of `format_id`. Suffixed ids such as `140-drc`
//! still rank by bitrate but lose any comparison that falls back to the id.
//! Descriptors with neither a usable bitrate nor a numeric id are skipped,
//! never scored as zero. Equal keys keep the first-seen champion.

use std::cmp::Ordering;

use crate::model::StreamDescriptor;

/// Whether the job produces a merged video or an audio-only file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Merge,
    AudioOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectOptions {
    pub mode: Mode,
    /// Exclude audio candidates that also carry picture dimensions
    /// (combined streams) from the audio partition.
    pub pure_audio: bool,
}

impl Default for SelectOptions {
    fn default() -> Self {
        Self {
            mode: Mode::Merge,
            pure_audio: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectionResult {
    pub best_video: Option<StreamDescriptor>,
    pub best_audio: Option<StreamDescriptor>,
}

/// Comparable quality key. Built only for descriptors with at least one
/// readable component.
#[derive(Debug, Clone, Copy)]
struct QualityKey {
    bitrate: Option<f64>,
    format_id: Option<u64>,
}

impl QualityKey {
    fn of(d: &StreamDescriptor) -> Option<Self> {
        let bitrate = match d.bitrate {
            Some(b) if !b.is_finite() || b < 0.0 => return None,
            other => other,
        };
        let format_id = d.format_id.trim().parse::<u64>().ok();
        if bitrate.is_none() && format_id.is_none() {
            return None;
        }
        Some(Self { bitrate, format_id })
    }

    /// `None` orders below any id, so a candidate without one never
    /// replaces the champion on the id fallback.
    fn compare(&self, other: &Self) -> Ordering {
        match (self.bitrate, other.bitrate) {
            (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            _ => self.format_id.cmp(&other.format_id),
        }
    }
}

/// Returns the best descriptor among `candidates`, first-seen on ties.
fn best_of<'a, I>(candidates: I) -> Option<&'a StreamDescriptor>
where
    I: IntoIterator<Item = &'a StreamDescriptor>,
{
    let mut champion: Option<(&StreamDescriptor, QualityKey)> = None;
    for d in candidates {
        let Some(key) = QualityKey::of(d) else {
            tracing::debug!(format_id = %d.format_id, "skipping stream with unreadable quality key");
            continue;
        };
        match champion {
            Some((_, ref best)) if key.compare(best) != Ordering::Greater => {}
            _ => champion = Some((d, key)),
        }
    }
    champion.map(|(d, _)| d)
}

/// Select the best video and audio streams for `opts.mode`.
///
/// An absent stream is not an error here; the orchestrator decides whether it
/// aborts the job (audio always required, video only in `Mode::Merge`).
pub fn select(catalogue: &[StreamDescriptor], opts: SelectOptions) -> SelectionResult {
    let best_video = match opts.mode {
        Mode::Merge => best_of(catalogue.iter().filter(|d| d.media_kind.has_video())),
        Mode::AudioOnly => None,
    };
    let best_audio = best_of(
        catalogue
            .iter()
            .filter(|d| d.media_kind.has_audio())
            .filter(|d| !opts.pure_audio || !d.has_dimensions()),
    );
    SelectionResult {
        best_video: best_video.cloned(),
        best_audio: best_audio.cloned(),
    }
}
