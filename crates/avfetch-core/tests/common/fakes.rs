//! In-process stand-ins for the resolver and encoder.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use avfetch_core::assemble::{AssemblyError, Encoder};
use avfetch_core::model::{MediaKind, StreamDescriptor};
use avfetch_core::resolver::{ResolveError, ResolvedSource, Resolver};

/// Returns a fixed `ResolvedSource` per source ref; unknown refs fail.
#[derive(Default)]
pub struct MapResolver {
    pub sources: HashMap<String, ResolvedSource>,
}

impl MapResolver {
    pub fn insert(&mut self, source_ref: &str, source: ResolvedSource) {
        self.sources.insert(source_ref.to_string(), source);
    }
}

impl Resolver for MapResolver {
    fn resolve(&self, source_ref: &str, _: Option<&str>) -> Result<ResolvedSource, ResolveError> {
        self.sources
            .get(source_ref)
            .cloned()
            .ok_or_else(|| ResolveError::Failed {
                program: "fake-resolver".into(),
                status: "exit status: 1".into(),
                stderr: format!("ERROR: no such video {}", source_ref),
            })
    }
}

/// "Muxes" by concatenating inputs; fails for outputs whose name contains
/// `fail_marker`. Records every input pair it saw.
#[derive(Default)]
pub struct ConcatEncoder {
    pub fail_marker: Option<String>,
    pub inputs: Mutex<Vec<(Option<PathBuf>, PathBuf)>>,
}

impl ConcatEncoder {
    pub fn failing_on(marker: &str) -> Self {
        Self {
            fail_marker: Some(marker.to_string()),
            ..Self::default()
        }
    }

    fn check(&self, output: &Path) -> Result<(), AssemblyError> {
        let name = output.file_name().unwrap().to_string_lossy();
        match &self.fail_marker {
            Some(m) if name.contains(m.as_str()) => Err(AssemblyError::EncoderFailed {
                program: "fake-encoder".into(),
                status: "exit status: 1".into(),
                stderr: "Invalid data found when processing input".into(),
            }),
            _ => Ok(()),
        }
    }
}

impl Encoder for ConcatEncoder {
    fn mux(&self, video: &Path, audio: &Path, output: &Path) -> Result<(), AssemblyError> {
        self.inputs
            .lock()
            .unwrap()
            .push((Some(video.to_path_buf()), audio.to_path_buf()));
        self.check(output)?;
        let mut body = std::fs::read(video)?;
        body.extend(std::fs::read(audio)?);
        std::fs::write(output, body)?;
        Ok(())
    }

    fn transcode_audio(&self, audio: &Path, output: &Path) -> Result<(), AssemblyError> {
        self.inputs.lock().unwrap().push((None, audio.to_path_buf()));
        self.check(output)?;
        std::fs::copy(audio, output)?;
        Ok(())
    }
}

pub fn video_stream(format_id: &str, url: String) -> StreamDescriptor {
    StreamDescriptor {
        format_id: format_id.into(),
        media_kind: MediaKind::Video,
        bitrate: None,
        width: Some(1280),
        height: Some(720),
        sample_rate: None,
        channel_count: None,
        filesize: None,
        ext: "mp4".into(),
        url,
    }
}

pub fn audio_stream(format_id: &str, url: String) -> StreamDescriptor {
    StreamDescriptor {
        format_id: format_id.into(),
        media_kind: MediaKind::Audio,
        bitrate: None,
        width: None,
        height: None,
        sample_rate: Some(44100),
        channel_count: Some(2),
        filesize: None,
        ext: "m4a".into(),
        url,
    }
}

/// Deterministic test payload.
pub fn payload(seed: u8, len: usize) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
}
