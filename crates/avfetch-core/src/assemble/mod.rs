//! Assembly stage: turn the downloaded stream(s) into the final file.
//!
//! The encoder writes to a hidden staging file next to the output, which is
//! renamed into place only after the encoder exits 0 and the staging file is
//! non-empty. A failed run never leaves a half-written output behind.

mod cleanup;
mod error;
mod ffmpeg;

use std::path::{Path, PathBuf};

use crate::select::Mode;

pub use cleanup::{cleanup_temp_files, remove_dir_if_empty, remove_with_retry, CleanupPolicy, CleanupWarning};
pub use error::AssemblyError;
pub use ffmpeg::FfmpegEncoder;

/// External encoder. Implementations block until the encoder exits.
pub trait Encoder: Send + Sync {
    /// Combine `video` and `audio` into `output`; video copied, audio re-encoded.
    fn mux(&self, video: &Path, audio: &Path, output: &Path) -> Result<(), AssemblyError>;

    /// Encode `audio` to `output`, dropping any picture.
    fn transcode_audio(&self, audio: &Path, output: &Path) -> Result<(), AssemblyError>;
}

#[derive(Debug, Clone)]
pub struct AssemblyInputs {
    pub mode: Mode,
    /// Required in `Mode::Merge`, ignored otherwise.
    pub video: Option<PathBuf>,
    pub audio: PathBuf,
    pub output: PathBuf,
}

/// Staging path for `output`: same directory, hidden, same extension (the
/// encoder picks its container from the extension).
pub fn staging_path(output: &Path) -> PathBuf {
    let name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let staged = match name.rsplit_once('.') {
        Some((stem, ext)) => format!(".{}.assembling.{}", stem, ext),
        None => format!(".{}.assembling", name),
    };
    output.with_file_name(staged)
}

/// Runs the encoder for `inputs.mode` and moves the result to `inputs.output`.
pub fn assemble(encoder: &dyn Encoder, inputs: &AssemblyInputs) -> Result<PathBuf, AssemblyError> {
    if let Some(parent) = inputs.output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let staging = staging_path(&inputs.output);

    let run = match inputs.mode {
        Mode::Merge => {
            let video = inputs.video.as_deref().ok_or(AssemblyError::MissingInput("video"))?;
            encoder.mux(video, &inputs.audio, &staging)
        }
        Mode::AudioOnly => encoder.transcode_audio(&inputs.audio, &staging),
    };
    if let Err(e) = run {
        let _ = std::fs::remove_file(&staging);
        return Err(e);
    }

    let len = std::fs::metadata(&staging).map(|m| m.len()).unwrap_or(0);
    if len == 0 {
        let _ = std::fs::remove_file(&staging);
        return Err(AssemblyError::MissingOutput(inputs.output.clone()));
    }
    std::fs::rename(&staging, &inputs.output)?;
    tracing::debug!(path = %inputs.output.display(), bytes = len, "assembled output");
    Ok(inputs.output.clone())
}
