//! `Encoder` backed by the ffmpeg command-line tool.

use std::ffi::OsString;
use std::path::Path;
use std::process::{Command, Stdio};

use super::{AssemblyError, Encoder};
use crate::config::EncoderConfig;

/// Lines of ffmpeg stderr kept in an `EncoderFailed` error.
const STDERR_TAIL_LINES: usize = 20;

/// Runs ffmpeg with a fixed argument template per operation.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    cfg: EncoderConfig,
}

impl FfmpegEncoder {
    pub fn new(cfg: EncoderConfig) -> Self {
        Self { cfg }
    }

    fn base_args() -> Vec<OsString> {
        ["-hide_banner", "-loglevel", "error", "-y"]
            .iter()
            .map(OsString::from)
            .collect()
    }

    /// Copy the video track, re-encode audio to the configured codec/bitrate.
    pub fn mux_args(&self, video: &Path, audio: &Path, output: &Path) -> Vec<OsString> {
        let mut args = Self::base_args();
        args.push("-i".into());
        args.push(video.into());
        args.push("-i".into());
        args.push(audio.into());
        for a in ["-map", "0:v:0", "-map", "1:a:0", "-c:v", "copy", "-c:a"] {
            args.push(a.into());
        }
        args.push(self.cfg.audio_codec.as_str().into());
        args.push("-b:a".into());
        args.push(self.cfg.audio_bitrate.as_str().into());
        args.push(output.into());
        args
    }

    /// Drop any video, encode audio at a fixed VBR quality.
    pub fn transcode_args(&self, audio: &Path, output: &Path) -> Vec<OsString> {
        let mut args = Self::base_args();
        args.push("-i".into());
        args.push(audio.into());
        args.push("-vn".into());
        args.push("-c:a".into());
        args.push(self.cfg.audio_only_codec.as_str().into());
        args.push("-q:a".into());
        args.push(self.cfg.audio_only_quality.to_string().into());
        args.push(output.into());
        args
    }

    fn run(&self, args: Vec<OsString>) -> Result<(), AssemblyError> {
        let program = self.cfg.program.clone();
        tracing::debug!(program = %program, ?args, "running encoder");
        let out = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|source| AssemblyError::Spawn {
                program: program.clone(),
                source,
            })?;
        if out.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&out.stderr);
        let lines: Vec<&str> = stderr.lines().collect();
        let tail = lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("\n");
        Err(AssemblyError::EncoderFailed {
            program,
            status: out.status.to_string(),
            stderr: tail,
        })
    }
}

impl Encoder for FfmpegEncoder {
    fn mux(&self, video: &Path, audio: &Path, output: &Path) -> Result<(), AssemblyError> {
        self.run(self.mux_args(video, audio, output))
    }

    fn transcode_audio(&self, audio: &Path, output: &Path) -> Result<(), AssemblyError> {
        self.run(self.transcode_args(audio, output))
    }
}
