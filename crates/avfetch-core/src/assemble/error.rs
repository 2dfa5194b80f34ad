//! Assembly error type.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum AssemblyError {
    /// Merge mode needs a video input.
    #[error("missing {0} input")]
    MissingInput(&'static str),
    /// The encoder could not be started (not installed, not executable).
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    /// The encoder exited with a non-zero status.
    #[error("{program} exited with {status}: {stderr}")]
    EncoderFailed {
        program: String,
        status: String,
        stderr: String,
    },
    /// The encoder exited 0 but left no (or an empty) output file.
    #[error("encoder produced no output at {}", .0.display())]
    MissingOutput(PathBuf),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
