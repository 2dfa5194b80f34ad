use std::fmt;

use crate::naming::StreamRole;

/// Lifecycle of one item. `Failed` is reachable from every non-terminal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Resolving,
    Selecting,
    Downloading(StreamRole),
    Assembling,
    CleaningUp,
    Done,
    Failed(String),
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Done | JobState::Failed(_))
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Pending => f.write_str("pending"),
            JobState::Resolving => f.write_str("resolving"),
            JobState::Selecting => f.write_str("selecting"),
            JobState::Downloading(role) => write!(f, "downloading {}", role),
            JobState::Assembling => f.write_str("assembling"),
            JobState::CleaningUp => f.write_str("cleaning up"),
            JobState::Done => f.write_str("done"),
            JobState::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(JobState::Done.is_terminal());
        assert!(JobState::Failed("x".into()).is_terminal());
        assert!(!JobState::Downloading(StreamRole::Audio).is_terminal());
        assert!(!JobState::Pending.is_terminal());
    }

    #[test]
    fn display_names_the_stream() {
        assert_eq!(JobState::Downloading(StreamRole::Video).to_string(), "downloading video");
        assert_eq!(JobState::Failed("boom".into()).to_string(), "failed: boom");
    }
}
