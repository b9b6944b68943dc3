use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::audio::{CaptureError, CapturedAudio};
use crate::transcribe::TranscriptionResult;

/// Lifecycle phase of a recording session.
///
/// A plain discriminant mirror of [`SessionState`] for status reporting and
/// assertions; the state itself carries the per-phase payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    Recording,
    Captured,
    Submitting,
    Completed,
    Failed,
}

impl SessionPhase {
    pub fn label(self) -> &'static str {
        match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Recording => "recording",
            SessionPhase::Captured => "captured",
            SessionPhase::Submitting => "submitting",
            SessionPhase::Completed => "completed",
            SessionPhase::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Session lifecycle as a tagged variant so illegal combinations (recording
/// with a result, a failure without its buffer) are unrepresentable.
///
/// The captured buffer exists exactly in the four post-recording states and
/// survives a failed submission unchanged, so retry re-sends identical bytes.
#[derive(Debug)]
pub enum SessionState {
    Idle,
    Recording,
    Captured {
        audio: CapturedAudio,
    },
    Submitting {
        audio: CapturedAudio,
    },
    Completed {
        audio: CapturedAudio,
        result: TranscriptionResult,
    },
    Failed {
        audio: CapturedAudio,
        reason: String,
    },
}

impl SessionState {
    pub fn phase(&self) -> SessionPhase {
        match self {
            SessionState::Idle => SessionPhase::Idle,
            SessionState::Recording => SessionPhase::Recording,
            SessionState::Captured { .. } => SessionPhase::Captured,
            SessionState::Submitting { .. } => SessionPhase::Submitting,
            SessionState::Completed { .. } => SessionPhase::Completed,
            SessionState::Failed { .. } => SessionPhase::Failed,
        }
    }

    pub fn captured_audio(&self) -> Option<&CapturedAudio> {
        match self {
            SessionState::Idle | SessionState::Recording => None,
            SessionState::Captured { audio }
            | SessionState::Submitting { audio }
            | SessionState::Completed { audio, .. }
            | SessionState::Failed { audio, .. } => Some(audio),
        }
    }

    pub fn result(&self) -> Option<&TranscriptionResult> {
        match self {
            SessionState::Completed { result, .. } => Some(result),
            _ => None,
        }
    }

    pub fn error_detail(&self) -> Option<&str> {
        match self {
            SessionState::Failed { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

/// Errors surfaced by session operations
#[derive(Debug, Error)]
pub enum SessionError {
    /// The requested operation is not legal from the current phase
    #[error("cannot {op} while {phase}")]
    InvalidTransition {
        op: &'static str,
        phase: SessionPhase,
    },

    /// The controller has no open session
    #[error("no open session")]
    NotOpen,

    #[error(transparent)]
    Capture(#[from] CaptureError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_labels_are_snake_case() {
        assert_eq!(SessionPhase::Idle.label(), "idle");
        assert_eq!(SessionPhase::Submitting.label(), "submitting");
        assert_eq!(format!("{}", SessionPhase::Failed), "failed");
    }

    #[test]
    fn idle_and_recording_carry_no_buffer() {
        assert!(SessionState::Idle.captured_audio().is_none());
        assert!(SessionState::Recording.captured_audio().is_none());
        assert!(SessionState::Idle.error_detail().is_none());
        assert!(SessionState::Recording.result().is_none());
    }

    #[test]
    fn invalid_transition_names_the_operation_and_phase() {
        let err = SessionError::InvalidTransition {
            op: "submit",
            phase: SessionPhase::Idle,
        };
        assert_eq!(err.to_string(), "cannot submit while idle");
    }
}
