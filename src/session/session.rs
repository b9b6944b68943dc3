use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use super::state::{SessionError, SessionPhase, SessionState};
use super::status::SessionStatus;
use crate::audio::{AudioCapture, CapturedAudio};
use crate::transcribe::{TranscribeError, TranscriptionResult};

/// What happened to a submission outcome when it came back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitDisposition {
    /// Applied; the session is now Completed
    Completed,
    /// Applied; the session is now Failed with the buffer retained
    Failed,
    /// The session was reset or torn down while the request was in flight;
    /// the outcome was dropped without touching state
    Discarded,
}

/// The state machine wrapping one capture-and-submit cycle.
///
/// Every operation is only legal from specific phases; anything else fails
/// with `InvalidTransition` and leaves the state untouched. The submission
/// exchange is split into `begin_submit` / `complete_submit` so the caller
/// can run the network request without holding the session, and so a late
/// outcome can be matched against the attempt that produced it.
pub struct RecordingSession {
    id: String,
    state: SessionState,
    capture: AudioCapture,
    /// Attempt counter; bumped per submission and on reset so a stale
    /// outcome can never be attributed to the wrong buffer.
    attempt: u64,
    opened_at: DateTime<Utc>,
}

impl RecordingSession {
    pub fn new(capture: AudioCapture) -> Self {
        let id = format!("voice-{}", Uuid::new_v4());
        info!("[{id}] session created");
        Self {
            id,
            state: SessionState::Idle,
            capture,
            attempt: 0,
            opened_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.phase()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn captured_audio(&self) -> Option<&CapturedAudio> {
        self.state.captured_audio()
    }

    pub fn result(&self) -> Option<&TranscriptionResult> {
        self.state.result()
    }

    pub fn error_detail(&self) -> Option<&str> {
        self.state.error_detail()
    }

    /// Whether the capture device is currently held
    pub fn device_held(&self) -> bool {
        self.capture.is_held()
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            session_id: self.id.clone(),
            phase: self.phase(),
            opened_at: self.opened_at,
            has_captured_audio: self.captured_audio().is_some(),
            error_detail: self.error_detail().map(str::to_string),
        }
    }

    /// Idle -> Recording. On `DeviceUnavailable` the session stays Idle and
    /// the error is surfaced to the caller.
    pub async fn start(&mut self) -> Result<(), SessionError> {
        match self.state.phase() {
            SessionPhase::Idle => {}
            phase => return Err(SessionError::InvalidTransition { op: "start", phase }),
        }

        self.capture.acquire().await?;
        if let Err(e) = self.capture.begin().await {
            // Acquisition succeeded but streaming did not; release before
            // surfacing so no track dangles.
            let _ = self.capture.end().await;
            return Err(e.into());
        }

        self.state = SessionState::Recording;
        info!(
            "[{}] recording started on {}",
            self.id,
            self.capture.backend_name()
        );
        Ok(())
    }

    /// Recording -> Captured. Buffer ownership moves into the session.
    pub async fn stop(&mut self) -> Result<(), SessionError> {
        match self.state.phase() {
            SessionPhase::Recording => {}
            phase => return Err(SessionError::InvalidTransition { op: "stop", phase }),
        }

        match self.capture.end().await {
            Ok(Some(audio)) => {
                info!(
                    "[{}] captured {} ms of audio ({} bytes)",
                    self.id,
                    audio.duration_ms(),
                    audio.bytes().len()
                );
                self.state = SessionState::Captured { audio };
                Ok(())
            }
            Ok(None) => {
                // end() found no collector; the device is released either way.
                self.state = SessionState::Idle;
                Err(SessionError::Capture(crate::audio::CaptureError::Stream(
                    "capture produced no buffer".to_string(),
                )))
            }
            Err(e) => {
                // The device was released before finalization failed.
                self.state = SessionState::Idle;
                Err(e.into())
            }
        }
    }

    /// Recording -> Idle. The device is released and the buffer discarded.
    pub async fn cancel(&mut self) -> Result<(), SessionError> {
        match self.state.phase() {
            SessionPhase::Recording => {}
            phase => return Err(SessionError::InvalidTransition { op: "cancel", phase }),
        }

        let released = self.capture.end().await;
        self.state = SessionState::Idle;
        info!("[{}] recording cancelled", self.id);
        released.map(|_| ()).map_err(Into::into)
    }

    /// Captured/Failed -> Submitting. Returns a snapshot of the buffer and
    /// the attempt token to pass back to [`complete_submit`]. The session
    /// retains the buffer, so a failed attempt can be retried without
    /// re-recording.
    pub fn begin_submit(&mut self) -> Result<(CapturedAudio, u64), SessionError> {
        let phase = self.state.phase();
        match std::mem::replace(&mut self.state, SessionState::Idle) {
            SessionState::Captured { audio } | SessionState::Failed { audio, .. } => {
                self.attempt += 1;
                let snapshot = audio.clone();
                self.state = SessionState::Submitting { audio };
                info!("[{}] submit attempt {}", self.id, self.attempt);
                Ok((snapshot, self.attempt))
            }
            other => {
                self.state = other;
                Err(SessionError::InvalidTransition { op: "submit", phase })
            }
        }
    }

    /// Apply the outcome of the exchange started by [`begin_submit`].
    ///
    /// The outcome is applied only if the attempt token matches and the
    /// session is still Submitting; otherwise it is discarded so a reset
    /// or torn-down session is never mutated by a late response.
    pub fn complete_submit(
        &mut self,
        attempt: u64,
        outcome: Result<TranscriptionResult, TranscribeError>,
    ) -> SubmitDisposition {
        if attempt != self.attempt || self.state.phase() != SessionPhase::Submitting {
            warn!(
                "[{}] discarding transcription outcome for stale attempt {attempt}",
                self.id
            );
            return SubmitDisposition::Discarded;
        }

        let audio = match std::mem::replace(&mut self.state, SessionState::Idle) {
            SessionState::Submitting { audio } => audio,
            other => {
                // Phase was checked above; restore and drop the outcome.
                self.state = other;
                return SubmitDisposition::Discarded;
            }
        };

        match outcome {
            Ok(result) => {
                info!("[{}] transcription completed: {:?}", self.id, result.transcript);
                self.state = SessionState::Completed { audio, result };
                SubmitDisposition::Completed
            }
            Err(e) => {
                let reason = e.reason();
                warn!("[{}] transcription failed: {reason}", self.id);
                self.state = SessionState::Failed { audio, reason };
                SubmitDisposition::Failed
            }
        }
    }

    /// Any state -> Idle. Forces device release, drops buffer and result,
    /// and invalidates any in-flight submission attempt.
    pub async fn reset(&mut self) -> Result<(), SessionError> {
        self.attempt += 1;
        self.state = SessionState::Idle;
        let released = self.capture.end().await;
        info!("[{}] session reset", self.id);
        released.map(|_| ()).map_err(Into::into)
    }
}
