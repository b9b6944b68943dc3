//! Session controller
//!
//! The user-facing entry point corresponding to the voice-command modal.
//! Composes capture, session, transcription client, and presentation behind
//! `open` / `start_recording` / `stop_recording` / `cancel` / `submit` /
//! `close`, and guarantees device release on every exit path.

use tokio::sync::Mutex;
use tracing::info;

use crate::audio::{AudioCapture, CaptureBackend, CaptureConfig, CapturedAudio};
use crate::present::{self, IntentDisplay};
use crate::session::{
    RecordingSession, SessionError, SessionPhase, SessionStatus, SubmitDisposition,
};
use crate::transcribe::TranscriptionClient;

type BackendFactory = Box<dyn Fn() -> Box<dyn CaptureBackend> + Send + Sync>;

pub struct SessionController {
    client: TranscriptionClient,
    capture_config: CaptureConfig,
    backend_factory: BackendFactory,
    /// The one active session, None while the surface is closed. All
    /// mutating operations serialize through this lock; `submit` releases
    /// it across the network exchange so `close` can run mid-flight.
    inner: Mutex<Option<RecordingSession>>,
}

impl SessionController {
    pub fn new<F>(client: TranscriptionClient, capture_config: CaptureConfig, factory: F) -> Self
    where
        F: Fn() -> Box<dyn CaptureBackend> + Send + Sync + 'static,
    {
        Self {
            client,
            capture_config,
            backend_factory: Box::new(factory),
            inner: Mutex::new(None),
        }
    }

    /// Open the voice-command surface with a fresh Idle session.
    pub async fn open(&self) -> Result<(), SessionError> {
        let mut guard = self.inner.lock().await;
        if let Some(session) = guard.as_ref() {
            return Err(SessionError::InvalidTransition {
                op: "open",
                phase: session.phase(),
            });
        }

        let capture = AudioCapture::new((self.backend_factory)(), self.capture_config.clone());
        *guard = Some(RecordingSession::new(capture));
        Ok(())
    }

    pub async fn is_open(&self) -> bool {
        self.inner.lock().await.is_some()
    }

    pub async fn phase(&self) -> Option<SessionPhase> {
        self.inner.lock().await.as_ref().map(|s| s.phase())
    }

    pub async fn status(&self) -> Option<SessionStatus> {
        self.inner.lock().await.as_ref().map(|s| s.status())
    }

    /// The captured buffer, for playback preview before submitting
    pub async fn preview(&self) -> Option<CapturedAudio> {
        self.inner
            .lock()
            .await
            .as_ref()
            .and_then(|s| s.captured_audio().cloned())
    }

    pub async fn start_recording(&self) -> Result<(), SessionError> {
        let mut guard = self.inner.lock().await;
        let session = guard.as_mut().ok_or(SessionError::NotOpen)?;
        session.start().await
    }

    pub async fn stop_recording(&self) -> Result<(), SessionError> {
        let mut guard = self.inner.lock().await;
        let session = guard.as_mut().ok_or(SessionError::NotOpen)?;
        session.stop().await
    }

    pub async fn cancel(&self) -> Result<(), SessionError> {
        let mut guard = self.inner.lock().await;
        let session = guard.as_mut().ok_or(SessionError::NotOpen)?;
        session.cancel().await
    }

    /// Discard the current attempt and return to Idle for a re-record.
    pub async fn reset(&self) -> Result<(), SessionError> {
        let mut guard = self.inner.lock().await;
        let session = guard.as_mut().ok_or(SessionError::NotOpen)?;
        session.reset().await
    }

    /// Submit the captured buffer to the transcription service.
    ///
    /// Returns the display-ready outcome: transcript plus intent on
    /// completion, the failure reason on a failed attempt. Returns
    /// `Ok(None)` when the session was closed or reset while the request
    /// was in flight; the late outcome is logged and discarded.
    pub async fn submit(&self, bearer: &str) -> Result<Option<IntentDisplay>, SessionError> {
        let (audio, attempt) = {
            let mut guard = self.inner.lock().await;
            let session = guard.as_mut().ok_or(SessionError::NotOpen)?;
            session.begin_submit()?
        };

        // Lock released: the exchange is a suspension point during which
        // close/reset may run.
        let outcome = self.client.submit(&audio, bearer).await;

        let mut guard = self.inner.lock().await;
        let Some(session) = guard.as_mut() else {
            info!("session closed during submission; dropping outcome");
            return Ok(None);
        };

        let display = match session.complete_submit(attempt, outcome) {
            SubmitDisposition::Completed => session.result().map(present::present),
            SubmitDisposition::Failed => session.error_detail().map(present::present_failure),
            SubmitDisposition::Discarded => None,
        };
        Ok(display)
    }

    /// Close the surface. Whatever the current phase, the device is
    /// released and buffers are dropped; re-`open` starts from Idle.
    pub async fn close(&self) -> Result<(), SessionError> {
        let mut guard = self.inner.lock().await;
        match guard.take() {
            Some(mut session) => {
                let released = session.reset().await;
                info!("[{}] session closed", session.id());
                released
            }
            None => Ok(()),
        }
    }
}
