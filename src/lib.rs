pub mod audio;
pub mod config;
pub mod controller;
pub mod present;
pub mod session;
pub mod transcribe;

pub use audio::{
    AudioCapture, AudioFrame, CaptureBackend, CaptureConfig, CaptureError, CapturedAudio,
    MicBackend,
};
pub use config::Config;
pub use controller::SessionController;
pub use present::{present, present_failure, IntentDisplay};
pub use session::{
    RecordingSession, SessionError, SessionPhase, SessionState, SessionStatus, SubmitDisposition,
};
pub use transcribe::{TranscribeError, TranscriptionClient, TranscriptionResult};
