pub mod backend;
pub mod capture;
pub mod mic;

pub use backend::{AudioFrame, CaptureBackend, CaptureConfig, CaptureError};
pub use capture::{AudioCapture, CapturedAudio};
pub use mic::MicBackend;
