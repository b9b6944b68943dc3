//! Recording session state machine
//!
//! One `RecordingSession` covers one capture-and-submit cycle:
//! Idle -> Recording -> Captured -> Submitting -> Completed/Failed,
//! with `cancel` and `reset` edges back to Idle. Illegal operations fail
//! with `InvalidTransition` and never silently no-op.

mod session;
mod state;
mod status;

pub use session::{RecordingSession, SubmitDisposition};
pub use state::{SessionError, SessionPhase, SessionState};
pub use status::SessionStatus;
