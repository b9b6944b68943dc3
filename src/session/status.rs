use chrono::{DateTime, Utc};
use serde::Serialize;

use super::state::SessionPhase;

/// Snapshot of a session for the hosting surface
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub session_id: String,
    pub phase: SessionPhase,
    pub opened_at: DateTime<Utc>,
    pub has_captured_audio: bool,
    pub error_detail: Option<String>,
}
