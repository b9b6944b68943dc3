use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request body sent to the voice endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct VoiceCommandRequest {
    /// Base64-encoded WAV bytes
    pub audio_base64: String,
}

/// Successful response from the speech-to-intent service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionResult {
    /// Transcribed text; empty when the service understood nothing
    pub transcript: String,
    /// Interpreted action. The shape is owned by the service and treated as
    /// opaque here; dispatching it is the hosting surface's concern.
    #[serde(rename = "ai_response")]
    pub intent: Value,
}

/// Failure body from the service
#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceError {
    pub error: String,
}
