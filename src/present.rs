//! Intent presentation
//!
//! Pure mapping from a transcription outcome to a display-ready structure.
//! Dispatching the interpreted action (recording the sale, the expense, the
//! stock movement) belongs to the surface hosting the pipeline, not here.

use serde::Serialize;
use serde_json::Value;

use crate::transcribe::TranscriptionResult;

/// Display-ready view of one transcription outcome
#[derive(Debug, Clone, Serialize)]
pub struct IntentDisplay {
    /// What the service heard; empty string when it understood nothing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    /// The raw interpreted action, exposed for inspection or dispatch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<Value>,
    /// Failure reason when the attempt did not complete
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Expose a successful result unchanged
pub fn present(result: &TranscriptionResult) -> IntentDisplay {
    IntentDisplay {
        transcript: Some(result.transcript.clone()),
        intent: Some(result.intent.clone()),
        error: None,
    }
}

/// Expose a failure reason as a user-facing message
pub fn present_failure(reason: &str) -> IntentDisplay {
    IntentDisplay {
        transcript: None,
        intent: None,
        error: Some(reason.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn present_exposes_transcript_and_intent_unchanged() {
        let result = TranscriptionResult {
            transcript: "vends 3 sachets".to_string(),
            intent: json!({"intent": "record_sale", "quantity": 3}),
        };

        let display = present(&result);
        assert_eq!(display.transcript.as_deref(), Some("vends 3 sachets"));
        assert_eq!(display.intent, Some(json!({"intent": "record_sale", "quantity": 3})));
        assert!(display.error.is_none());
    }

    #[test]
    fn present_keeps_empty_transcript() {
        let result = TranscriptionResult {
            transcript: String::new(),
            intent: json!({}),
        };
        let display = present(&result);
        assert_eq!(display.transcript.as_deref(), Some(""));
    }

    #[test]
    fn present_failure_carries_only_the_reason() {
        let display = present_failure("asr_timeout");
        assert!(display.transcript.is_none());
        assert!(display.intent.is_none());
        assert_eq!(display.error.as_deref(), Some("asr_timeout"));
    }

    #[test]
    fn display_serializes_without_absent_fields() {
        let json = serde_json::to_value(present_failure("oops")).unwrap();
        assert_eq!(json, json!({"error": "oops"}));
    }
}
