use std::time::Duration;

use anyhow::{Context, Result};
use base64::Engine;
use thiserror::Error;
use tracing::info;

use super::messages::{ServiceError, TranscriptionResult, VoiceCommandRequest};
use crate::audio::CapturedAudio;

/// Failures of the transcription exchange
#[derive(Debug, Error)]
pub enum TranscribeError {
    /// Network-level failure: connection error, timeout, or a non-success
    /// status. Recoverable by re-submitting the retained buffer.
    #[error("transcription request failed: {0}")]
    Transport(String),

    /// The service answered 2xx but the body was not the expected shape
    #[error("malformed transcription response: {0}")]
    MalformedResponse(String),
}

impl TranscribeError {
    /// The failure reason recorded on the session and shown to the user
    pub fn reason(&self) -> String {
        match self {
            TranscribeError::Transport(reason) => reason.clone(),
            TranscribeError::MalformedResponse(_) => "malformed response".to_string(),
        }
    }
}

/// Client for the remote speech-to-intent service.
///
/// Performs exactly one request per submission; retry is a user decision
/// made at the session level, never here.
pub struct TranscriptionClient {
    http: reqwest::Client,
    endpoint: String,
}

impl TranscriptionClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            endpoint: format!("{}/voice/process", base_url.trim_end_matches('/')),
        })
    }

    /// Encode the captured buffer and exchange it for a transcription result.
    ///
    /// The bearer credential is supplied per call by the auth collaborator;
    /// an expired credential surfaces as a transport failure like any other
    /// non-success status.
    pub async fn submit(
        &self,
        audio: &CapturedAudio,
        bearer: &str,
    ) -> Result<TranscriptionResult, TranscribeError> {
        let request = VoiceCommandRequest {
            audio_base64: base64::engine::general_purpose::STANDARD.encode(audio.bytes()),
        };

        info!(
            "submitting {} bytes of audio ({} ms) to {}",
            audio.bytes().len(),
            audio.duration_ms(),
            self.endpoint
        );

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(bearer)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TranscribeError::Transport("request timed out".to_string())
                } else {
                    TranscribeError::Transport(format!("request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                TranscribeError::Transport("request timed out".to_string())
            } else {
                TranscribeError::Transport(format!("failed to read response: {e}"))
            }
        })?;

        if status.is_success() {
            return serde_json::from_slice::<TranscriptionResult>(&body)
                .map_err(|e| TranscribeError::MalformedResponse(e.to_string()));
        }

        // Prefer the service's own reason when the failure body carries one.
        let reason = serde_json::from_slice::<ServiceError>(&body)
            .map(|e| e.error)
            .unwrap_or_else(|_| format!("transcription service returned {status}"));
        Err(TranscribeError::Transport(reason))
    }
}
