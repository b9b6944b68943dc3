// Shared test fixtures: a scripted capture backend standing in for the
// microphone, and an in-process HTTP stub standing in for the
// speech-to-intent service.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::sync::mpsc;

use akompta_voice::{AudioFrame, CaptureBackend, CaptureError};

// ============================================================================
// Scripted capture backend
// ============================================================================

/// Device lifecycle counters for asserting the release invariant
#[derive(Debug, Default)]
pub struct DeviceCounters {
    pub acquires: AtomicUsize,
    /// Stop calls that actually found the device held; idempotent extra
    /// stops do not count.
    pub releases: AtomicUsize,
}

impl DeviceCounters {
    pub fn acquires(&self) -> usize {
        self.acquires.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

/// Capture backend that replays a fixed frame script.
///
/// `start` delivers every scripted frame in order and then closes the
/// channel, like a device whose callback went quiet.
#[derive(Clone)]
pub struct ScriptedBackend {
    frames: Vec<AudioFrame>,
    deny_acquire: bool,
    held: bool,
    counters: Arc<DeviceCounters>,
}

impl ScriptedBackend {
    pub fn new(frames: Vec<AudioFrame>) -> (Self, Arc<DeviceCounters>) {
        let counters = Arc::new(DeviceCounters::default());
        (
            Self {
                frames,
                deny_acquire: false,
                held: false,
                counters: Arc::clone(&counters),
            },
            counters,
        )
    }

    /// A backend whose device denies access, like a missing microphone or a
    /// rejected permission prompt.
    pub fn denying_access() -> (Self, Arc<DeviceCounters>) {
        let counters = Arc::new(DeviceCounters::default());
        (
            Self {
                frames: Vec::new(),
                deny_acquire: true,
                held: false,
                counters: Arc::clone(&counters),
            },
            counters,
        )
    }
}

#[async_trait::async_trait]
impl CaptureBackend for ScriptedBackend {
    async fn acquire(&mut self) -> Result<(), CaptureError> {
        if self.deny_acquire {
            return Err(CaptureError::DeviceUnavailable("permission denied".into()));
        }
        if self.held {
            return Err(CaptureError::AlreadyCapturing);
        }
        self.held = true;
        self.counters.acquires.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, CaptureError> {
        let (tx, rx) = mpsc::channel(100);
        let frames = self.frames.clone();
        tokio::spawn(async move {
            for frame in frames {
                if tx.send(frame).await.is_err() {
                    break;
                }
            }
        });
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        if self.held {
            self.held = false;
            self.counters.releases.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.held
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// A 100 ms mono frame whose samples encode the chunk index, so ordering is
/// visible in the finalized buffer.
pub fn chunk_frame(index: u64) -> AudioFrame {
    AudioFrame {
        samples: vec![(index as i16 + 1) * 100; 1600],
        sample_rate: 16000,
        channels: 1,
        timestamp_ms: index * 100,
    }
}

// ============================================================================
// Transcription service stub
// ============================================================================

/// One scripted answer from the stub service
pub enum StubResponse {
    /// 200 with the given JSON body
    Success(Value),
    /// Non-2xx with the given JSON body
    Error(u16, Value),
    /// 200 after a delay (for close-mid-flight and timeout cases)
    DelayedSuccess(Duration, Value),
    /// 200 with a body that is not the expected shape
    MalformedBody,
}

#[derive(Clone, Default)]
pub struct StubState {
    /// `audio_base64` payloads in arrival order
    pub received: Arc<Mutex<Vec<String>>>,
    /// `Authorization` headers in arrival order
    pub auth_headers: Arc<Mutex<Vec<String>>>,
    responses: Arc<Mutex<VecDeque<StubResponse>>>,
}

pub fn sale_response() -> Value {
    json!({
        "transcript": "vends 3 sachets",
        "ai_response": {"intent": "record_sale", "quantity": 3}
    })
}

/// Bind a stub transcription service on an ephemeral port and return the
/// base URL to point the client at, plus the shared state for assertions.
pub async fn spawn_stub(responses: Vec<StubResponse>) -> (String, StubState) {
    let state = StubState {
        received: Arc::new(Mutex::new(Vec::new())),
        auth_headers: Arc::new(Mutex::new(Vec::new())),
        responses: Arc::new(Mutex::new(responses.into())),
    };

    let app = Router::new()
        .route("/api/voice/process", post(handle_voice))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}/api"), state)
}

async fn handle_voice(
    State(state): State<StubState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let audio = body["audio_base64"].as_str().unwrap_or_default().to_string();
    state.received.lock().unwrap().push(audio);

    if let Some(auth) = headers.get("authorization") {
        state
            .auth_headers
            .lock()
            .unwrap()
            .push(auth.to_str().unwrap_or_default().to_string());
    }

    let next = state.responses.lock().unwrap().pop_front();
    match next.unwrap_or_else(|| StubResponse::Success(sale_response())) {
        StubResponse::Success(body) => (StatusCode::OK, Json(body)).into_response(),
        StubResponse::Error(status, body) => (
            StatusCode::from_u16(status).unwrap(),
            Json(body),
        )
            .into_response(),
        StubResponse::DelayedSuccess(delay, body) => {
            tokio::time::sleep(delay).await;
            (StatusCode::OK, Json(body)).into_response()
        }
        StubResponse::MalformedBody => (StatusCode::OK, "not what you expected").into_response(),
    }
}
