use thiserror::Error;
use tokio::sync::mpsc;

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Configuration for a capture backend
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Target sample rate (will downmix/decimate if needed)
    pub sample_rate: u32,
    /// Target channel count (1 = mono)
    pub channels: u16,
    /// Frame size in milliseconds (affects latency)
    pub buffer_duration_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000, // what the STT side expects
            channels: 1,        // Mono
            buffer_duration_ms: 100,
        }
    }
}

impl From<&crate::config::AudioConfig> for CaptureConfig {
    fn from(cfg: &crate::config::AudioConfig) -> Self {
        Self {
            sample_rate: cfg.sample_rate,
            channels: cfg.channels,
            buffer_duration_ms: cfg.buffer_duration_ms,
        }
    }
}

/// Errors from the capture device layer
#[derive(Debug, Error)]
pub enum CaptureError {
    /// No usable input device, or the platform denied access to it
    #[error("audio input device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The device is already held by this pipeline
    #[error("capture already in progress")]
    AlreadyCapturing,

    /// The device was acquired but the stream failed underneath us
    #[error("audio stream error: {0}")]
    Stream(String),
}

/// Audio capture backend trait
///
/// Implementations:
/// - `MicBackend`: default microphone via cpal, stream on a dedicated thread
/// - test backends that replay a scripted frame sequence
#[async_trait::async_trait]
pub trait CaptureBackend: Send {
    /// Request exclusive access to the input device.
    ///
    /// Fails with `DeviceUnavailable` when no device exists or access is
    /// denied, and with `AlreadyCapturing` when the device is already held.
    async fn acquire(&mut self) -> Result<(), CaptureError>;

    /// Start streaming. Returns a channel receiver that will receive audio
    /// frames in arrival order until `stop` is called.
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, CaptureError>;

    /// Stop streaming and release the device (stops every underlying track).
    ///
    /// Must be idempotent: stopping an idle backend is a no-op that still
    /// guarantees the device is not held afterwards.
    async fn stop(&mut self) -> Result<(), CaptureError>;

    /// Whether the backend currently holds the device
    fn is_capturing(&self) -> bool;

    /// Backend name for logging
    fn name(&self) -> &str;
}
