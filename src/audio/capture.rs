use std::io::Cursor;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::backend::{CaptureBackend, CaptureConfig, CaptureError};

/// The finalized, immutable audio buffer produced by one recording.
///
/// Holds a complete WAV container so the buffer is self-describing on the
/// wire; clones re-send the identical bytes on retry.
#[derive(Debug, Clone)]
pub struct CapturedAudio {
    wav: Vec<u8>,
    sample_rate: u32,
    channels: u16,
    sample_count: usize,
}

impl CapturedAudio {
    /// The WAV container bytes
    pub fn bytes(&self) -> &[u8] {
        &self.wav
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Number of PCM samples across all channels
    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0;
        }
        let frames = self.sample_count as u64 / u64::from(self.channels);
        frames * 1000 / u64::from(self.sample_rate)
    }
}

/// What the collector task accumulated while the backend streamed.
#[derive(Debug, Default)]
struct Collected {
    samples: Vec<i16>,
    sample_rate: u32,
    channels: u16,
    frames: usize,
    dropped_mismatched: usize,
}

/// Owns the capture device handle and raw buffer accumulation for one
/// recording session.
///
/// Frames arrive on an mpsc channel from the backend and are appended in
/// arrival order by a single collector task, so the concatenated buffer
/// preserves delivery order. The device handle never leaves this type.
pub struct AudioCapture {
    backend: Box<dyn CaptureBackend>,
    config: CaptureConfig,
    collector: Option<JoinHandle<Collected>>,
    held: bool,
}

impl AudioCapture {
    pub fn new(backend: Box<dyn CaptureBackend>, config: CaptureConfig) -> Self {
        Self {
            backend,
            config,
            collector: None,
            held: false,
        }
    }

    /// Request exclusive access to the input device.
    pub async fn acquire(&mut self) -> Result<(), CaptureError> {
        if self.held {
            return Err(CaptureError::AlreadyCapturing);
        }
        self.backend.acquire().await?;
        self.held = true;
        info!("acquired input device: {}", self.backend.name());
        Ok(())
    }

    /// Start streaming and begin accumulating frames.
    pub async fn begin(&mut self) -> Result<(), CaptureError> {
        if !self.held {
            return Err(CaptureError::Stream(
                "begin called before device acquisition".to_string(),
            ));
        }
        if self.collector.is_some() {
            return Err(CaptureError::AlreadyCapturing);
        }

        let mut rx = self.backend.start().await?;

        // Single consumer: arrival order is concatenation order.
        let collector = tokio::spawn(async move {
            let mut collected = Collected::default();
            while let Some(frame) = rx.recv().await {
                if collected.frames == 0 {
                    collected.sample_rate = frame.sample_rate;
                    collected.channels = frame.channels;
                } else if frame.sample_rate != collected.sample_rate
                    || frame.channels != collected.channels
                {
                    // A device format change mid-recording would corrupt the
                    // container; drop the frame and keep counting.
                    collected.dropped_mismatched += 1;
                    continue;
                }
                collected.samples.extend_from_slice(&frame.samples);
                collected.frames += 1;
            }
            collected
        });

        self.collector = Some(collector);
        Ok(())
    }

    /// Stop streaming, finalize the buffer, and release the device.
    ///
    /// The device is released before finalization so no failure path can
    /// leave a dangling track. Idempotent: `end` when not streaming returns
    /// `Ok(None)` and still guarantees release.
    pub async fn end(&mut self) -> Result<Option<CapturedAudio>, CaptureError> {
        let stopped = self.backend.stop().await;
        self.held = false;

        let collector = self.collector.take();

        if let Err(e) = stopped {
            if let Some(task) = collector {
                task.abort();
            }
            return Err(e);
        }

        let Some(task) = collector else {
            return Ok(None);
        };

        let collected = task
            .await
            .map_err(|e| CaptureError::Stream(format!("frame collector failed: {e}")))?;

        if collected.dropped_mismatched > 0 {
            warn!(
                "dropped {} frames with mismatched format",
                collected.dropped_mismatched
            );
        }

        let audio = finalize_wav(collected, &self.config)?;
        info!(
            "capture finalized: {} samples, {} ms",
            audio.sample_count(),
            audio.duration_ms()
        );
        Ok(Some(audio))
    }

    /// Whether the device handle is currently held
    pub fn is_held(&self) -> bool {
        self.held
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }
}

/// Concatenate the accumulated samples into one immutable WAV container.
fn finalize_wav(collected: Collected, config: &CaptureConfig) -> Result<CapturedAudio, CaptureError> {
    // An empty capture still produces a valid header-only container; the
    // service answers it with an empty transcript.
    let sample_rate = if collected.frames > 0 {
        collected.sample_rate
    } else {
        config.sample_rate
    };
    let channels = if collected.frames > 0 {
        collected.channels
    } else {
        config.channels
    };

    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| CaptureError::Stream(format!("failed to create WAV writer: {e}")))?;
        for &sample in &collected.samples {
            writer
                .write_sample(sample)
                .map_err(|e| CaptureError::Stream(format!("failed to write sample: {e}")))?;
        }
        writer
            .finalize()
            .map_err(|e| CaptureError::Stream(format!("failed to finalize WAV: {e}")))?;
    }

    Ok(CapturedAudio {
        wav: cursor.into_inner(),
        sample_rate,
        channels,
        sample_count: collected.samples.len(),
    })
}
