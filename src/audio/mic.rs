//! Default-microphone capture backend via cpal.
//!
//! cpal streams are not `Send`, so the stream lives on a dedicated audio
//! thread for the lifetime of one recording. Frames cross into async land
//! through a bounded tokio channel; when the channel is full the frame is
//! dropped and counted instead of blocking the device callback.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use super::backend::{AudioFrame, CaptureBackend, CaptureConfig, CaptureError};

const FRAME_CHANNEL_CAPACITY: usize = 100;

pub struct MicBackend {
    config: CaptureConfig,
    device_name: String,
    acquired: bool,
    running: Option<Running>,
}

struct Running {
    stop: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
    dropped: Arc<AtomicUsize>,
}

impl MicBackend {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            device_name: "default input".to_string(),
            acquired: false,
            running: None,
        }
    }
}

#[async_trait::async_trait]
impl CaptureBackend for MicBackend {
    async fn acquire(&mut self) -> Result<(), CaptureError> {
        if self.acquired {
            return Err(CaptureError::AlreadyCapturing);
        }

        // Probe the default device up front so a missing microphone or a
        // platform permission denial surfaces here, not mid-recording.
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| CaptureError::DeviceUnavailable("no default input device".into()))?;
        device
            .default_input_config()
            .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?;

        self.device_name = device
            .name()
            .unwrap_or_else(|_| "unknown input device".to_string());
        self.acquired = true;
        Ok(())
    }

    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, CaptureError> {
        if !self.acquired {
            return Err(CaptureError::DeviceUnavailable(
                "device not acquired".into(),
            ));
        }
        if self.running.is_some() {
            return Err(CaptureError::AlreadyCapturing);
        }

        let (frame_tx, frame_rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
        let (ready_tx, ready_rx) = oneshot::channel::<Result<(), CaptureError>>();
        let stop = Arc::new(AtomicBool::new(false));
        let dropped = Arc::new(AtomicUsize::new(0));

        let thread_stop = Arc::clone(&stop);
        let thread_dropped = Arc::clone(&dropped);
        let config = self.config.clone();

        let handle = thread::spawn(move || {
            audio_thread_main(config, frame_tx, ready_tx, thread_stop, thread_dropped);
        });

        match ready_rx.await {
            Ok(Ok(())) => {
                self.running = Some(Running {
                    stop,
                    thread: Some(handle),
                    dropped,
                });
                Ok(frame_rx)
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(CaptureError::Stream("audio thread exited early".into()))
            }
        }
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        if let Some(mut running) = self.running.take() {
            running.stop.store(true, Ordering::Relaxed);
            if let Some(handle) = running.thread.take() {
                // The audio thread only sleeps in short intervals; joining it
                // off the runtime keeps the executor unblocked.
                tokio::task::spawn_blocking(move || handle.join())
                    .await
                    .map_err(|e| CaptureError::Stream(format!("join task failed: {e}")))?
                    .map_err(|_| CaptureError::Stream("audio thread panicked".into()))?;
            }
            let dropped = running.dropped.load(Ordering::Relaxed);
            if dropped > 0 {
                warn!("{dropped} frames dropped on a full channel during capture");
            }
        }
        self.acquired = false;
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.acquired
    }

    fn name(&self) -> &str {
        &self.device_name
    }
}

/// Owns the cpal stream for one recording and pumps frames until stopped.
fn audio_thread_main(
    config: CaptureConfig,
    frame_tx: mpsc::Sender<AudioFrame>,
    ready_tx: oneshot::Sender<Result<(), CaptureError>>,
    stop: Arc<AtomicBool>,
    dropped: Arc<AtomicUsize>,
) {
    let stream = match build_stream(&config, frame_tx, dropped) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(CaptureError::Stream(e.to_string())));
        return;
    }
    let _ = ready_tx.send(Ok(()));

    while !stop.load(Ordering::Relaxed) {
        thread::sleep(Duration::from_millis(25));
    }

    if let Err(e) = stream.pause() {
        warn!("failed to pause audio stream: {e}");
    }
    // Dropping the stream stops the underlying track and releases the device.
    drop(stream);
}

fn build_stream(
    config: &CaptureConfig,
    frame_tx: mpsc::Sender<AudioFrame>,
    dropped: Arc<AtomicUsize>,
) -> Result<cpal::Stream, CaptureError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| CaptureError::DeviceUnavailable("no default input device".into()))?;

    let default_config = device
        .default_input_config()
        .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?;
    let format = default_config.sample_format();
    let device_config: StreamConfig = default_config.into();
    let device_rate = device_config.sample_rate.0;
    let channels = usize::from(device_config.channels.max(1));

    info!(
        "mic stream: format={format:?} rate={device_rate}Hz channels={channels} -> {}Hz mono",
        config.sample_rate
    );

    let mut chunker = FrameChunker::new(config, device_rate);
    let err_fn = |err| warn!("audio stream error: {err}");

    let stream = match format {
        SampleFormat::F32 => device.build_input_stream(
            &device_config,
            move |data: &[f32], _| {
                chunker.push(data, channels, |s| s, &frame_tx, &dropped);
            },
            err_fn,
            None,
        ),
        SampleFormat::I16 => device.build_input_stream(
            &device_config,
            move |data: &[i16], _| {
                chunker.push(data, channels, |s| s as f32 / 32_768.0, &frame_tx, &dropped);
            },
            err_fn,
            None,
        ),
        SampleFormat::U16 => device.build_input_stream(
            &device_config,
            move |data: &[u16], _| {
                chunker.push(
                    data,
                    channels,
                    |s| (s as f32 - 32_768.0) / 32_768.0,
                    &frame_tx,
                    &dropped,
                );
            },
            err_fn,
            None,
        ),
        other => {
            return Err(CaptureError::Stream(format!(
                "unsupported sample format: {other:?}"
            )))
        }
    };

    stream.map_err(|e| CaptureError::Stream(e.to_string()))
}

/// Downmixes interleaved input to mono, decimates to the target rate, and
/// emits fixed-duration i16 frames.
struct FrameChunker {
    frame_samples: usize,
    frame_ms: u64,
    sample_rate: u32,
    decimation: usize,
    phase: usize,
    pending: Vec<i16>,
    frames_emitted: u64,
}

impl FrameChunker {
    fn new(config: &CaptureConfig, device_rate: u32) -> Self {
        // Integer decimation only; an 8kHz device stays at 8kHz rather than
        // being upsampled.
        let decimation = (device_rate / config.sample_rate.max(1)).max(1) as usize;
        let sample_rate = device_rate / decimation as u32;
        let frame_samples =
            ((u64::from(sample_rate) * config.buffer_duration_ms) / 1000).max(1) as usize;
        Self {
            frame_samples,
            frame_ms: config.buffer_duration_ms,
            sample_rate,
            decimation,
            phase: 0,
            pending: Vec::with_capacity(frame_samples),
            frames_emitted: 0,
        }
    }

    fn push<T, F>(
        &mut self,
        data: &[T],
        channels: usize,
        convert: F,
        tx: &mpsc::Sender<AudioFrame>,
        dropped: &AtomicUsize,
    ) where
        T: Copy,
        F: Fn(T) -> f32,
    {
        for mono in MonoSamples::new(data, channels, convert) {
            // Decimate by keeping every Nth mono sample; the phase carries
            // across callbacks so the spacing stays uniform.
            if self.phase == 0 {
                self.pending.push(f32_to_i16(mono));
            }
            self.phase = (self.phase + 1) % self.decimation;
        }

        while self.pending.len() >= self.frame_samples {
            let samples: Vec<i16> = self.pending.drain(..self.frame_samples).collect();
            let frame = AudioFrame {
                samples,
                sample_rate: self.sample_rate,
                channels: 1,
                timestamp_ms: self.frames_emitted * self.frame_ms,
            };
            if tx.try_send(frame).is_err() {
                dropped.fetch_add(1, Ordering::Relaxed);
            }
            self.frames_emitted += 1;
        }
    }
}

/// Iterator averaging interleaved multi-channel input down to mono f32.
struct MonoSamples<'a, T, F> {
    data: &'a [T],
    channels: usize,
    convert: F,
    pos: usize,
}

impl<'a, T, F> MonoSamples<'a, T, F> {
    fn new(data: &'a [T], channels: usize, convert: F) -> Self {
        Self {
            data,
            channels: channels.max(1),
            convert,
            pos: 0,
        }
    }
}

impl<'a, T, F> Iterator for MonoSamples<'a, T, F>
where
    T: Copy,
    F: Fn(T) -> f32,
{
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.pos >= self.data.len() {
            return None;
        }
        let end = (self.pos + self.channels).min(self.data.len());
        let mut acc = 0.0f32;
        let mut count = 0usize;
        for &sample in &self.data[self.pos..end] {
            acc += (self.convert)(sample);
            count += 1;
        }
        self.pos = end;
        Some(acc / count as f32)
    }
}

fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * 32_767.0) as i16
}
