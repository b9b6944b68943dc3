use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub audio: AudioConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the speech-to-intent service, e.g. "http://localhost:5000/api"
    pub base_url: String,
    /// Timeout applied to the whole transcription exchange
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
    /// Frame granularity delivered by the capture backend (affects latency)
    pub buffer_duration_ms: u64,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                base_url: "http://localhost:5000/api".to_string(),
                request_timeout_secs: 30,
            },
            audio: AudioConfig {
                sample_rate: 16000, // what the STT side expects
                channels: 1,        // Mono
                buffer_duration_ms: 100,
            },
        }
    }
}
