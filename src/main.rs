use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use akompta_voice::{
    CaptureBackend, CaptureConfig, Config, MicBackend, SessionController, TranscriptionClient,
};

/// Record a voice command from the microphone and send it to the
/// speech-to-intent service.
#[derive(Debug, Parser)]
#[command(name = "akompta-voice", version)]
struct Args {
    /// Config file path (config-crate style, extension optional)
    #[arg(long, default_value = "config/akompta-voice")]
    config: String,

    /// Override the service base URL from the config file
    #[arg(long)]
    server: Option<String>,

    /// Bearer credential attached to the transcription request
    #[arg(long, env = "AKOMPTA_TOKEN")]
    token: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let mut cfg = match Config::load(&args.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("could not load {} ({e}); using defaults", args.config);
            Config::default()
        }
    };
    if let Some(server) = args.server {
        cfg.service.base_url = server;
    }

    info!("akompta-voice v{}", env!("CARGO_PKG_VERSION"));
    info!("service: {}", cfg.service.base_url);

    let client = TranscriptionClient::new(
        &cfg.service.base_url,
        Duration::from_secs(cfg.service.request_timeout_secs),
    )?;
    let capture_config = CaptureConfig::from(&cfg.audio);
    let factory_config = capture_config.clone();
    let controller = SessionController::new(client, capture_config, move || {
        Box::new(MicBackend::new(factory_config.clone())) as Box<dyn CaptureBackend>
    });

    controller.open().await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        println!("Recording... press Enter to stop.");
        controller.start_recording().await?;
        lines.next_line().await?;
        controller.stop_recording().await?;

        if let Some(audio) = controller.preview().await {
            println!(
                "Captured {} ms of audio ({} bytes).",
                audio.duration_ms(),
                audio.bytes().len()
            );
        }

        println!("[s]ubmit, [r]ecord again, or [q]uit?");
        match lines.next_line().await?.unwrap_or_default().trim() {
            "r" => {
                controller.reset().await?;
                continue;
            }
            "q" => break,
            _ => {}
        }

        loop {
            match controller.submit(&args.token).await? {
                Some(display) => {
                    println!("{}", serde_json::to_string_pretty(&display)?);
                    if display.error.is_none() {
                        break;
                    }
                    println!("Retry submission with the same recording? [y/N]");
                    if lines.next_line().await?.unwrap_or_default().trim() != "y" {
                        break;
                    }
                }
                None => break,
            }
        }
        break;
    }

    controller.close().await?;
    Ok(())
}
