//! voxgate CLI — text-to-speech gateway.
//!
//! ```text
//! voxgate serve [--port 5000] [--host 0.0.0.0] [--provider-url http://localhost:5050]
//! voxgate speak "hello world" [--server http://localhost:5000]
//! voxgate health [--server http://localhost:5000]
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use voxgate_lib::gateway::Gateway;
use voxgate_lib::server;
use voxgate_lib::sweeper::Sweeper;
use voxgate_lib::voxgate_core::types::{
    GatewayConfig, SweepPolicy, SynthesisConfig, TranscodeConfig,
};

/// voxgate — turns short text into a link to synthesized speech
#[derive(Parser)]
#[command(name = "voxgate", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the gateway
    Serve(ServeArgs),
    /// Ask a running gateway to synthesize text and print the response
    Speak {
        /// Text to speak
        text: String,
        /// Gateway URL
        #[arg(long, default_value = "http://localhost:5000")]
        server: String,
    },
    /// Print the health payload of a running gateway
    Health {
        #[arg(long, default_value = "http://localhost:5000")]
        server: String,
    },
}

#[derive(clap::Args)]
struct ServeArgs {
    /// Listen port
    #[arg(long, env = "PORT", default_value = "5000")]
    port: u16,
    /// Listen host
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,
    /// Directory for generated audio
    #[arg(long, env = "AUDIO_DIR", default_value = "static/audio")]
    audio_dir: PathBuf,
    /// Base URL for returned links (default: derived from the Host header)
    #[arg(long, env = "PUBLIC_URL")]
    public_url: Option<String>,
    /// OpenAI-compatible speech server
    #[arg(long, env = "TTS_PROVIDER_URL", default_value = "http://localhost:5050")]
    provider_url: String,
    /// Model name sent to the provider
    #[arg(long, env = "TTS_MODEL", default_value = "tts-1")]
    model: String,
    /// Voice used for every request
    #[arg(long, env = "TTS_VOICE", default_value = "en-US-JennyNeural")]
    voice: String,
    /// Bearer token for the provider
    #[arg(long, env = "TTS_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
    /// Provider call timeout
    #[arg(long, default_value = "30", value_parser = clap::value_parser!(u64).range(1..))]
    synthesis_timeout_secs: u64,
    /// Store provider audio as-is instead of re-encoding it
    #[arg(long)]
    no_transcode: bool,
    /// ffmpeg binary used for re-encoding
    #[arg(long = "ffmpeg", env = "FFMPEG_PATH", default_value = "ffmpeg")]
    ffmpeg_path: PathBuf,
    /// Delete audio older than this
    #[arg(long, default_value = "3600", value_parser = clap::value_parser!(u64).range(1..))]
    max_age_secs: u64,
    /// Pause between retention sweeps
    #[arg(long, default_value = "1800", value_parser = clap::value_parser!(u64).range(1..))]
    sweep_interval_secs: u64,
}

impl ServeArgs {
    fn into_config(self) -> GatewayConfig {
        let defaults = GatewayConfig::default();
        let transcode = (!self.no_transcode).then(|| TranscodeConfig {
            ffmpeg_path: self.ffmpeg_path,
            ..Default::default()
        });

        GatewayConfig {
            host: self.host,
            port: self.port,
            audio_dir: self.audio_dir,
            public_base_url: self.public_url,
            max_text_len: defaults.max_text_len,
            synthesis: SynthesisConfig {
                provider_url: self.provider_url,
                model: self.model,
                voice: self.voice,
                api_key: self.api_key,
                timeout: Duration::from_secs(self.synthesis_timeout_secs),
            },
            transcode,
            sweep: SweepPolicy {
                max_age: Duration::from_secs(self.max_age_secs),
                interval: Duration::from_secs(self.sweep_interval_secs),
            },
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voxgate=info,voxgate_lib=info,tower_http=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve(args) => serve(args.into_config()).await,

        Command::Speak { text, server } => {
            let resp = reqwest::Client::new()
                .get(format!("{server}/speak"))
                .query(&[("text", text.as_str())])
                .send()
                .await
                .context("request failed")?;
            println!("{}", resp.text().await.unwrap_or_default());
            Ok(())
        }

        Command::Health { server } => {
            let resp = reqwest::Client::new()
                .get(format!("{server}/health"))
                .send()
                .await
                .context("request failed")?;
            println!("{}", resp.text().await.unwrap_or_default());
            Ok(())
        }
    }
}

async fn serve(config: GatewayConfig) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let sweep = config.sweep;

    info!(
        "provider {} (voice {}), audio in {}, transcode {}",
        config.synthesis.provider_url,
        config.synthesis.voice,
        config.audio_dir.display(),
        if config.transcode.is_some() { "on" } else { "off" },
    );

    let gateway = Arc::new(
        Gateway::from_config(config)
            .await
            .context("failed to initialize gateway")?,
    );
    let sweeper = Sweeper::spawn(gateway.store().clone(), sweep);
    let app = server::router(gateway, sweeper.subscribe());

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("voxgate listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    sweeper.shutdown();
    info!("voxgate stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received");
}
