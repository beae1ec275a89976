//! Shared types for the voxgate speech gateway.
//!
//! Configuration is built once at startup and handed to constructors; nothing
//! here is mutated after the server starts. Keeping these in voxgate-core means
//! clients can depend on the wire types without pulling in tokio or axum.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use crate::text::DEFAULT_MAX_TEXT_LEN;

// ─── Configuration ─────────────────────────────────────────────────────────

/// Top-level gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    /// Directory holding `{id}.mp3` artifacts.
    pub audio_dir: PathBuf,
    /// Base URL used for returned links, e.g. `https://tts.example.com`.
    /// When unset the request's `Host` header is used.
    pub public_base_url: Option<String>,
    pub max_text_len: usize,
    pub synthesis: SynthesisConfig,
    /// `None` stores provider audio as-is.
    pub transcode: Option<TranscodeConfig>,
    pub sweep: SweepPolicy,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 5000,
            audio_dir: PathBuf::from("static/audio"),
            public_base_url: None,
            max_text_len: DEFAULT_MAX_TEXT_LEN,
            synthesis: SynthesisConfig::default(),
            transcode: Some(TranscodeConfig::default()),
            sweep: SweepPolicy::default(),
        }
    }
}

/// Speech provider settings (OpenAI-compatible `/v1/audio/speech`).
#[derive(Debug, Clone)]
pub struct SynthesisConfig {
    pub provider_url: String,
    pub model: String,
    pub voice: String,
    pub api_key: Option<String>,
    /// Upper bound on a single provider call, including the body download.
    pub timeout: Duration,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            provider_url: "http://localhost:5050".into(),
            model: "tts-1".into(),
            voice: "en-US-JennyNeural".into(),
            api_key: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Post-processing settings. Defaults target small embedded MP3 decoders.
#[derive(Debug, Clone)]
pub struct TranscodeConfig {
    pub ffmpeg_path: PathBuf,
    pub channels: u16,
    pub sample_rate: u32,
    pub bitrate_kbps: u32,
    pub timeout: Duration,
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            channels: 1,
            sample_rate: 22_050,
            bitrate_kbps: 128,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Retention policy for stored artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepPolicy {
    /// Artifacts older than this are deleted.
    pub max_age: Duration,
    /// Pause between scans.
    pub interval: Duration,
}

impl Default for SweepPolicy {
    fn default() -> Self {
        Self {
            max_age: Duration::from_secs(60 * 60),
            interval: Duration::from_secs(30 * 60),
        }
    }
}

// ─── Sweeper status ────────────────────────────────────────────────────────

/// Observable sweeper state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SweepState {
    #[default]
    Idle,
    Scanning,
    Deleting,
    Sleeping,
}

/// Sweeper status snapshot.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepStatus {
    pub state: SweepState,
    /// Completed passes since startup.
    pub passes: u64,
    pub last_scanned: usize,
    pub last_deleted: usize,
    pub last_failed: usize,
    pub total_deleted: u64,
}

// ─── Wire types ────────────────────────────────────────────────────────────

/// Body of a successful `/speak` call.
#[derive(Debug, Clone, Serialize)]
pub struct SpeakResponse {
    pub status: &'static str,
    pub url: String,
    pub filename: String,
    pub file_id: String,
    pub text: String,
}

/// Body of `/test` and `/health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub ip: String,
    pub port: u16,
    pub voice: String,
    pub endpoints: &'static [&'static str],
    pub sweeper: SweepStatus,
}

/// Every error response has this shape.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Routes advertised by the health payload.
pub const ENDPOINTS: &[&str] = &["/", "/test", "/health", "/speak", "/audio/{filename}"];
