//! Speech synthesis client.
//!
//! The gateway talks to any server exposing the OpenAI-compatible speech
//! endpoint (`POST {base}/v1/audio/speech`), which covers edge-tts bridges,
//! Kokoro and OpenAI itself. One request per call, no retries; the caller
//! bounds the total time.

use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use tracing::{debug, error};

use voxgate_core::types::SynthesisConfig;

use crate::error::{GatewayError, Result};

/// Responses larger than this are treated as provider errors.
const MAX_AUDIO_BYTES: usize = 32 * 1024 * 1024;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Something that turns text into encoded audio.
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    /// Synthesize `text` with `voice`. Yields the complete audio payload or
    /// [`GatewayError::SynthesisFailed`]; never a partial result.
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Bytes>;

    /// Short name for logs.
    fn name(&self) -> &str;
}

/// HTTP provider speaking the OpenAI speech protocol.
pub struct HttpSpeechProvider {
    client: reqwest::Client,
    url: String,
    model: String,
    api_key: Option<String>,
}

#[derive(serde::Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'a str,
}

impl HttpSpeechProvider {
    pub fn new(config: &SynthesisConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: format!("{}/v1/audio/speech", config.provider_url.trim_end_matches('/')),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl SpeechProvider for HttpSpeechProvider {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Bytes> {
        let body = SpeechRequest {
            model: &self.model,
            input: text,
            voice,
            response_format: "mp3",
        };

        debug!("tts: POST {} ({} chars, voice={voice})", self.url, text.chars().count());

        let mut req = self.client.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = match req.send().await {
            Ok(resp) if resp.status().is_success() => resp,
            Ok(resp) => {
                let status = resp.status();
                let text = resp.text().await.unwrap_or_default();
                error!("tts: provider error {status}: {text}");
                return Err(GatewayError::SynthesisFailed(format!(
                    "provider returned {status}"
                )));
            }
            Err(e) => {
                error!("tts: request failed: {e}");
                return Err(GatewayError::SynthesisFailed(format!("request failed: {e}")));
            }
        };

        let mut stream = resp.bytes_stream();
        let mut audio = BytesMut::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                error!("tts: stream error: {e}");
                GatewayError::SynthesisFailed(format!("stream error: {e}"))
            })?;
            if audio.len() + chunk.len() > MAX_AUDIO_BYTES {
                return Err(GatewayError::SynthesisFailed(format!(
                    "response exceeds {MAX_AUDIO_BYTES} bytes"
                )));
            }
            audio.extend_from_slice(&chunk);
        }

        if audio.is_empty() {
            return Err(GatewayError::SynthesisFailed(
                "provider returned no audio".to_string(),
            ));
        }

        debug!("tts: received {} bytes", audio.len());
        Ok(audio.freeze())
    }

    fn name(&self) -> &str {
        "http"
    }
}
