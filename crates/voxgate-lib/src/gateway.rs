//! Request lifecycle: validate → synthesize → (transcode) → store.
//!
//! A failed call leaves nothing behind: every intermediate file is a
//! [`StagedFile`](crate::store::StagedFile) that removes itself when dropped,
//! which also covers the handler future being cancelled mid-request.

use std::sync::Arc;

use tracing::{debug, info};

use voxgate_core::id::AudioId;
use voxgate_core::text::validate_text;
use voxgate_core::types::GatewayConfig;

use crate::error::{GatewayError, Result};
use crate::store::{AudioArtifact, FileStore};
use crate::transcode::Transcoder;
use crate::tts::{HttpSpeechProvider, SpeechProvider};

/// Result of a successful [`Gateway::speak`] call.
#[derive(Debug, Clone)]
pub struct Speech {
    /// Normalized text that was synthesized.
    pub text: String,
    pub artifact: AudioArtifact,
}

pub struct Gateway {
    config: GatewayConfig,
    store: FileStore,
    provider: Arc<dyn SpeechProvider>,
    transcoder: Option<Transcoder>,
}

impl Gateway {
    /// Build a gateway with the HTTP speech provider from `config`.
    pub async fn from_config(config: GatewayConfig) -> Result<Self> {
        let store = FileStore::open(&config.audio_dir).await?;
        let provider = Arc::new(HttpSpeechProvider::new(&config.synthesis)?);
        Ok(Self::new(config, store, provider))
    }

    pub fn new(config: GatewayConfig, store: FileStore, provider: Arc<dyn SpeechProvider>) -> Self {
        let transcoder = config.transcode.clone().map(Transcoder::new);
        Self {
            config,
            store,
            provider,
            transcoder,
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn store(&self) -> &FileStore {
        &self.store
    }

    /// Turn `raw_text` into a stored artifact.
    pub async fn speak(&self, raw_text: &str) -> Result<Speech> {
        let text = validate_text(raw_text, self.config.max_text_len)
            .map_err(GatewayError::InvalidInput)?;

        let id = AudioId::new();
        let voice = &self.config.synthesis.voice;
        let timeout = self.config.synthesis.timeout;

        debug!("speak[{id}]: synthesizing {} chars via {}", text.chars().count(), self.provider.name());

        let audio = tokio::time::timeout(timeout, self.provider.synthesize(&text, voice))
            .await
            .map_err(|_| GatewayError::SynthesisFailed(format!("no response within {timeout:?}")))??;

        let artifact = match &self.transcoder {
            None => self.store.put(id, &audio).await?,
            Some(transcoder) => {
                let raw = self.store.stage(&id, "raw");
                tokio::fs::write(raw.path(), &audio).await?;

                let encoded = self.store.stage(&id, "mp3");
                transcoder.transcode(raw.path(), encoded.path()).await?;
                drop(raw);

                self.store.commit(id, encoded).await?
            }
        };

        info!("speak[{id}]: stored {} ({} bytes from provider)", artifact.filename(), audio.len());
        Ok(Speech { text, artifact })
    }
}
