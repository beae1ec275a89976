//! Mock speech provider for integration tests
//!
//! Implements the OpenAI-compatible `/v1/audio/speech` endpoint and returns
//! canned audio bytes.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

/// Payload every successful call returns
pub const FAKE_MP3: &[u8] = b"ID3\x04\x00\x00\x00\x00\x00\x00fake-mpeg-frames";

/// Error text the failing mock sends; must never reach gateway clients
pub const UPSTREAM_SECRET: &str = "upstream-internal-detail-7f3a";

pub struct MockTts {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockTtsState>,
}

struct MockTtsState {
    request_count: AtomicU32,
    fail: bool,
    delay: Duration,
}

#[derive(Debug, Deserialize)]
struct SpeechRequest {
    input: String,
    voice: String,
}

impl MockTts {
    pub async fn start() -> anyhow::Result<Self> {
        Self::start_inner(false, Duration::ZERO).await
    }

    /// Every request fails with 500 and [`UPSTREAM_SECRET`] in the body
    pub async fn start_failing() -> anyhow::Result<Self> {
        Self::start_inner(true, Duration::ZERO).await
    }

    /// Every request waits `delay` before answering
    pub async fn start_slow(delay: Duration) -> anyhow::Result<Self> {
        Self::start_inner(false, delay).await
    }

    async fn start_inner(fail: bool, delay: Duration) -> anyhow::Result<Self> {
        let state = Arc::new(MockTtsState {
            request_count: AtomicU32::new(0),
            fail,
            delay,
        });

        let app = Router::new()
            .route("/v1/audio/speech", routing::post(handle_speech))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn request_count(&self) -> u32 {
        self.state.request_count.load(Ordering::Relaxed)
    }
}

impl Drop for MockTts {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn handle_speech(
    State(state): State<Arc<MockTtsState>>,
    Json(req): Json<SpeechRequest>,
) -> Response {
    state.request_count.fetch_add(1, Ordering::Relaxed);

    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }

    if state.fail {
        return (StatusCode::INTERNAL_SERVER_ERROR, UPSTREAM_SECRET).into_response();
    }

    assert!(!req.input.is_empty());
    assert!(!req.voice.is_empty());

    ([("content-type", "audio/mpeg")], FAKE_MP3).into_response()
}
