//! Test server wrapper that starts the gateway on a random port

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use voxgate_lib::gateway::Gateway;
use voxgate_lib::server;
use voxgate_lib::voxgate_core::types::{GatewayConfig, SweepStatus, SynthesisConfig};

/// A running gateway with its own audio directory
pub struct TestServer {
    addr: SocketAddr,
    shutdown: CancellationToken,
    client: reqwest::Client,
    gateway: Arc<Gateway>,
    _audio_dir: tempfile::TempDir,
}

impl TestServer {
    /// Start a gateway pointed at `provider_url`, transcoding disabled
    pub async fn start(provider_url: &str) -> anyhow::Result<Self> {
        Self::start_with(provider_url, |_| {}).await
    }

    /// Start with a config tweak applied before the gateway is built
    pub async fn start_with(
        provider_url: &str,
        tweak: impl FnOnce(&mut GatewayConfig),
    ) -> anyhow::Result<Self> {
        let audio_dir = tempfile::tempdir()?;
        let mut config = GatewayConfig {
            audio_dir: audio_dir.path().join("audio"),
            transcode: None,
            synthesis: SynthesisConfig {
                provider_url: provider_url.to_string(),
                timeout: Duration::from_secs(5),
                ..Default::default()
            },
            ..Default::default()
        };
        tweak(&mut config);

        let gateway = Arc::new(Gateway::from_config(config).await?);
        let (_status_tx, status_rx) = watch::channel(SweepStatus::default());
        let app = server::router(Arc::clone(&gateway), status_rx);

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

        Ok(Self {
            addr,
            shutdown,
            client: reqwest::Client::new(),
            gateway,
            _audio_dir: audio_dir,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    pub fn audio_dir(&self) -> &Path {
        self.gateway.store().dir()
    }

    /// Number of entries in the audio directory, staging files included
    pub fn file_count(&self) -> usize {
        std::fs::read_dir(self.audio_dir())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    /// GET `/speak` with `text` as the query parameter
    pub async fn speak(&self, text: &str) -> reqwest::Response {
        self.client
            .get(self.url("/speak"))
            .query(&[("text", text)])
            .send()
            .await
            .unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
