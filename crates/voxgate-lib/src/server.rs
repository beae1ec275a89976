//! HTTP API for the speech gateway.
//!
//! Listens on port 5000 by default. CORS-permissive so browser pages and
//! embedded clients on the LAN can call it directly.

use std::any::Any;
use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use tokio::sync::watch;
use tokio_util::io::ReaderStream;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use voxgate_core::types::{ENDPOINTS, HealthResponse, SpeakResponse, SweepStatus};

use crate::error::GatewayError;
use crate::gateway::Gateway;

#[derive(Clone)]
struct AppState {
    gateway: Arc<Gateway>,
    sweep_status: watch::Receiver<SweepStatus>,
    local_ip: IpAddr,
}

/// Build the axum router around a shared [`Gateway`].
pub fn router(gateway: Arc<Gateway>, sweep_status: watch::Receiver<SweepStatus>) -> Router {
    let state = AppState {
        gateway,
        sweep_status,
        local_ip: detect_local_ip(),
    };

    Router::new()
        .route("/", get(home))
        .route("/test", get(health))
        .route("/health", get(health))
        .route("/speak", get(speak))
        .route("/audio/{filename}", get(audio))
        .fallback(not_found)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Address of the interface used for outbound traffic, for links shown when
/// the request carries no `Host` header. Connecting a UDP socket sends nothing.
pub fn detect_local_ip() -> IpAddr {
    UdpSocket::bind("0.0.0.0:0")
        .and_then(|sock| {
            sock.connect("8.8.8.8:80")?;
            sock.local_addr()
        })
        .map(|addr| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

async fn home(State(state): State<AppState>) -> Html<String> {
    let port = state.gateway.config().port;
    Html(format!(
        r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>voxgate</title></head>
<body>
<h1>TTS Server</h1>
<p>Server IP: {ip}:{port}</p>
<p><a href="/test">Test Server</a></p>
<p><a href="/speak?text=hello">Test TTS</a></p>
</body>
</html>
"#,
        ip = state.local_ip,
    ))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let config = state.gateway.config();
    Json(HealthResponse {
        status: "OK",
        message: "TTS Server is running",
        ip: state.local_ip.to_string(),
        port: config.port,
        voice: config.synthesis.voice.clone(),
        endpoints: ENDPOINTS,
        sweeper: state.sweep_status.borrow().clone(),
    })
}

#[derive(serde::Deserialize)]
struct SpeakQuery {
    #[serde(default)]
    text: Option<String>,
}

async fn speak(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<SpeakQuery>, QueryRejection>,
) -> Result<Json<SpeakResponse>, GatewayError> {
    let Query(query) =
        query.map_err(|e| GatewayError::InvalidInput(format!("Invalid query: {}", e.body_text())))?;

    info!("speak request from {}", client_ip(&headers));

    let text = query.text.unwrap_or_default();
    let speech = state.gateway.speak(&text).await?;

    let filename = speech.artifact.filename();
    let url = format!("{}/audio/{filename}", base_url(&state, &headers));
    info!("generated {url}");

    Ok(Json(SpeakResponse {
        status: "success",
        url,
        filename,
        file_id: speech.artifact.id.to_string(),
        text: speech.text,
    }))
}

async fn audio(
    State(state): State<AppState>,
    filename: Result<Path<String>, PathRejection>,
) -> Result<Response, GatewayError> {
    let Path(filename) = filename.map_err(|_| GatewayError::NotFound)?;
    let (file, len) = state.gateway.store().open_file(&filename).await?;

    Response::builder()
        .header(header::CONTENT_TYPE, "audio/mpeg")
        .header(header::CONTENT_LENGTH, len)
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| GatewayError::Internal(format!("failed to build audio response: {e}")))
}

async fn not_found() -> GatewayError {
    GatewayError::NotFound
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "handler panicked".to_string()
    };
    GatewayError::Internal(detail).into_response()
}

/// Scheme and authority for returned links.
///
/// Order: configured public URL, then `X-Forwarded-Proto` + `Host`, then the
/// detected local address.
fn base_url(state: &AppState, headers: &HeaderMap) -> String {
    let config = state.gateway.config();
    if let Some(base) = &config.public_base_url {
        return base.trim_end_matches('/').to_string();
    }

    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .filter(|h| is_plausible_host(h));

    match host {
        Some(host) => {
            let scheme = headers
                .get("x-forwarded-proto")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|p| *p == "http" || *p == "https")
                .unwrap_or("http");
            format!("{scheme}://{host}")
        }
        None => format!("http://{}:{}", state.local_ip, config.port),
    }
}

fn is_plausible_host(host: &str) -> bool {
    !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':' | '[' | ']' | '_'))
}

fn client_ip(headers: &HeaderMap) -> String {
    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };
    header_value("x-real-ip")
        .or_else(|| header_value("x-forwarded-for"))
        .unwrap_or_else(|| "unknown".to_string())
}
