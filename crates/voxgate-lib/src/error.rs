//! Gateway error taxonomy and its HTTP mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use voxgate_core::types::ErrorBody;

pub type Result<T> = std::result::Result<T, GatewayError>;

/// Message returned for every synthesis, transcode or storage failure.
pub const GENERATION_FAILED: &str = "Failed to generate speech";

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Missing, empty or oversized request text
    #[error("{0}")]
    InvalidInput(String),

    /// Provider unreachable, returned an error, timed out, or sent no audio
    #[error("speech synthesis failed: {0}")]
    SynthesisFailed(String),

    /// Post-processing failed
    #[error("transcode failed: {0}")]
    TranscodeFailed(String),

    /// File store I/O
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Unknown route, invalid artifact name, or missing file
    #[error("not found")]
    NotFound,

    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::SynthesisFailed(_)
            | Self::TranscodeFailed(_)
            | Self::Storage(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message that is safe to show to API consumers. Upstream and I/O detail
    /// stays in the logs.
    pub fn client_message(&self) -> String {
        match self {
            Self::InvalidInput(msg) => msg.clone(),
            Self::NotFound => "not found".to_string(),
            Self::SynthesisFailed(_) | Self::TranscodeFailed(_) | Self::Storage(_) => {
                GENERATION_FAILED.to_string()
            }
            Self::Internal(_) => "internal server error".to_string(),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("{self}");
        } else {
            tracing::debug!("{self}");
        }

        let body = ErrorBody {
            error: self.client_message(),
        };
        (status, Json(body)).into_response()
    }
}
