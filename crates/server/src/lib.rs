//! Coach Server
//!
//! HTTP and WebSocket endpoints for conversation practice, video
//! evaluation and avatar animation, plus health, metrics and static
//! session files.

pub mod avatar;
pub mod conversation;
pub mod evaluation;
pub mod http;
pub mod metrics;
pub mod sessions;
pub mod state;
pub mod websocket;

pub use http::create_router;
pub use crate::metrics::{init_metrics, metrics_handler, record_error, record_request};
pub use state::AppState;
pub use websocket::WsMessage;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error(transparent)]
    Core(#[from] coach_core::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Metrics error: {0}")]
    Metrics(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status_code(&self) -> StatusCode {
        use coach_core::Error as Core;

        match self {
            ServerError::Core(err) => match err {
                Core::Validation(_) => StatusCode::BAD_REQUEST,
                Core::NotFound(_) => StatusCode::NOT_FOUND,
                Core::NotReady(_) | Core::AlreadyRunning(_) | Core::InvalidTransition { .. } => {
                    StatusCode::CONFLICT
                },
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ServerError::Metrics(_) | ServerError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            },
        }
    }

    /// Short label for the body and the error counter
    pub fn kind(&self) -> &'static str {
        match self {
            ServerError::Core(err) => err.kind(),
            ServerError::InvalidRequest(_) => "invalid_request",
            ServerError::PayloadTooLarge(_) => "payload_too_large",
            ServerError::Metrics(_) => "metrics",
            ServerError::Internal(_) => "internal",
        }
    }

    fn detail(&self) -> String {
        match self {
            ServerError::Core(err) => err.to_string(),
            ServerError::InvalidRequest(msg)
            | ServerError::PayloadTooLarge(msg)
            | ServerError::Metrics(msg)
            | ServerError::Internal(msg) => msg.clone(),
        }
    }
}

/// JSON error body
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    detail: String,
    status_code: u16,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(kind = self.kind(), error = %self, "Request failed");
        } else {
            tracing::debug!(kind = self.kind(), error = %self, "Request rejected");
        }
        record_error(self.kind());

        let body = ErrorBody {
            error: self.kind(),
            detail: self.detail(),
            status_code: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<axum::extract::multipart::MultipartError> for ServerError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ServerError::PayloadTooLarge(err.body_text())
        } else {
            ServerError::InvalidRequest(err.body_text())
        }
    }
}
