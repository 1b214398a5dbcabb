//! HTTP Endpoints
//!
//! Route table and middleware for the coaching API.

use std::time::Duration;

use axum::{
    extract::{DefaultBodyLimit, Json, State},
    http::{HeaderValue, Method},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use coach_agent::ProviderNames;

use crate::metrics::{metrics_handler, record_request};
use crate::state::AppState;
use crate::{avatar, conversation, evaluation, sessions, websocket};

/// Multipart framing on top of the largest accepted video
const BODY_LIMIT_SLACK: usize = 1024 * 1024;

const LOCAL_UI_ORIGIN: &str = "http://localhost:8501";

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let server = &state.config.server;
    let cors_layer = build_cors_layer(&server.cors_origins, server.cors_enabled);
    let body_limit = server.max_upload_bytes().saturating_add(BODY_LIMIT_SLACK);
    let timeout = Duration::from_secs(server.timeout_seconds);
    let storage = &state.config.storage;
    let files = ServeDir::new(&storage.base_dir);
    let public_prefix = storage.public_prefix.clone();

    Router::new()
        // Conversation practice
        .route("/api/conversation/start", post(conversation::start))
        .route("/api/conversation/:id/speak", post(conversation::speak))
        .route("/api/conversation/:id/history", get(conversation::history))
        .route("/api/conversation/:id/end", post(conversation::end))
        .route(
            "/api/conversation/:id",
            axum::routing::delete(conversation::delete),
        )
        .route("/api/conversation/:id/ws", get(websocket::ws_handler))
        .route("/api/conversation/:id/stream", get(websocket::stream_handler))
        // Avatar animation
        .route("/api/avatar/animate", post(avatar::animate))
        .route("/api/avatar/from-url", post(avatar::from_url))
        // Video evaluation
        .route("/api/evaluation/upload", post(evaluation::upload))
        .route("/api/evaluation/:id/analyze", post(evaluation::analyze))
        .route("/api/evaluation/:id/status", get(evaluation::status))
        .route("/api/evaluation/:id/report", get(evaluation::report))
        // Session management
        .route("/api/sessions", get(sessions::list))
        .route(
            "/api/sessions/:id",
            get(sessions::get).delete(sessions::delete),
        )
        // Health check
        .route("/health", get(health_check))
        // Prometheus metrics
        .route("/metrics", get(metrics_handler))
        // Stored audio and video
        .nest_service(&public_prefix, files)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors_layer)
        .with_state(state)
}

/// Build CORS layer from configured origins
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        tracing::warn!("CORS is disabled - allowing all origins (NOT FOR PRODUCTION)");
        return CorsLayer::permissive();
    }

    let parsed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("Invalid CORS origin: {}", origin);
                None
            })
        })
        .collect();

    if parsed_origins.is_empty() {
        tracing::info!("No usable CORS origins configured, defaulting to {}", LOCAL_UI_ORIGIN);
        return CorsLayer::new()
            .allow_origin(HeaderValue::from_static(LOCAL_UI_ORIGIN))
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers(Any);
    }

    tracing::info!("CORS configured with {} origins", parsed_origins.len());
    CorsLayer::new()
        .allow_origin(parsed_origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub environment: coach_config::RuntimeEnvironment,
    pub providers: ProviderNames,
}

/// Health check
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    record_request("health");
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        environment: state.config.environment,
        providers: state.providers.clone(),
    })
}
