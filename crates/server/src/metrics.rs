//! Observability Metrics
//!
//! Prometheus recorder and the `/metrics` endpoint.

use std::sync::OnceLock;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
};
use metrics::{counter, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::state::AppState;
use crate::ServerError;

/// Global Prometheus handle
static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder
///
/// Call once at startup before recording any metrics.
pub fn init_metrics() -> Result<PrometheusHandle, ServerError> {
    if let Some(handle) = METRICS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| ServerError::Metrics(format!("failed to install recorder: {}", e)))?;

    register_default_metrics();

    METRICS_HANDLE.get_or_init(|| handle.clone());
    Ok(handle)
}

pub fn get_metrics_handle() -> Option<&'static PrometheusHandle> {
    METRICS_HANDLE.get()
}

/// Zero the series dashboards expect to exist
fn register_default_metrics() {
    gauge!("coach_evaluations_running").set(0.0);
    counter!("coach_sessions_created_total", "type" => "conversation").absolute(0);
    counter!("coach_sessions_created_total", "type" => "evaluation").absolute(0);
    counter!("coach_sessions_swept_total").absolute(0);

    for endpoint in ["health", "speak", "ws", "upload", "analyze", "report"] {
        counter!("coach_requests_total", "endpoint" => endpoint).absolute(0);
    }
}

/// Record request to endpoint
pub fn record_request(endpoint: &'static str) {
    counter!("coach_requests_total", "endpoint" => endpoint).increment(1);
}

/// Record a failed request by error kind
pub fn record_error(kind: &'static str) {
    counter!("coach_errors_total", "kind" => kind).increment(1);
}

fn record_running_evaluations(count: usize) {
    gauge!("coach_evaluations_running").set(count as f64);
}

/// Metrics endpoint handler
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    record_running_evaluations(state.evaluations.scheduler().running());

    match get_metrics_handle() {
        Some(handle) => (
            StatusCode::OK,
            [(
                header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            handle.render(),
        ),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::CONTENT_TYPE, "text/plain")],
            "Metrics not initialized".to_string(),
        ),
    }
}
