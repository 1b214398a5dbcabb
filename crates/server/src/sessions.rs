//! Session management endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use coach_core::{Session, SessionFilter};

use crate::state::AppState;
use crate::ServerError;

/// List sessions, optionally filtered by `type`, `status` and `user_id`
pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<SessionFilter>,
) -> Result<Json<Vec<Session>>, ServerError> {
    Ok(Json(state.store.list(&filter).await?))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Session>, ServerError> {
    Ok(Json(state.store.get(&id).await?))
}

/// Delete a session and its files
///
/// Refused while an evaluation of it is in flight.
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    // hold the run slot so no analysis can start on a directory being removed
    let _slot = state.evaluations.scheduler().claim(&id)?;
    state.store.delete(&id).await?;
    state.conversations.forget(&id);
    Ok(StatusCode::NO_CONTENT)
}
