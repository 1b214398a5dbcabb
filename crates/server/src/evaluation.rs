//! Evaluation endpoints

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use coach_agent::{EvaluationStatus, VideoUpload};
use coach_core::{EvaluationResult, Session};

use crate::metrics::record_request;
use crate::state::AppState;
use crate::ServerError;

/// Acknowledgement for a scheduled analysis
#[derive(Debug, Serialize)]
pub struct AnalyzeAccepted {
    pub session_id: String,
    pub status: &'static str,
}

/// Multipart upload: a `video` file and an optional `user_id` field
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Session>), ServerError> {
    record_request("upload");

    let mut video: Option<VideoUpload> = None;
    let mut user_id = None;
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "video" => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await?;
                video = Some(VideoUpload {
                    file_name,
                    content_type,
                    data: data.to_vec(),
                    user_id: None,
                });
            },
            "user_id" => {
                let value = field.text().await?;
                if !value.trim().is_empty() {
                    user_id = Some(value);
                }
            },
            _ => {},
        }
    }

    let mut video = video
        .ok_or_else(|| ServerError::InvalidRequest("missing 'video' file field".to_string()))?;
    video.user_id = user_id;

    let session = state.evaluations.upload(video).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// Schedule the pipeline and return immediately
pub async fn analyze(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<AnalyzeAccepted>), ServerError> {
    record_request("analyze");
    // the run continues after the response; its outcome lands on the session
    let _handle = state.evaluations.analyze(&id).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(AnalyzeAccepted {
            session_id: id,
            status: "processing",
        }),
    ))
}

pub async fn status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<EvaluationStatus>, ServerError> {
    Ok(Json(state.evaluations.status(&id).await?))
}

pub async fn report(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<EvaluationResult>, ServerError> {
    record_request("report");
    Ok(Json(state.evaluations.report(&id).await?))
}
