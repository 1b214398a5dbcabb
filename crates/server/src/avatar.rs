//! Avatar animation endpoints

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Deserialize;

use coach_agent::AnimationReply;
use coach_core::{AudioClip, AudioFormat};

use crate::metrics::record_request;
use crate::state::AppState;
use crate::ServerError;

#[derive(Debug, Deserialize)]
pub struct FromUrlRequest {
    pub audio_url: String,
}

/// Blendshapes for an uploaded `audio` file
pub async fn animate(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AnimationReply>, ServerError> {
    record_request("avatar_animate");

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("audio") {
            continue;
        }
        let format = AudioFormat::detect(field.content_type(), field.file_name());
        let data = field.bytes().await?;
        let reply = state
            .avatar
            .animate(&AudioClip::new(data.to_vec(), format))
            .await?;
        return Ok(Json(reply));
    }

    Err(ServerError::InvalidRequest("an audio file must be provided".to_string()))
}

/// Blendshapes for audio this server stored, saved next to it
pub async fn from_url(
    State(state): State<AppState>,
    Json(request): Json<FromUrlRequest>,
) -> Result<Json<AnimationReply>, ServerError> {
    record_request("avatar_from_url");
    Ok(Json(state.avatar.animate_stored(&request.audio_url).await?))
}
