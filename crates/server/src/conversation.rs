//! Conversation endpoints

use std::collections::BTreeMap;

use axum::{
    extract::{FromRequest, Multipart, Path, Request, State},
    http::{header, StatusCode},
    Json,
};
use serde::Deserialize;

use coach_agent::{TurnInput, TurnReply};
use coach_core::{AudioClip, AudioFormat, ConversationHistory, Session};

use crate::metrics::record_request;
use crate::state::AppState;
use crate::ServerError;

/// Optional body for `start`
#[derive(Debug, Default, Deserialize)]
pub struct StartRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// JSON body for `speak`
#[derive(Debug, Deserialize)]
pub struct SpeakRequest {
    pub text: String,
}

pub async fn start(
    State(state): State<AppState>,
    body: Option<Json<StartRequest>>,
) -> Result<(StatusCode, Json<Session>), ServerError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let session = state
        .conversations
        .start(request.user_id, request.metadata)
        .await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// One turn from typed text or an uploaded recording
pub async fn speak(
    State(state): State<AppState>,
    Path(id): Path<String>,
    request: Request,
) -> Result<Json<TurnReply>, ServerError> {
    record_request("speak");
    let input = read_turn_input(request).await?;
    let reply = state.conversations.turn(&id, input).await?;
    Ok(Json(reply))
}

pub async fn history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ConversationHistory>, ServerError> {
    Ok(Json(state.conversations.history(&id).await?))
}

pub async fn end(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Session>, ServerError> {
    Ok(Json(state.conversations.end(&id).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    state.conversations.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn is_multipart(request: &Request) -> bool {
    request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map_or(false, |v| v.starts_with("multipart/form-data"))
}

/// JSON `{text}` or multipart with an `audio` file or a `text` field
async fn read_turn_input(request: Request) -> Result<TurnInput, ServerError> {
    if !is_multipart(&request) {
        let Json(body) = Json::<SpeakRequest>::from_request(request, &())
            .await
            .map_err(|e| ServerError::InvalidRequest(e.body_text()))?;
        return Ok(TurnInput::Text(body.text));
    }

    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|e| ServerError::InvalidRequest(e.body_text()))?;

    let mut text = None;
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "audio" => {
                let format = AudioFormat::detect(field.content_type(), field.file_name());
                let data = field.bytes().await?;
                return Ok(TurnInput::Audio(AudioClip::new(data.to_vec(), format)));
            },
            "text" => text = Some(field.text().await?),
            _ => {},
        }
    }

    text.map(TurnInput::Text).ok_or_else(|| {
        ServerError::InvalidRequest("either an audio file or text must be provided".to_string())
    })
}
