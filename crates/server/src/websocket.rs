//! WebSocket Handler
//!
//! Conversation turns over a socket. Messages are processed in arrival
//! order; each text or audio message yields a transcript and a response.
//!
//! The stream route takes continuous 16-bit mono PCM instead of recorded
//! utterances. Voice activity detection cuts it into segments and every
//! segment becomes one turn.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::Response,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};

use coach_agent::TurnInput;
use coach_core::AudioClip;
use coach_pipeline::{pcm_to_wav, VadConfig, VadEvent, VadSegmenter};

use crate::metrics::record_request;
use crate::state::AppState;
use crate::ServerError;

/// WebSocket message types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsMessage {
    /// Recorded utterance (base64 WAV)
    Audio {
        data: String,
    },
    /// Raw PCM chunk (base64), stream route only
    AudioChunk {
        data: String,
    },
    /// Drop buffered stream audio
    Reset,
    /// Text input
    Text {
        content: String,
    },
    /// Voice detected on the stream
    SpeechStarted,
    /// Segment closed; `accepted` is false when it was too short to keep
    SpeechEnded {
        duration_ms: u32,
        accepted: bool,
    },
    /// What the user said
    Transcript {
        text: String,
    },
    /// Coach reply
    Response {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        audio_url: Option<String>,
    },
    Error {
        message: String,
    },
    /// Ping/Pong
    Ping,
    Pong,
    SessionInfo {
        session_id: String,
    },
    /// End session
    EndSession,
    Ended {
        session_id: String,
    },
}

type WsSender = SplitSink<WebSocket, Message>;

/// Upgrade after checking the conversation exists
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Response, ServerError> {
    record_request("ws");
    state.conversations.history(&session_id).await?;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, session_id, state, None)))
}

/// Upgrade for continuous PCM with server-side segmentation
pub async fn stream_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Response, ServerError> {
    record_request("ws_stream");
    state.conversations.history(&session_id).await?;

    let segmenter = VadSegmenter::new(VadConfig::from(&state.config.conversation.vad));
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, session_id, state, Some(segmenter))))
}

async fn handle_socket(
    socket: WebSocket,
    session_id: String,
    state: AppState,
    mut segmenter: Option<VadSegmenter>,
) {
    let (mut sender, mut receiver) = socket.split();

    let info = WsMessage::SessionInfo {
        session_id: session_id.clone(),
    };
    if !send(&mut sender, &info).await {
        return;
    }

    while let Some(frame) = receiver.next().await {
        let message = match frame {
            Ok(Message::Text(text)) => match serde_json::from_str::<WsMessage>(&text) {
                Ok(message) => message,
                Err(e) => {
                    let error = WsMessage::Error {
                        message: format!("malformed message: {}", e),
                    };
                    if !send(&mut sender, &error).await {
                        break;
                    }
                    continue;
                },
            },
            Ok(Message::Binary(data)) => {
                if let Some(segmenter) = segmenter.as_mut() {
                    let replies = process_pcm(&state, &session_id, segmenter, &data).await;
                    if !send_all(&mut sender, &replies).await {
                        return;
                    }
                    continue;
                }
                // raw WAV bytes count as an audio message
                WsMessage::Audio {
                    data: BASE64.encode(data),
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!(session_id = %session_id, error = %e, "WebSocket receive failed");
                break;
            },
        };

        let replies = match message {
            WsMessage::Ping => vec![WsMessage::Pong],
            WsMessage::Text { content } => turn(&state, &session_id, TurnInput::Text(content)).await,
            WsMessage::Audio { data } => match BASE64.decode(data.as_bytes()) {
                Ok(bytes) => turn(&state, &session_id, TurnInput::Audio(AudioClip::wav(bytes))).await,
                Err(e) => vec![WsMessage::Error {
                    message: format!("audio is not valid base64: {}", e),
                }],
            },
            WsMessage::AudioChunk { data } => match (segmenter.as_mut(), BASE64.decode(data.as_bytes())) {
                (Some(segmenter), Ok(pcm)) => process_pcm(&state, &session_id, segmenter, &pcm).await,
                (None, _) => vec![WsMessage::Error {
                    message: "audio chunks need the stream endpoint".to_string(),
                }],
                (_, Err(e)) => vec![WsMessage::Error {
                    message: format!("audio is not valid base64: {}", e),
                }],
            },
            WsMessage::Reset => {
                if let Some(segmenter) = segmenter.as_mut() {
                    segmenter.reset();
                }
                Vec::new()
            },
            WsMessage::EndSession => {
                let reply = match state.conversations.end(&session_id).await {
                    Ok(_) => WsMessage::Ended {
                        session_id: session_id.clone(),
                    },
                    Err(e) => WsMessage::Error {
                        message: e.to_string(),
                    },
                };
                let _ = send(&mut sender, &reply).await;
                break;
            },
            other => vec![WsMessage::Error {
                message: format!("unexpected client message: {:?}", other),
            }],
        };

        if !send_all(&mut sender, &replies).await {
            return;
        }
    }

    let _ = sender.close().await;
    tracing::info!(session_id = %session_id, "WebSocket closed");
}

/// Feed PCM to the segmenter and run a turn for every completed segment
pub async fn process_pcm(
    state: &AppState,
    session_id: &str,
    segmenter: &mut VadSegmenter,
    pcm: &[u8],
) -> Vec<WsMessage> {
    let mut replies = Vec::new();
    for event in segmenter.push(pcm) {
        match event {
            VadEvent::SpeechStarted => replies.push(WsMessage::SpeechStarted),
            VadEvent::Discarded { duration_ms } => replies.push(WsMessage::SpeechEnded {
                duration_ms,
                accepted: false,
            }),
            VadEvent::Segment(segment) => {
                let sample_rate = segmenter.sample_rate();
                let duration_ms = (segment.len() as u64 * 1000 / (sample_rate as u64 * 2)) as u32;
                replies.push(WsMessage::SpeechEnded {
                    duration_ms,
                    accepted: true,
                });
                match pcm_to_wav(&segment, sample_rate) {
                    Ok(wav) => {
                        let clip = AudioClip::wav(wav).with_sample_rate(sample_rate);
                        replies.extend(turn(state, session_id, TurnInput::Audio(clip)).await);
                    },
                    Err(e) => replies.push(WsMessage::Error {
                        message: e.to_string(),
                    }),
                }
            },
        }
    }
    replies
}

async fn turn(state: &AppState, session_id: &str, input: TurnInput) -> Vec<WsMessage> {
    match state.conversations.turn(session_id, input).await {
        Ok(reply) => vec![
            WsMessage::Transcript {
                text: reply.transcript,
            },
            WsMessage::Response {
                text: reply.reply_text,
                audio_url: reply.audio_url,
            },
        ],
        Err(e) => {
            tracing::warn!(session_id = %session_id, error = %e, "WebSocket turn failed");
            vec![WsMessage::Error {
                message: e.to_string(),
            }]
        },
    }
}

async fn send_all(sender: &mut WsSender, messages: &[WsMessage]) -> bool {
    for message in messages {
        if !send(sender, message).await {
            return false;
        }
    }
    true
}

/// Returns false once the peer is gone
async fn send(sender: &mut WsSender, message: &WsMessage) -> bool {
    let text = match serde_json::to_string(message) {
        Ok(text) => text,
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode WebSocket message");
            return true;
        },
    };
    sender.send(Message::Text(text)).await.is_ok()
}
