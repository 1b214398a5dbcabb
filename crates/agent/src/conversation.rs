//! Conversation orchestrator
//!
//! One turn: optional transcription, a reply generated from the full
//! history, optional synthesis of the reply. Turns on one session run one
//! at a time; different sessions proceed concurrently.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::Mutex;

use coach_config::ConversationConfig;
use coach_core::{
    AudioClip, ConversationHistory, ConversationMessage, Error, Result, RetryPolicy, Session,
    SessionStatus, SessionType, Transcript,
};
use coach_llm::CONVERSATION_SYSTEM_PROMPT;
use coach_persistence::{FileKind, SessionStore};

use crate::instrument::timed;
use crate::providers::Providers;

/// What the user said
#[derive(Debug, Clone)]
pub enum TurnInput {
    Text(String),
    Audio(AudioClip),
}

/// Result of one turn
#[derive(Debug, Clone, Serialize)]
pub struct TurnReply {
    pub session_id: String,
    /// User text as typed or transcribed
    pub transcript: String,
    pub reply_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    /// Seconds spent on the turn
    pub processing_time: f64,
}

pub struct ConversationOrchestrator {
    store: Arc<dyn SessionStore>,
    providers: Providers,
    system_prompt: String,
    synthesize_replies: bool,
    retry: RetryPolicy,
    turn_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl ConversationOrchestrator {
    pub fn new(
        store: Arc<dyn SessionStore>,
        providers: Providers,
        config: &ConversationConfig,
    ) -> Self {
        Self {
            store,
            providers,
            system_prompt: config
                .system_prompt
                .clone()
                .unwrap_or_else(|| CONVERSATION_SYSTEM_PROMPT.to_string()),
            synthesize_replies: config.synthesize_replies,
            retry: RetryPolicy::default(),
            turn_locks: DashMap::new(),
        }
    }

    /// Retry policy for transcription
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub async fn start(
        &self,
        user_id: Option<String>,
        metadata: BTreeMap<String, serde_json::Value>,
    ) -> Result<Session> {
        let session = self
            .store
            .create(SessionType::Conversation, user_id, metadata)
            .await?;

        metrics::counter!("coach_sessions_created_total", "type" => "conversation").increment(1);
        tracing::info!(session_id = %session.id, "Conversation started");
        Ok(session)
    }

    /// Run one turn and persist both messages
    pub async fn turn(&self, id: &str, input: TurnInput) -> Result<TurnReply> {
        let started = Instant::now();
        self.conversation(id).await?;

        let lock = self.turn_lock(id);
        let _guard = lock.lock().await;

        // re-read under the lock; a concurrent end may have won
        let session = self.conversation(id).await?;
        if session.status != SessionStatus::Active {
            return Err(Error::Validation(format!(
                "conversation {} has ended",
                id
            )));
        }

        let history = self.store.history(id).await?;
        let index = history.len();

        let (user_text, input_url) = match input {
            TurnInput::Text(text) => {
                let text = text.trim().to_string();
                if text.is_empty() {
                    return Err(Error::Validation("text must not be empty".to_string()));
                }
                (text, None)
            },
            TurnInput::Audio(clip) => {
                if clip.is_empty() {
                    return Err(Error::Validation("audio must not be empty".to_string()));
                }
                let name = format!("input_{}.{}", index, clip.format.extension());
                let stored = self
                    .store
                    .attach_file(id, FileKind::Audio, &name, &clip.data)
                    .await?;

                let transcript = self.transcribe(&clip).await?;
                if transcript.is_empty() {
                    return Err(Error::Validation("no speech detected in audio".to_string()));
                }
                tracing::debug!(session_id = %id, chars = transcript.text.len(), "Transcribed turn");
                (transcript.text, Some(stored.url))
            },
        };

        let reply = timed(
            "llm",
            self.providers
                .llm
                .converse(&history, &self.system_prompt, &user_text),
        )
        .await?;

        let audio_url = if self.synthesize_replies {
            self.synthesize_reply(id, index + 1, &reply).await
        } else {
            None
        };

        // the pair lands in a single write so a dropped turn cannot leave half of it
        self.store
            .append_turn(
                id,
                ConversationMessage::user(&user_text).with_audio_url(input_url),
                ConversationMessage::assistant(&reply).with_audio_url(audio_url.clone()),
            )
            .await?;

        let elapsed = started.elapsed();
        metrics::counter!("coach_conversation_turns_total").increment(1);
        metrics::histogram!("coach_turn_duration_seconds").record(elapsed.as_secs_f64());
        tracing::info!(
            session_id = %id,
            turn = index / 2 + 1,
            elapsed_ms = elapsed.as_millis() as u64,
            has_audio = audio_url.is_some(),
            "Conversation turn complete"
        );

        Ok(TurnReply {
            session_id: id.to_string(),
            transcript: user_text,
            reply_text: reply,
            audio_url,
            processing_time: round_secs(elapsed),
        })
    }

    pub async fn history(&self, id: &str) -> Result<ConversationHistory> {
        self.conversation(id).await?;
        let messages = self.store.history(id).await?;
        Ok(ConversationHistory::new(id, messages))
    }

    /// Mark the conversation completed
    pub async fn end(&self, id: &str) -> Result<Session> {
        self.conversation(id).await?;

        let session = {
            let lock = self.turn_lock(id);
            let _guard = lock.lock().await;
            self.store
                .update(id, Box::new(|s| s.transition(SessionStatus::Completed)))
                .await?
        };
        self.turn_locks.remove(id);

        tracing::info!(session_id = %id, "Conversation ended");
        Ok(session)
    }

    /// End the conversation if still active, then remove it
    pub async fn delete(&self, id: &str) -> Result<()> {
        let session = self.conversation(id).await?;
        if session.status == SessionStatus::Active {
            self.end(id).await?;
        }
        self.store.delete(id).await?;
        tracing::info!(session_id = %id, "Conversation deleted");
        Ok(())
    }

    /// Drop per-session turn state for a session removed elsewhere
    pub fn forget(&self, id: &str) {
        self.turn_locks.remove(id);
    }

    /// Sessions with turn state held
    pub fn tracked_sessions(&self) -> usize {
        self.turn_locks.len()
    }

    async fn conversation(&self, id: &str) -> Result<Session> {
        let session = self.store.get(id).await?;
        if session.session_type != SessionType::Conversation {
            return Err(Error::NotFound(format!("conversation {}", id)));
        }
        Ok(session)
    }

    fn turn_lock(&self, id: &str) -> Arc<Mutex<()>> {
        self.turn_locks
            .entry(id.to_string())
            .or_default()
            .value()
            .clone()
    }

    async fn transcribe(&self, clip: &AudioClip) -> Result<Transcript> {
        let stt = &self.providers.stt;
        timed(
            "stt",
            self.retry.run("stt.transcribe", move || stt.transcribe(clip)),
        )
        .await
    }

    /// Synthesis failures leave the turn without audio
    async fn synthesize_reply(&self, id: &str, index: usize, reply: &str) -> Option<String> {
        let clip = match timed("tts", self.providers.tts.synthesize(reply, None)).await {
            Ok(clip) => clip,
            Err(e) => {
                tracing::warn!(session_id = %id, error = %e, "Reply synthesis failed");
                return None;
            },
        };

        let name = format!("response_{}.{}", index, clip.format.extension());
        match self
            .store
            .attach_file(id, FileKind::Audio, &name, &clip.data)
            .await
        {
            Ok(stored) => Some(stored.url),
            Err(e) => {
                tracing::warn!(session_id = %id, error = %e, "Could not store reply audio");
                None
            },
        }
    }
}

fn round_secs(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 1000.0).round() / 1000.0
}
