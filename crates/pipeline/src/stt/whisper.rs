//! Whisper sidecar STT
//!
//! Posts the WAV recording to a local Whisper service at
//! `{url}/transcribe`. The model runs out of process so the server never
//! links an inference runtime.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use coach_config::constants::{endpoints, models};
use coach_core::{AudioClip, Result, SpeechToText, Transcript, WordTiming};

use crate::http;
use crate::{Capability, PipelineError};

const PROVIDER: &str = "whisper-local";

/// Whisper sidecar configuration
#[derive(Debug, Clone)]
pub struct WhisperConfig {
    /// Base URL of the sidecar
    pub url: String,
    /// Whisper model size (tiny, base, small, ...)
    pub model: String,
    /// Language hint, e.g. "en"
    pub language: String,
    pub timeout: Duration,
}

impl Default for WhisperConfig {
    fn default() -> Self {
        Self {
            url: endpoints::WHISPER_SIDECAR.to_string(),
            model: models::WHISPER.to_string(),
            language: "en".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Response from the sidecar
#[derive(Debug, Deserialize)]
struct SidecarResponse {
    #[serde(default)]
    text: String,
    #[serde(default)]
    confidence: Option<f32>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    words: Vec<WordTiming>,
    #[serde(default)]
    error: Option<String>,
}

pub struct WhisperSidecarStt {
    config: WhisperConfig,
    client: Client,
}

impl WhisperSidecarStt {
    pub fn new(config: WhisperConfig) -> std::result::Result<Self, PipelineError> {
        let client = http::client(config.timeout)?;
        Ok(Self { config, client })
    }

    async fn request(&self, audio: &AudioClip) -> std::result::Result<Transcript, PipelineError> {
        let url = format!("{}/transcribe", http::trim_url(&self.config.url));
        let request = self
            .client
            .post(url)
            .header("Content-Type", audio.format.mime_type())
            .header("X-Language", &self.config.language)
            .header("X-Model", &self.config.model)
            .body(audio.data.clone());

        let response = http::send(PROVIDER, request).await?;
        let body: SidecarResponse = http::json(PROVIDER, response).await?;
        into_transcript(body)
    }
}

fn into_transcript(body: SidecarResponse) -> std::result::Result<Transcript, PipelineError> {
    if let Some(error) = body.error {
        return Err(PipelineError::InvalidResponse {
            provider: PROVIDER,
            message: error,
        });
    }

    let mut transcript = Transcript::new(body.text.trim()).with_words(body.words);
    transcript.confidence = body.confidence;
    transcript.language = body.language;
    Ok(transcript)
}

#[async_trait]
impl SpeechToText for WhisperSidecarStt {
    async fn transcribe(&self, audio: &AudioClip) -> Result<Transcript> {
        if audio.is_empty() {
            return Err(coach_core::Error::transcription("empty audio"));
        }
        self.request(audio)
            .await
            .map_err(|e| e.into_core(Capability::Stt))
    }

    fn provider_name(&self) -> &str {
        PROVIDER
    }
}
