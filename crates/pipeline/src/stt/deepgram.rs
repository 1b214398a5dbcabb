//! Deepgram pre-recorded transcription
//!
//! `POST {endpoint}/listen?model=...&smart_format=true` with the raw audio
//! as body and `Authorization: Token <key>`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use coach_config::constants::{endpoints, models};
use coach_core::{AudioClip, Result, SpeechToText, Transcript, WordTiming};

use crate::http;
use crate::{Capability, PipelineError};

const PROVIDER: &str = "deepgram";

#[derive(Debug, Clone)]
pub struct DeepgramConfig {
    pub api_key: String,
    pub model: String,
    pub language: String,
    pub endpoint: String,
    pub timeout: Duration,
}

impl Default for DeepgramConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: models::DEEPGRAM.to_string(),
            language: "en".to_string(),
            endpoint: endpoints::DEEPGRAM.to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

pub struct DeepgramStt {
    config: DeepgramConfig,
    client: Client,
}

impl DeepgramStt {
    pub fn new(config: DeepgramConfig) -> std::result::Result<Self, PipelineError> {
        if config.api_key.trim().is_empty() {
            return Err(PipelineError::Configuration(
                "Deepgram requires an API key (DEEPGRAM_API_KEY)".to_string(),
            ));
        }
        let client = http::client(config.timeout)?;
        Ok(Self { config, client })
    }

    async fn request(&self, audio: &AudioClip) -> std::result::Result<Transcript, PipelineError> {
        let url = format!("{}/listen", http::trim_url(&self.config.endpoint));
        let request = self
            .client
            .post(url)
            .query(&[
                ("model", self.config.model.as_str()),
                ("language", self.config.language.as_str()),
                ("smart_format", "true"),
            ])
            .header("Authorization", format!("Token {}", self.config.api_key))
            .header("Content-Type", audio.format.mime_type())
            .body(audio.data.clone());

        let response = http::send(PROVIDER, request).await?;
        let body: ListenResponse = http::json(PROVIDER, response).await?;
        Ok(body.into_transcript(&self.config.language))
    }
}

#[async_trait]
impl SpeechToText for DeepgramStt {
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

// Deepgram API types

#[derive(Debug, Deserialize)]
struct ListenResponse {
    results: Option<ListenResults>,
}

#[derive(Debug, Deserialize)]
struct ListenResults {
    #[serde(default)]
    channels: Vec<Channel>,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(default)]
    alternatives: Vec<Alternative>,
}

#[derive(Debug, Deserialize)]
struct Alternative {
    #[serde(default)]
    transcript: String,
    confidence: Option<f32>,
    #[serde(default)]
    words: Vec<DeepgramWord>,
}

#[derive(Debug, Deserialize)]
struct DeepgramWord {
    word: String,
    start: f64,
    end: f64,
    punctuated_word: Option<String>,
}

impl ListenResponse {
    /// No alternatives means nothing was heard; that is an empty transcript
    fn into_transcript(self, language: &str) -> Transcript {
        let best = self
            .results
            .and_then(|r| r.channels.into_iter().next())
            .and_then(|c| c.alternatives.into_iter().next());

        let Some(best) = best else {
            return Transcript::new("").with_language(language);
        };

        let words = best
            .words
            .into_iter()
            .map(|w| WordTiming {
                word: w.punctuated_word.unwrap_or(w.word),
                start: w.start,
                end: w.end,
            })
            .collect();

        let mut transcript = Transcript::new(best.transcript.trim())
            .with_words(words)
            .with_language(language);
        transcript.confidence = best.confidence;
        transcript
    }
}
