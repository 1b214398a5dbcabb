//! Google Translate TTS
//!
//! The endpoint accepts short strings only, so text is split on word
//! boundaries into chunks of at most [`GTTS_MAX_CHARS`] characters and the
//! MP3 responses are concatenated in order.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use coach_config::constants::endpoints;
use coach_core::{AudioClip, Result, TextToSpeech, VoiceStyle};

use super::require_text;
use crate::http;
use crate::{Capability, PipelineError};

const PROVIDER: &str = "gtts";

/// Longest chunk sent in one request
pub const GTTS_MAX_CHARS: usize = 100;

#[derive(Debug, Clone)]
pub struct GttsConfig {
    pub language: String,
    /// Use the slower speaking rate
    pub slow: bool,
    pub endpoint: String,
    pub timeout: Duration,
}

impl Default for GttsConfig {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            slow: false,
            endpoint: endpoints::GTTS.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

pub struct GttsTts {
    config: GttsConfig,
    client: Client,
}

/// Split on whitespace into chunks of at most `max` characters
///
/// A single word longer than `max` is split mid-word.
pub fn chunk_text(text: &str, max: usize) -> Vec<String> {
    let max = max.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word = word;
        while word.chars().count() > max {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            let split = word
                .char_indices()
                .nth(max)
                .map(|(i, _)| i)
                .unwrap_or(word.len());
            chunks.push(word[..split].to_string());
            word = &word[split..];
        }
        if word.is_empty() {
            continue;
        }

        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > max {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

impl GttsTts {
    pub fn new(config: GttsConfig) -> std::result::Result<Self, PipelineError> {
        let client = http::client(config.timeout)?;
        Ok(Self { config, client })
    }

    async fn request(&self, text: &str) -> std::result::Result<AudioClip, PipelineError> {
        let text = require_text(text)?;
        let chunks = chunk_text(text, GTTS_MAX_CHARS);
        let total = chunks.len().to_string();
        let speed = if self.config.slow { "0.3" } else { "1" };
        let url = format!("{}/translate_tts", http::trim_url(&self.config.endpoint));

        let mut audio = Vec::new();
        for (idx, chunk) in chunks.iter().enumerate() {
            let idx = idx.to_string();
            let request = self.client.get(&url).query(&[
                ("ie", "UTF-8"),
                ("client", "tw-ob"),
                ("tl", self.config.language.as_str()),
                ("ttsspeed", speed),
                ("total", total.as_str()),
                ("idx", idx.as_str()),
                ("q", chunk.as_str()),
            ]);
            let response = http::send(PROVIDER, request).await?;
            audio.extend(http::bytes(PROVIDER, response).await?);
        }

        tracing::debug!(chunks = chunks.len(), bytes = audio.len(), "gTTS synthesis complete");
        Ok(AudioClip::mp3(audio))
    }
}

#[async_trait]
impl TextToSpeech for GttsTts {
    /// Voice selection is not supported; the language picks the voice
    async fn synthesize(&self, text: &str, _style: Option<&VoiceStyle>) -> Result<AudioClip> {
        self.request(text)
            .await
            .map_err(|e| e.into_core(Capability::Tts))
    }

    fn provider_name(&self) -> &str {
        PROVIDER
    }
}
