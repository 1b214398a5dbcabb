//! Google Cloud Speech-to-Text (REST `speech:recognize`)
//!
//! Expects 16 kHz mono LINEAR16 audio, which is what the media extractor
//! produces. Result segments are joined into one transcript.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use coach_config::constants::endpoints;
use coach_core::{AudioClip, AudioFormat, Result, SpeechToText, Transcript, WordTiming};

use crate::http;
use crate::{Capability, PipelineError};

const PROVIDER: &str = "google-cloud";
const SAMPLE_RATE: u32 = 16_000;

#[derive(Debug, Clone)]
pub struct GoogleCloudConfig {
    pub api_key: String,
    /// Short code ("en") or BCP-47 tag ("en-GB")
    pub language: String,
    pub endpoint: String,
    pub timeout: Duration,
}

impl Default for GoogleCloudConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            language: "en".to_string(),
            endpoint: endpoints::GOOGLE_SPEECH.to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

pub struct GoogleCloudStt {
    config: GoogleCloudConfig,
    client: Client,
}

impl GoogleCloudStt {
    pub fn new(config: GoogleCloudConfig) -> std::result::Result<Self, PipelineError> {
        if config.api_key.trim().is_empty() {
            return Err(PipelineError::Configuration(
                "Google Cloud Speech requires an API key (GOOGLE_CLOUD_API_KEY)".to_string(),
            ));
        }
        let client = http::client(config.timeout)?;
        Ok(Self { config, client })
    }

    async fn request(&self, audio: &AudioClip) -> std::result::Result<Transcript, PipelineError> {
        if audio.format != AudioFormat::Wav {
            return Err(PipelineError::InvalidInput(format!(
                "Google Cloud Speech expects LINEAR16 WAV, got {}",
                audio.format.extension()
            )));
        }

        let language_code = language_code(&self.config.language);
        let body = RecognizeRequest {
            config: RecognitionConfig {
                encoding: "LINEAR16",
                sample_rate_hertz: audio.sample_rate.unwrap_or(SAMPLE_RATE),
                language_code: &language_code,
                enable_automatic_punctuation: true,
                enable_word_time_offsets: true,
            },
            audio: RecognitionAudio {
                content: base64::engine::general_purpose::STANDARD.encode(&audio.data),
            },
        };

        let url = format!("{}/speech:recognize", http::trim_url(&self.config.endpoint));
        let request = self
            .client
            .post(url)
            .query(&[("key", self.config.api_key.as_str())])
            .json(&body);

        let response = http::send(PROVIDER, request).await?;
        let body: RecognizeResponse = http::json(PROVIDER, response).await?;
        Ok(body.into_transcript(language_code))
    }
}

#[async_trait]
impl SpeechToText for GoogleCloudStt {
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

/// "en" -> "en-US"; full tags pass through
fn language_code(language: &str) -> String {
    match language {
        "" | "en" => "en-US".to_string(),
        other if other.contains('-') => other.to_string(),
        other => format!("{}-{}", other, other.to_uppercase()),
    }
}

/// Offsets arrive as strings like "1.500s"
fn parse_offset(value: &str) -> f64 {
    value.trim_end_matches('s').parse().unwrap_or(0.0)
}

// Google Speech API types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecognizeRequest<'a> {
    config: RecognitionConfig<'a>,
    audio: RecognitionAudio,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecognitionConfig<'a> {
    encoding: &'a str,
    sample_rate_hertz: u32,
    language_code: &'a str,
    enable_automatic_punctuation: bool,
    enable_word_time_offsets: bool,
}

#[derive(Debug, Serialize)]
struct RecognitionAudio {
    content: String,
}

#[derive(Debug, Deserialize)]
struct RecognizeResponse {
    #[serde(default)]
    results: Vec<RecognitionResult>,
}

#[derive(Debug, Deserialize)]
struct RecognitionResult {
    #[serde(default)]
    alternatives: Vec<RecognitionAlternative>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecognitionAlternative {
    #[serde(default)]
    transcript: String,
    confidence: Option<f32>,
    #[serde(default)]
    words: Vec<GoogleWord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleWord {
    word: String,
    #[serde(default)]
    start_time: String,
    #[serde(default)]
    end_time: String,
}

impl RecognizeResponse {
    fn into_transcript(self, language: String) -> Transcript {
        let mut text = String::new();
        let mut words = Vec::new();
        let mut confidences = Vec::new();

        for alternative in self
            .results
            .into_iter()
            .filter_map(|r| r.alternatives.into_iter().next())
        {
            text.push_str(&alternative.transcript);
            confidences.extend(alternative.confidence);
            words.extend(alternative.words.into_iter().map(|w| WordTiming {
                start: parse_offset(&w.start_time),
                end: parse_offset(&w.end_time),
                word: w.word,
            }));
        }

        let mut transcript = Transcript::new(text.trim())
            .with_words(words)
            .with_language(language);
        if !confidences.is_empty() {
            transcript.confidence =
                Some(confidences.iter().sum::<f32>() / confidences.len() as f32);
        }
        transcript
    }
}
