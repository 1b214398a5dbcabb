//! ElevenLabs text-to-speech
//!
//! `POST {endpoint}/text-to-speech/{voice_id}?output_format=mp3_44100_128`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use coach_config::constants::{endpoints, models};
use coach_core::{AudioClip, Result, TextToSpeech, VoiceStyle};

use super::require_text;
use crate::http;
use crate::{Capability, PipelineError};

const PROVIDER: &str = "elevenlabs";

#[derive(Debug, Clone)]
pub struct ElevenLabsConfig {
    pub api_key: String,
    pub voice_id: String,
    pub model_id: String,
    pub output_format: String,
    pub speed: f32,
    pub endpoint: String,
    pub timeout: Duration,
}

impl Default for ElevenLabsConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            voice_id: models::ELEVENLABS_VOICE.to_string(),
            model_id: models::ELEVENLABS.to_string(),
            output_format: models::ELEVENLABS_OUTPUT_FORMAT.to_string(),
            speed: 1.0,
            endpoint: endpoints::ELEVENLABS.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

pub struct ElevenLabsTts {
    config: ElevenLabsConfig,
    client: Client,
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    voice_settings: Option<VoiceSettings>,
}

#[derive(Debug, Serialize)]
struct VoiceSettings {
    speed: f32,
}

impl ElevenLabsTts {
    pub fn new(config: ElevenLabsConfig) -> std::result::Result<Self, PipelineError> {
        if config.api_key.trim().is_empty() {
            return Err(PipelineError::Configuration(
                "ElevenLabs requires an API key (ELEVENLABS_API_KEY)".to_string(),
            ));
        }
        let client = http::client(config.timeout)?;
        Ok(Self { config, client })
    }

    fn build_request<'a>(
        &'a self,
        text: &'a str,
        style: Option<&VoiceStyle>,
    ) -> (String, SpeechRequest<'a>) {
        let voice_id = style
            .and_then(|s| s.voice_id.as_deref())
            .unwrap_or(self.config.voice_id.as_str());
        let speed = style.map(|s| s.speed).unwrap_or(self.config.speed);

        let url = format!(
            "{}/text-to-speech/{}",
            http::trim_url(&self.config.endpoint),
            voice_id
        );
        let body = SpeechRequest {
            text,
            model_id: &self.config.model_id,
            voice_settings: ((speed - 1.0).abs() > f32::EPSILON).then_some(VoiceSettings { speed }),
        };
        (url, body)
    }

    async fn request(
        &self,
        text: &str,
        style: Option<&VoiceStyle>,
    ) -> std::result::Result<AudioClip, PipelineError> {
        let text = require_text(text)?;
        let (url, body) = self.build_request(text, style);

        let request = self
            .client
            .post(url)
            .query(&[("output_format", self.config.output_format.as_str())])
            .header("xi-api-key", &self.config.api_key)
            .header("Accept", "audio/mpeg")
            .json(&body);

        let response = http::send(PROVIDER, request).await?;
        Ok(AudioClip::mp3(http::bytes(PROVIDER, response).await?))
    }
}

#[async_trait]
impl TextToSpeech for ElevenLabsTts {
    async fn synthesize(&self, text: &str, style: Option<&VoiceStyle>) -> Result<AudioClip> {
        self.request(text, style)
            .await
            .map_err(|e| e.into_core(Capability::Tts))
    }

    fn provider_name(&self) -> &str {
        PROVIDER
    }
}
