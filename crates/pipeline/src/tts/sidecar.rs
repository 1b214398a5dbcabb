//! Sidecar text-to-speech (Edge TTS, local engines)
//!
//! Both speak the same small protocol: `POST {url}/synthesize` with
//! `{text, voice, rate, volume}` and the encoded audio as response body.
//! The response `Content-Type` tells MP3 from WAV.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::Serialize;

use coach_core::{AudioClip, AudioFormat, Result, TextToSpeech, VoiceStyle};

use super::require_text;
use crate::http;
use crate::{Capability, PipelineError};

#[derive(Debug, Clone)]
pub struct SidecarConfig {
    /// Name reported in logs and health output ("edge", "local")
    pub provider: &'static str,
    pub url: String,
    pub voice: Option<String>,
    pub speed: f32,
    pub timeout: Duration,
}

pub struct SidecarTts {
    config: SidecarConfig,
    client: Client,
}

#[derive(Debug, Serialize)]
struct SynthesizeRequest<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    voice: Option<&'a str>,
    rate: String,
    volume: &'static str,
}

/// Speed multiplier as an Edge-style relative rate: 1.0 -> "+0%", 0.8 -> "-20%"
pub fn rate_percent(speed: f32) -> String {
    let percent = ((speed - 1.0) * 100.0).round() as i32;
    format!("{:+}%", percent)
}

impl SidecarTts {
    pub fn new(config: SidecarConfig) -> std::result::Result<Self, PipelineError> {
        if config.url.trim().is_empty() {
            return Err(PipelineError::Configuration(format!(
                "{} TTS sidecar URL is empty",
                config.provider
            )));
        }
        let client = http::client(config.timeout)?;
        Ok(Self { config, client })
    }

    fn build_request<'a>(
        &'a self,
        text: &'a str,
        style: Option<&'a VoiceStyle>,
    ) -> SynthesizeRequest<'a> {
        let voice = style
            .and_then(|s| s.voice_id.as_deref())
            .or(self.config.voice.as_deref());
        let speed = style.map(|s| s.speed).unwrap_or(self.config.speed);
        SynthesizeRequest {
            text,
            voice,
            rate: rate_percent(speed),
            volume: "+0%",
        }
    }

    async fn request(
        &self,
        text: &str,
        style: Option<&VoiceStyle>,
    ) -> std::result::Result<AudioClip, PipelineError> {
        let provider = self.config.provider;
        let text = require_text(text)?;
        let body = self.build_request(text, style);

        let url = format!("{}/synthesize", http::trim_url(&self.config.url));
        let response = http::send(provider, self.client.post(url).json(&body)).await?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let format = match content_type.as_deref() {
            Some(ct) => AudioFormat::detect(Some(ct), None),
            None => AudioFormat::Mp3,
        };

        let data = http::bytes(provider, response).await?;
        Ok(AudioClip::new(data, format))
    }
}

#[async_trait]
impl TextToSpeech for SidecarTts {
    async fn synthesize(&self, text: &str, style: Option<&VoiceStyle>) -> Result<AudioClip> {
        self.request(text, style)
            .await
            .map_err(|e| e.into_core(Capability::Tts))
    }

    fn provider_name(&self) -> &str {
        self.config.provider
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge() -> SidecarTts {
        SidecarTts::new(SidecarConfig {
            provider: "edge",
            url: "http://127.0.0.1:8091/".to_string(),
            voice: Some("en-US-AriaNeural".to_string()),
            speed: 1.0,
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[test]
    fn test_rate_percent() {
        assert_eq!(rate_percent(1.0), "+0%");
        assert_eq!(rate_percent(1.25), "+25%");
        assert_eq!(rate_percent(0.8), "-20%");
    }

    #[test]
    fn test_request_uses_configured_voice() {
        let tts = edge();
        let json = serde_json::to_value(tts.build_request("Hi", None)).unwrap();
        assert_eq!(json["voice"], "en-US-AriaNeural");
        assert_eq!(json["rate"], "+0%");
        assert_eq!(json["volume"], "+0%");
    }

    #[test]
    fn test_style_overrides() {
        let tts = edge();
        let style = VoiceStyle {
            voice_id: Some("en-GB-SoniaNeural".to_string()),
            speed: 0.9,
        };
        let json = serde_json::to_value(tts.build_request("Hi", Some(&style))).unwrap();
        assert_eq!(json["voice"], "en-GB-SoniaNeural");
        assert_eq!(json["rate"], "-10%");
    }

    #[test]
    fn test_empty_url_rejected() {
        let result = SidecarTts::new(SidecarConfig {
            provider: "local",
            url: String::new(),
            voice: None,
            speed: 1.0,
            timeout: Duration::from_secs(5),
        });
        assert!(matches!(result, Err(PipelineError::Configuration(_))));
    }
}
