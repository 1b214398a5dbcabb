//! Audio2Face through the HuggingFace inference API
//!
//! `POST {endpoint}/models/{model}` with the raw audio as body.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;

use coach_config::constants::{endpoints, models};
use coach_core::{AudioClip, AvatarAnimator, FaceAnimation, Result};

use super::{normalize_frames, BlendshapeResponse};
use crate::http;
use crate::{Capability, PipelineError};

const PROVIDER: &str = "huggingface";

#[derive(Debug, Clone)]
pub struct HuggingFaceConfig {
    pub api_key: String,
    pub model: String,
    pub endpoint: String,
    pub fps: u32,
    pub timeout: Duration,
}

impl Default for HuggingFaceConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: models::AUDIO2FACE_HUGGINGFACE.to_string(),
            endpoint: endpoints::HUGGINGFACE_INFERENCE.to_string(),
            fps: 60,
            timeout: Duration::from_secs(120),
        }
    }
}

pub struct HuggingFaceAvatar {
    config: HuggingFaceConfig,
    client: Client,
}

impl HuggingFaceAvatar {
    pub fn new(config: HuggingFaceConfig) -> std::result::Result<Self, PipelineError> {
        if config.api_key.trim().is_empty() {
            return Err(PipelineError::Configuration(
                "HuggingFace Audio2Face requires an API key (HUGGINGFACE_API_KEY)".to_string(),
            ));
        }
        let client = http::client(config.timeout)?;
        Ok(Self { config, client })
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}",
            http::trim_url(&self.config.endpoint),
            self.config.model
        )
    }

    async fn request(&self, audio: &AudioClip) -> std::result::Result<FaceAnimation, PipelineError> {
        let request = self
            .client
            .post(self.url())
            .bearer_auth(&self.config.api_key)
            .header(CONTENT_TYPE, audio.format.mime_type())
            .body(audio.data.clone());

        let response = http::send(PROVIDER, request).await?;
        let parsed: BlendshapeResponse = http::json(PROVIDER, response).await?;

        let fps = parsed.fps.filter(|f| *f > 0).unwrap_or(self.config.fps);
        let mut animation = FaceAnimation::from_frames(
            self.config.model.clone(),
            fps,
            normalize_frames(parsed.blendshapes),
        );
        if let Some(duration) = parsed.duration.filter(|d| d.is_finite() && *d > 0.0) {
            animation.duration_seconds = duration;
        }
        Ok(animation)
    }
}

#[async_trait]
impl AvatarAnimator for HuggingFaceAvatar {
    async fn animate(&self, audio: &AudioClip) -> Result<FaceAnimation> {
        self.request(audio)
            .await
            .map_err(|e| e.into_core(Capability::Avatar))
    }

    fn provider_name(&self) -> &str {
        PROVIDER
    }
}
