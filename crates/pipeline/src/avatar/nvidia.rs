//! NVIDIA Audio2Face-3D
//!
//! `POST {endpoint}` with a bearer key and a JSON body carrying the base64
//! audio; the response lists blendshape frames.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::Client;
use serde::Serialize;

use coach_config::constants::{endpoints, models};
use coach_core::{AudioClip, AvatarAnimator, FaceAnimation, Result};

use super::{normalize_frames, BlendshapeResponse};
use crate::http;
use crate::{Capability, PipelineError};

const PROVIDER: &str = "nvidia";

#[derive(Debug, Clone)]
pub struct NvidiaConfig {
    pub api_key: String,
    pub model: String,
    pub endpoint: String,
    pub fps: u32,
    pub timeout: Duration,
}

impl Default for NvidiaConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: models::AUDIO2FACE_NVIDIA.to_string(),
            endpoint: endpoints::NVIDIA_AUDIO2FACE.to_string(),
            fps: 60,
            timeout: Duration::from_secs(120),
        }
    }
}

#[derive(Serialize)]
struct AnimateRequest<'a> {
    audio: String,
    model: &'a str,
    output_format: &'static str,
    fps: u32,
}

pub struct NvidiaAvatar {
    config: NvidiaConfig,
    client: Client,
}

impl NvidiaAvatar {
    pub fn new(config: NvidiaConfig) -> std::result::Result<Self, PipelineError> {
        if config.api_key.trim().is_empty() {
            return Err(PipelineError::Configuration(
                "NVIDIA Audio2Face requires an API key (NVIDIA_API_KEY)".to_string(),
            ));
        }
        let client = http::client(config.timeout)?;
        Ok(Self { config, client })
    }

    async fn request(&self, audio: &AudioClip) -> std::result::Result<FaceAnimation, PipelineError> {
        let body = AnimateRequest {
            audio: BASE64.encode(&audio.data),
            model: &self.config.model,
            output_format: "blendshapes",
            fps: self.config.fps,
        };
        let request = self
            .client
            .post(http::trim_url(&self.config.endpoint))
            .bearer_auth(&self.config.api_key)
            .json(&body);

        let response = http::send(PROVIDER, request).await?;
        let parsed: BlendshapeResponse = http::json(PROVIDER, response).await?;
        if parsed.blendshapes.is_empty() {
            return Err(PipelineError::InvalidResponse {
                provider: PROVIDER,
                message: "no blendshape frames".to_string(),
            });
        }

        let fps = parsed.fps.filter(|f| *f > 0).unwrap_or(self.config.fps);
        Ok(FaceAnimation::from_frames(
            self.config.model.clone(),
            fps,
            normalize_frames(parsed.blendshapes),
        ))
    }
}

#[async_trait]
impl AvatarAnimator for NvidiaAvatar {
    async fn animate(&self, audio: &AudioClip) -> Result<FaceAnimation> {
        self.request(audio)
            .await
            .map_err(|e| e.into_core(Capability::Avatar))
    }

    fn provider_name(&self) -> &str {
        PROVIDER
    }
}
