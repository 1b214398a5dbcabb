//! Remote pose scoring
//!
//! For sidecars that score the video themselves and answer
//! `POST {url}/analyze` with 0-1 ratios. Ratios are normalized onto the
//! 0-10 scale at this boundary.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use coach_analysis::normalize_unit_score;
use coach_config::constants::endpoints;
use coach_core::metrics::round_to;
use coach_core::{PoseEstimator, PoseMetrics, Result, VideoInput};

use super::AnalyzeRequest;
use crate::http;
use crate::{Capability, PipelineError};

const PROVIDER: &str = "remote-scores";

#[derive(Debug, Clone)]
pub struct RemoteScoresConfig {
    pub url: String,
    pub sample_fps: f64,
    pub min_detection_rate: f64,
    pub timeout: Duration,
}

impl Default for RemoteScoresConfig {
    fn default() -> Self {
        Self {
            url: endpoints::POSE_SIDECAR.to_string(),
            sample_fps: 5.0,
            min_detection_rate: 0.8,
            timeout: Duration::from_secs(300),
        }
    }
}

/// Scores as ratios in 0-1
#[derive(Debug, Deserialize)]
struct RemoteScores {
    posture: f64,
    movement_smoothness: f64,
    eye_contact: f64,
    body_openness: f64,
    #[serde(default)]
    gesture_count: u32,
    #[serde(default)]
    frames_analyzed: u32,
    #[serde(default)]
    frames_detected: u32,
}

impl RemoteScores {
    fn into_metrics(self, min_detection_rate: f64) -> PoseMetrics {
        if self.frames_detected == 0 {
            return PoseMetrics::unavailable();
        }

        let tracking_quality = if self.frames_analyzed == 0 {
            0.0
        } else {
            (self.frames_detected as f64 / self.frames_analyzed as f64).min(1.0)
        };

        PoseMetrics {
            posture_score: round_to(normalize_unit_score(self.posture), 1),
            gesture_count: self.gesture_count,
            movement_smoothness: round_to(normalize_unit_score(self.movement_smoothness), 1),
            eye_contact_score: round_to(normalize_unit_score(self.eye_contact), 1),
            body_openness_score: round_to(normalize_unit_score(self.body_openness), 1),
            frames_analyzed: self.frames_analyzed,
            tracking_quality: round_to(tracking_quality, 2),
            low_confidence: tracking_quality < min_detection_rate,
        }
    }
}

pub struct RemoteScoresPose {
    config: RemoteScoresConfig,
    client: Client,
}

impl RemoteScoresPose {
    pub fn new(config: RemoteScoresConfig) -> std::result::Result<Self, PipelineError> {
        let client = http::client(config.timeout)?;
        Ok(Self { config, client })
    }

    async fn scores(&self, video: &VideoInput) -> std::result::Result<RemoteScores, PipelineError> {
        let video_path = video.path.to_str().ok_or_else(|| {
            PipelineError::InvalidInput(format!("non UTF-8 video path: {}", video.path.display()))
        })?;
        let body = AnalyzeRequest {
            video_path,
            sample_fps: self.config.sample_fps,
            duration_seconds: video.duration_seconds,
        };

        let url = format!("{}/analyze", http::trim_url(&self.config.url));
        let response = http::send(PROVIDER, self.client.post(url).json(&body)).await?;
        http::json(PROVIDER, response).await
    }
}

#[async_trait]
impl PoseEstimator for RemoteScoresPose {
    async fn analyze(&self, video: &VideoInput) -> Result<PoseMetrics> {
        let scores = self
            .scores(video)
            .await
            .map_err(|e| e.into_core(Capability::Pose))?;
        Ok(scores.into_metrics(self.config.min_detection_rate))
    }

    fn provider_name(&self) -> &str {
        PROVIDER
    }
}
