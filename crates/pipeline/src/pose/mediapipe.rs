//! MediaPipe landmark sidecar
//!
//! The sidecar samples frames and returns raw landmarks
//! (`POST {url}/landmarks`). Scoring happens here through
//! [`coach_analysis::analyze_pose`] so every pose provider shares one set
//! of formulas.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use coach_analysis::{analyze_pose, PoseAnalysisConfig};
use coach_config::constants::endpoints;
use coach_core::{PoseEstimator, PoseFrame, PoseMetrics, Result, VideoInput};

use super::AnalyzeRequest;
use crate::http;
use crate::{Capability, PipelineError};

const PROVIDER: &str = "mediapipe";

#[derive(Debug, Clone)]
pub struct MediaPipeConfig {
    pub url: String,
    pub sample_fps: f64,
    pub analysis: PoseAnalysisConfig,
    pub timeout: Duration,
}

impl Default for MediaPipeConfig {
    fn default() -> Self {
        Self {
            url: endpoints::POSE_SIDECAR.to_string(),
            sample_fps: 5.0,
            analysis: PoseAnalysisConfig::default(),
            timeout: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LandmarksResponse {
    #[serde(default)]
    frames: Vec<PoseFrame>,
}

pub struct MediaPipePose {
    config: MediaPipeConfig,
    client: Client,
}

impl MediaPipePose {
    pub fn new(config: MediaPipeConfig) -> std::result::Result<Self, PipelineError> {
        if config.sample_fps <= 0.0 {
            return Err(PipelineError::Configuration(
                "pose sample_fps must be positive".to_string(),
            ));
        }
        let client = http::client(config.timeout)?;
        Ok(Self { config, client })
    }

    async fn frames(&self, video: &VideoInput) -> std::result::Result<Vec<PoseFrame>, PipelineError> {
        let video_path = video.path.to_str().ok_or_else(|| {
            PipelineError::InvalidInput(format!("non UTF-8 video path: {}", video.path.display()))
        })?;
        let body = AnalyzeRequest {
            video_path,
            sample_fps: self.config.sample_fps,
            duration_seconds: video.duration_seconds,
        };

        let url = format!("{}/landmarks", http::trim_url(&self.config.url));
        let response = http::send(PROVIDER, self.client.post(url).json(&body)).await?;
        let body: LandmarksResponse = http::json(PROVIDER, response).await?;
        Ok(body.frames)
    }
}

#[async_trait]
impl PoseEstimator for MediaPipePose {
    async fn analyze(&self, video: &VideoInput) -> Result<PoseMetrics> {
        let frames = self
            .frames(video)
            .await
            .map_err(|e| e.into_core(Capability::Pose))?;

        let metrics = analyze_pose(&frames, &self.config.analysis);
        tracing::debug!(
            frames = frames.len(),
            tracking_quality = metrics.tracking_quality,
            low_confidence = metrics.low_confidence,
            "Pose landmarks scored"
        );
        Ok(metrics)
    }

    fn provider_name(&self) -> &str {
        PROVIDER
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landmarks_response_parses() {
        let raw = r#"{"frames":[
            {"timestamp":0.0,"landmarks":{"nose":{"x":0.5,"y":0.2,"visibility":0.99},
                                          "left_shoulder":{"x":0.6,"y":0.4}}},
            {"timestamp":0.2}]}"#;
        let response: LandmarksResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.frames.len(), 2);
        assert!(response.frames[0].detected());
        assert!(!response.frames[1].detected());
    }

    #[test]
    fn test_rejects_non_positive_fps() {
        let result = MediaPipePose::new(MediaPipeConfig {
            sample_fps: 0.0,
            ..Default::default()
        });
        assert!(matches!(result, Err(PipelineError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_unreachable_sidecar_is_pose_error() {
        let pose = MediaPipePose::new(MediaPipeConfig {
            url: "http://127.0.0.1:9".to_string(),
            timeout: Duration::from_secs(2),
            ..Default::default()
        })
        .unwrap();
        let err = pose.analyze(&VideoInput::new("/tmp/none.mp4")).await.unwrap_err();
        assert!(matches!(err, coach_core::Error::PoseAnalysis(_)));
    }
}
