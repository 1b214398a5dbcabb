//! Pose estimation adapters
//!
//! Both talk to a vision sidecar sharing the session directory with the
//! server; the video travels by path, not by upload.

mod mediapipe;
mod remote;

pub use mediapipe::{MediaPipeConfig, MediaPipePose};
pub use remote::{RemoteScoresConfig, RemoteScoresPose};

use serde::Serialize;

/// Body sent to the sidecar
#[derive(Debug, Serialize)]
pub(crate) struct AnalyzeRequest<'a> {
    pub video_path: &'a str,
    pub sample_fps: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
}
