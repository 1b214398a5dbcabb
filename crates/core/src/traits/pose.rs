//! Pose estimation trait

use std::path::PathBuf;

use async_trait::async_trait;

use crate::metrics::PoseMetrics;
use crate::Result;

/// Video handed to a pose estimator
#[derive(Debug, Clone)]
pub struct VideoInput {
    pub path: PathBuf,
    pub duration_seconds: Option<f64>,
}

impl VideoInput {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            duration_seconds: None,
        }
    }
}

/// Pose estimation interface
///
/// Implementations sample frames, detect landmarks and return metrics on
/// the 0-10 scale. A low detection rate sets `low_confidence` instead of
/// failing; `Error::PoseAnalysis` is reserved for unreadable input or an
/// unreachable provider.
#[async_trait]
pub trait PoseEstimator: Send + Sync + 'static {
    async fn analyze(&self, video: &VideoInput) -> Result<PoseMetrics>;

    fn provider_name(&self) -> &str;
}
