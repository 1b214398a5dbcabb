//! Media demuxing trait

use std::path::Path;

use async_trait::async_trait;

use crate::Result;

/// Extracts the audio track of an uploaded video
#[async_trait]
pub trait MediaExtractor: Send + Sync + 'static {
    /// Write the audio track of `video` to `output` as 16 kHz mono PCM WAV
    async fn extract_audio(&self, video: &Path, output: &Path) -> Result<()>;

    /// Duration of the video in seconds, when it can be determined
    async fn read_duration(&self, video: &Path) -> Result<Option<f64>>;
}
