//! Audio extraction through ffmpeg
//!
//! `ffmpeg -i <video> -vn -acodec pcm_s16le -ar 16000 -ac 1 -y <out>` and an
//! `ffprobe` duration probe, both run as child processes under a deadline.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use coach_core::{MediaExtractor, Result};

use crate::PipelineError;

/// Sample rate of extracted audio
pub const EXTRACT_SAMPLE_RATE: u32 = 16_000;

/// Stderr kept in error messages
const STDERR_TAIL: usize = 400;

/// Default per-process deadline
pub const DEFAULT_EXTRACT_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
pub struct FfmpegExtractor {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    timeout: Duration,
}

impl Default for FfmpegExtractor {
    fn default() -> Self {
        Self::new("ffmpeg", "ffprobe")
    }
}

impl FfmpegExtractor {
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
            timeout: DEFAULT_EXTRACT_TIMEOUT,
        }
    }

    /// Child processes still running after `timeout` are killed
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn extract_args(video: &Path, output: &Path) -> Vec<std::ffi::OsString> {
        let rate = EXTRACT_SAMPLE_RATE.to_string();
        let mut args: Vec<std::ffi::OsString> = vec!["-i".into(), video.into()];
        args.extend(
            ["-vn", "-acodec", "pcm_s16le", "-ar", rate.as_str(), "-ac", "1", "-y"]
                .into_iter()
                .map(Into::into),
        );
        args.push(output.into());
        args
    }

    async fn run_extract(&self, video: &Path, output: &Path) -> std::result::Result<(), PipelineError> {
        if !tokio::fs::try_exists(video).await? {
            return Err(PipelineError::InvalidInput(format!(
                "video not found: {}",
                video.display()
            )));
        }

        let child = Command::new(&self.ffmpeg)
            .args(Self::extract_args(video, output))
            .kill_on_drop(true)
            .output();

        // dropping the output future on expiry kills the child
        let result = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| {
                tracing::warn!(
                    video = %video.display(),
                    timeout_secs = self.timeout.as_secs_f64(),
                    "ffmpeg did not finish in time"
                );
                PipelineError::Timeout("ffmpeg")
            })?
            .map_err(|e| {
                PipelineError::Media(format!("failed to run {}: {}", self.ffmpeg.display(), e))
            })?;

        if !result.status.success() {
            return Err(PipelineError::Media(format!(
                "ffmpeg exited with {}: {}",
                result.status,
                stderr_tail(&result.stderr)
            )));
        }
        Ok(())
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    let start = text
        .char_indices()
        .rev()
        .nth(STDERR_TAIL)
        .map(|(i, _)| i)
        .unwrap_or(0);
    text[start..].to_string()
}

/// Parse ffprobe's `format=duration` output
pub(crate) fn parse_duration(stdout: &str) -> Option<f64> {
    stdout
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .and_then(|l| l.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
}

#[async_trait]
impl MediaExtractor for FfmpegExtractor {
    async fn extract_audio(&self, video: &Path, output: &Path) -> Result<()> {
        let started = std::time::Instant::now();
        self.run_extract(video, output).await?;
        tracing::info!(
            video = %video.display(),
            output = %output.display(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Extracted audio track"
        );
        Ok(())
    }

    /// Unknown duration is not an error; the caller falls back to the
    /// extracted audio
    async fn read_duration(&self, video: &Path) -> Result<Option<f64>> {
        let child = Command::new(&self.ffprobe)
            .args(["-v", "error", "-show_entries", "format=duration", "-of"])
            .arg("default=noprint_wrappers=1:nokey=1")
            .arg(video)
            .kill_on_drop(true)
            .output();

        let result = match tokio::time::timeout(self.timeout, child).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    video = %video.display(),
                    error = %PipelineError::Timeout("ffprobe"),
                    "Duration lookup abandoned"
                );
                return Ok(None);
            },
        };

        match result {
            Ok(out) if out.status.success() => {
                Ok(parse_duration(&String::from_utf8_lossy(&out.stdout)))
            },
            Ok(out) => {
                tracing::warn!(
                    video = %video.display(),
                    stderr = %stderr_tail(&out.stderr),
                    "ffprobe could not read duration"
                );
                Ok(None)
            },
            Err(e) => {
                tracing::warn!(error = %e, "ffprobe unavailable");
                Ok(None)
            },
        }
    }
}
