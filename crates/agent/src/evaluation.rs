//! Evaluation orchestrator
//!
//! Upload stores the video on a fresh session. Analysis moves the session to
//! `processing` and hands the pipeline to the [`EvaluationScheduler`]:
//!
//! ```text
//! extract audio -> transcribe -> speech metrics -> pose metrics
//!     -> feedback -> feedback audio -> save results -> completed
//! ```
//!
//! Each stage records its progress on the session, which is the only
//! channel pollers read. Pose analysis and feedback audio degrade; any
//! other failure marks the session `failed` with the reason, keeping what
//! was computed before it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use tokio::task::JoinHandle;

use coach_analysis::{analyze_speech, SpeechAnalysisConfig};
use coach_config::EvaluationConfig;
use coach_core::{
    AudioClip, Error, EvaluationProgress, EvaluationResult, EvaluationStage, MetricsSummary,
    PoseMetrics, Result, RetryPolicy, Session, SessionStatus, SessionType, SignalSummary,
    Transcript, VideoInput,
};
use coach_persistence::{FileKind, SessionStore};
use coach_pipeline::media::EXTRACT_SAMPLE_RATE;
use coach_pipeline::summarize_wav_file;

use crate::instrument::timed;
use crate::providers::Providers;
use crate::scheduler::EvaluationScheduler;

const EXTRACTED_AUDIO: &str = "extracted.wav";
const FEEDBACK_AUDIO: &str = "feedback";
const DEFAULT_VIDEO_EXT: &str = "mp4";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 500 * 1024 * 1024;

/// Uploaded video and its client-supplied description
#[derive(Debug, Clone, Default)]
pub struct VideoUpload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
    pub user_id: Option<String>,
}

/// Polling view of an evaluation
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationStatus {
    pub session_id: String,
    pub status: SessionStatus,
    #[serde(flatten)]
    pub progress: EvaluationProgress,
}

pub struct EvaluationOrchestrator {
    store: Arc<dyn SessionStore>,
    providers: Providers,
    speech: SpeechAnalysisConfig,
    synthesize_feedback: bool,
    max_upload_bytes: usize,
    retry: RetryPolicy,
    scheduler: EvaluationScheduler,
}

impl EvaluationOrchestrator {
    pub fn new(
        store: Arc<dyn SessionStore>,
        providers: Providers,
        config: &EvaluationConfig,
    ) -> Self {
        Self {
            store,
            providers,
            speech: SpeechAnalysisConfig {
                pause_threshold_secs: config.pause_threshold_secs,
                silence_rms_threshold: config.silence_rms_threshold,
            },
            synthesize_feedback: config.synthesize_feedback,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            retry: RetryPolicy::default(),
            scheduler: EvaluationScheduler::new(),
        }
    }

    /// Retry policy for transcription
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_upload_bytes(mut self, max: usize) -> Self {
        self.max_upload_bytes = max;
        self
    }

    pub fn scheduler(&self) -> &EvaluationScheduler {
        &self.scheduler
    }

    /// Validate and store a video on a new evaluation session
    pub async fn upload(&self, upload: VideoUpload) -> Result<Session> {
        validate_upload(&upload, self.max_upload_bytes)?;

        let VideoUpload {
            file_name,
            data,
            user_id,
            ..
        } = upload;
        let ext = video_extension(file_name.as_deref());
        let file_name = file_name.unwrap_or_else(|| format!("video.{}", ext));

        let session = self
            .store
            .create(SessionType::Evaluation, user_id, BTreeMap::new())
            .await?;

        let stored = match self
            .store
            .attach_file(&session.id, FileKind::Video, &format!("input.{}", ext), &data)
            .await
        {
            Ok(stored) => stored,
            Err(e) => {
                if let Err(cleanup) = self.store.delete(&session.id).await {
                    tracing::warn!(session_id = %session.id, error = %cleanup, "Could not remove failed upload");
                }
                return Err(e);
            },
        };

        let size = data.len();
        let session = self
            .store
            .update(
                &session.id,
                Box::new(move |s| {
                    s.set_meta("video_path", stored.path.display().to_string())?;
                    s.set_meta("video_url", &stored.url)?;
                    s.set_meta("video_filename", &file_name)?;
                    s.set_meta("file_size", size)?;
                    s.set_meta(EvaluationProgress::METADATA_KEY, EvaluationProgress::waiting())
                }),
            )
            .await?;

        metrics::counter!("coach_sessions_created_total", "type" => "evaluation").increment(1);
        tracing::info!(session_id = %session.id, bytes = size, "Video uploaded");
        Ok(session)
    }

    /// Move the session to `processing` and schedule the pipeline
    ///
    /// Returns as soon as the run is scheduled. A session left in
    /// `processing` by an interrupted run is restarted.
    pub async fn analyze(self: &Arc<Self>, id: &str) -> Result<JoinHandle<()>> {
        let session = self.evaluation(id).await?;
        if session.meta_str("video_path").is_none() {
            return Err(Error::Validation(format!(
                "evaluation {} has no uploaded video",
                id
            )));
        }

        let slot = self.scheduler.claim(id)?;
        self.store
            .update(
                id,
                Box::new(|s| {
                    if s.status == SessionStatus::Processing {
                        tracing::warn!(session_id = %s.id, "Restarting interrupted evaluation");
                    } else {
                        s.transition(SessionStatus::Processing)?;
                    }
                    s.set_meta(
                        EvaluationProgress::METADATA_KEY,
                        EvaluationProgress::at(EvaluationStage::Extracting),
                    )
                }),
            )
            .await?;

        let this = Arc::clone(self);
        let run_id = id.to_string();
        tracing::info!(session_id = %id, "Evaluation scheduled");
        Ok(self.scheduler.spawn(slot, async move {
            this.run(&run_id).await;
        }))
    }

    pub async fn status(&self, id: &str) -> Result<EvaluationStatus> {
        let session = self.evaluation(id).await?;
        let progress = session
            .meta(EvaluationProgress::METADATA_KEY)
            .unwrap_or_else(EvaluationProgress::waiting);
        Ok(EvaluationStatus {
            session_id: session.id,
            status: session.status,
            progress,
        })
    }

    /// Stored report; `NotReady` until the session completes
    pub async fn report(&self, id: &str) -> Result<EvaluationResult> {
        let session = self.evaluation(id).await?;
        match session.status {
            SessionStatus::Completed => self
                .store
                .get_results(id)
                .await?
                .ok_or_else(|| Error::NotFound(format!("results for evaluation {}", id))),
            SessionStatus::Failed => {
                let reason = session
                    .meta::<EvaluationProgress>(EvaluationProgress::METADATA_KEY)
                    .and_then(|p| p.error)
                    .unwrap_or_else(|| "unknown error".to_string());
                Err(Error::NotReady(format!(
                    "evaluation {} failed: {}",
                    id, reason
                )))
            },
            status => Err(Error::NotReady(format!("evaluation {} is {}", id, status))),
        }
    }

    async fn evaluation(&self, id: &str) -> Result<Session> {
        let session = self.store.get(id).await?;
        if session.session_type != SessionType::Evaluation {
            return Err(Error::NotFound(format!("evaluation {}", id)));
        }
        Ok(session)
    }

    /// Run the pipeline and record how it ended
    async fn run(&self, id: &str) {
        let started = Instant::now();
        let mut reached = 0;

        match self.pipeline(id, &mut reached).await {
            Ok(result) => {
                metrics::counter!("coach_evaluations_total", "outcome" => "completed").increment(1);
                metrics::histogram!("coach_evaluation_duration_seconds")
                    .record(started.elapsed().as_secs_f64());
                tracing::info!(
                    session_id = %id,
                    score = result.score,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Evaluation completed"
                );
            },
            Err(e) => {
                metrics::counter!("coach_evaluations_total", "outcome" => "failed").increment(1);
                tracing::error!(session_id = %id, progress = reached, error = %e, "Evaluation failed");

                let reason = e.to_string();
                let marked = self
                    .store
                    .update(
                        id,
                        Box::new(move |s| {
                            s.set_meta(
                                EvaluationProgress::METADATA_KEY,
                                EvaluationProgress::failed(reached, reason),
                            )?;
                            s.transition(SessionStatus::Failed)
                        }),
                    )
                    .await;
                if let Err(e) = marked {
                    tracing::error!(session_id = %id, error = %e, "Could not record evaluation failure");
                }
            },
        }
    }

    async fn pipeline(&self, id: &str, reached: &mut u8) -> Result<EvaluationResult> {
        let session = self.store.get(id).await?;
        let video_path = session
            .meta_str("video_path")
            .map(PathBuf::from)
            .ok_or_else(|| Error::Validation(format!("evaluation {} has no uploaded video", id)))?;
        let video_url = session.meta_str("video_url").unwrap_or_default().to_string();

        self.enter(id, EvaluationStage::Extracting, reached).await?;
        let audio = self.store.file_location(id, FileKind::Audio, EXTRACTED_AUDIO)?;
        if let Some(dir) = audio.path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        timed(
            "media",
            self.providers.media.extract_audio(&video_path, &audio.path),
        )
        .await?;
        let reported = match self.providers.media.read_duration(&video_path).await {
            Ok(duration) => duration,
            Err(e) => {
                tracing::warn!(session_id = %id, error = %e, "Duration lookup failed");
                None
            },
        };

        self.enter(id, EvaluationStage::Transcribing, reached).await?;
        let clip = AudioClip::wav(tokio::fs::read(&audio.path).await?)
            .with_sample_rate(EXTRACT_SAMPLE_RATE);
        let transcript = self.transcribe(&clip).await?;
        self.record(id, "transcript", &transcript.text).await?;

        self.enter(id, EvaluationStage::AnalyzingSpeech, reached).await?;
        let signal = self.signal_summary(id, &audio.path).await;
        let speech = analyze_speech(&transcript, signal.as_ref(), &self.speech);
        self.record(id, "speech_metrics", &speech).await?;
        let duration = reported.or_else(|| signal.as_ref().map(|s| s.duration_seconds));

        self.enter(id, EvaluationStage::AnalyzingPose, reached).await?;
        let pose = self.pose_metrics(id, &video_path, duration).await;
        self.record(id, "pose_metrics", &pose).await?;

        self.enter(id, EvaluationStage::GeneratingFeedback, reached).await?;
        let summary = MetricsSummary {
            speech: speech.clone(),
            pose: Some(pose.clone()),
        };
        let feedback = timed(
            "llm",
            self.providers.llm.evaluate(&transcript.text, &summary),
        )
        .await?;

        let feedback_audio_url = if self.synthesize_feedback {
            self.enter(id, EvaluationStage::SynthesizingFeedback, reached)
                .await?;
            self.feedback_audio(id, &feedback.detailed_feedback).await
        } else {
            None
        };

        self.enter(id, EvaluationStage::Saving, reached).await?;
        let result = EvaluationResult {
            session_id: id.to_string(),
            video_url,
            transcript: transcript.text,
            duration_seconds: duration,
            speech_metrics: speech,
            pose_metrics: pose,
            score: feedback.overall_score,
            recommendations: feedback.specific_recommendations.clone(),
            feedback,
            feedback_audio_url,
            created_at: Utc::now(),
        };
        self.store.save_results(id, &result).await?;

        let score = result.score;
        self.store
            .update(
                id,
                Box::new(move |s| {
                    s.set_meta(EvaluationProgress::METADATA_KEY, EvaluationProgress::completed())?;
                    s.set_meta("score", score)?;
                    s.transition(SessionStatus::Completed)
                }),
            )
            .await?;
        Ok(result)
    }

    async fn enter(&self, id: &str, stage: EvaluationStage, reached: &mut u8) -> Result<()> {
        *reached = stage.progress();
        self.store
            .update(
                id,
                Box::new(move |s| {
                    s.set_meta(EvaluationProgress::METADATA_KEY, EvaluationProgress::at(stage))
                }),
            )
            .await?;
        tracing::debug!(session_id = %id, stage = %stage, "Evaluation stage");
        Ok(())
    }

    /// Store an intermediate value on the session
    async fn record<T: Serialize + ?Sized>(&self, id: &str, key: &'static str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.store
            .update(id, Box::new(move |s| s.set_meta(key, value)))
            .await?;
        Ok(())
    }

    async fn transcribe(&self, clip: &AudioClip) -> Result<Transcript> {
        let stt = &self.providers.stt;
        timed(
            "stt",
            self.retry.run("stt.transcribe", move || stt.transcribe(clip)),
        )
        .await
    }

    /// Signal features are optional; speech metrics fall back to word timings
    async fn signal_summary(&self, id: &str, path: &Path) -> Option<SignalSummary> {
        let path = path.to_path_buf();
        match tokio::task::spawn_blocking(move || summarize_wav_file(&path)).await {
            Ok(Ok(summary)) => Some(summary),
            Ok(Err(e)) => {
                tracing::warn!(session_id = %id, error = %e, "Could not read extracted audio");
                None
            },
            Err(e) => {
                tracing::warn!(session_id = %id, error = %e, "Signal analysis task failed");
                None
            },
        }
    }

    async fn pose_metrics(&self, id: &str, video: &Path, duration: Option<f64>) -> PoseMetrics {
        let input = VideoInput {
            path: video.to_path_buf(),
            duration_seconds: duration,
        };
        match timed("pose", self.providers.pose.analyze(&input)).await {
            Ok(pose) => {
                if pose.low_confidence {
                    tracing::warn!(
                        session_id = %id,
                        tracking_quality = pose.tracking_quality,
                        "Pose tracking below confidence threshold"
                    );
                }
                pose
            },
            Err(e) => {
                tracing::warn!(session_id = %id, error = %e, "Pose analysis unavailable");
                PoseMetrics::unavailable()
            },
        }
    }

    async fn feedback_audio(&self, id: &str, text: &str) -> Option<String> {
        if text.trim().is_empty() {
            return None;
        }
        let clip = match timed("tts", self.providers.tts.synthesize(text, None)).await {
            Ok(clip) => clip,
            Err(e) => {
                tracing::warn!(session_id = %id, error = %e, "Feedback synthesis failed");
                return None;
            },
        };

        let name = format!("{}.{}", FEEDBACK_AUDIO, clip.format.extension());
        match self
            .store
            .attach_file(id, FileKind::Audio, &name, &clip.data)
            .await
        {
            Ok(stored) => Some(stored.url),
            Err(e) => {
                tracing::warn!(session_id = %id, error = %e, "Could not store feedback audio");
                None
            },
        }
    }
}

fn validate_upload(upload: &VideoUpload, max_bytes: usize) -> Result<()> {
    let content_type = upload.content_type.as_deref().unwrap_or_default();
    if !content_type.starts_with("video/") {
        return Err(Error::Validation(format!(
            "file must be a video, got content type '{}'",
            content_type
        )));
    }
    if upload.data.is_empty() {
        return Err(Error::Validation("video file is empty".to_string()));
    }
    if upload.data.len() > max_bytes {
        return Err(Error::Validation(format!(
            "video is {} bytes, limit is {}",
            upload.data.len(),
            max_bytes
        )));
    }
    Ok(())
}

/// Extension from the client file name, or `mp4`
fn video_extension(file_name: Option<&str>) -> String {
    file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .filter(|ext| !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| DEFAULT_VIDEO_EXT.to_string())
}
