//! Evaluation report and progress

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::metrics::{PoseMetrics, SpeechMetrics};

/// Structured feedback returned by the language model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AIFeedback {
    pub overall_score: f64,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub areas_for_improvement: Vec<String>,
    #[serde(default)]
    pub specific_recommendations: Vec<String>,
    #[serde(default)]
    pub detailed_feedback: String,
}

impl AIFeedback {
    /// Feedback used when the model's reply cannot be parsed
    pub fn fallback(raw: impl Into<String>) -> Self {
        Self {
            overall_score: 7.0,
            strengths: vec!["Good content".to_string()],
            areas_for_improvement: vec!["Practice more".to_string()],
            specific_recommendations: vec!["Keep practicing".to_string()],
            detailed_feedback: raw.into(),
        }
    }
}

/// Terminal artifact of an evaluation session, stored as `results.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub session_id: String,
    pub video_url: String,
    pub transcript: String,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    pub speech_metrics: SpeechMetrics,
    pub pose_metrics: PoseMetrics,
    pub feedback: AIFeedback,
    pub score: f64,
    pub recommendations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback_audio_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationStage {
    Uploaded,
    Extracting,
    Transcribing,
    AnalyzingSpeech,
    AnalyzingPose,
    GeneratingFeedback,
    SynthesizingFeedback,
    Saving,
    Completed,
    Failed,
}

impl EvaluationStage {
    /// Progress recorded when the stage starts
    pub fn progress(&self) -> u8 {
        match self {
            Self::Uploaded | Self::Extracting | Self::Failed => 0,
            Self::Transcribing => 10,
            Self::AnalyzingSpeech => 30,
            Self::AnalyzingPose => 50,
            Self::GeneratingFeedback => 70,
            Self::SynthesizingFeedback => 85,
            Self::Saving => 95,
            Self::Completed => 100,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uploaded => "uploaded",
            Self::Extracting => "extracting",
            Self::Transcribing => "transcribing",
            Self::AnalyzingSpeech => "analyzing_speech",
            Self::AnalyzingPose => "analyzing_pose",
            Self::GeneratingFeedback => "generating_feedback",
            Self::SynthesizingFeedback => "synthesizing_feedback",
            Self::Saving => "saving",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for EvaluationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress snapshot kept in session metadata under [`EvaluationProgress::METADATA_KEY`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationProgress {
    pub stage: EvaluationStage,
    pub progress: u8,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EvaluationProgress {
    pub const METADATA_KEY: &'static str = "evaluation";

    pub fn waiting() -> Self {
        Self {
            stage: EvaluationStage::Uploaded,
            progress: 0,
            message: "Waiting to start".to_string(),
            error: None,
        }
    }

    pub fn at(stage: EvaluationStage) -> Self {
        let progress = stage.progress();
        Self {
            stage,
            progress,
            message: format!("Processing... {}%", progress),
            error: None,
        }
    }

    pub fn completed() -> Self {
        Self {
            stage: EvaluationStage::Completed,
            progress: 100,
            message: "Analysis complete".to_string(),
            error: None,
        }
    }

    /// Failure keeps the progress reached so far
    pub fn failed(reached: u8, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            stage: EvaluationStage::Failed,
            progress: reached,
            message: format!("Analysis failed: {}", reason),
            error: Some(reason),
        }
    }
}
