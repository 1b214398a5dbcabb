//! Speech and pose metrics
//!
//! All scores use one internal scale: 0-10. `tracking_quality` is the only
//! ratio (0-1). Adapters that report on another scale convert before these
//! values are built.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Upper bound of every score
pub const SCORE_MAX: f64 = 10.0;

/// Clamp a value to the canonical score range
pub fn clamp_score(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, SCORE_MAX)
}

/// Round to `places` decimal places
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Speech delivery metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechMetrics {
    pub words_per_minute: f64,
    pub total_words: usize,
    pub speaking_time_seconds: f64,
    pub pause_count: usize,
    pub average_pause_duration: f64,
    pub filler_words_count: usize,
    /// Occurrences per filler word
    pub filler_words: BTreeMap<String, usize>,
    /// Percentage of words that are fillers
    pub filler_rate: f64,
    pub clarity_score: f64,
    pub volume_variation: f64,
    pub pitch_variation: f64,
}

/// Body language metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseMetrics {
    pub posture_score: f64,
    pub gesture_count: u32,
    pub movement_smoothness: f64,
    pub eye_contact_score: f64,
    pub body_openness_score: f64,
    pub frames_analyzed: u32,
    /// Detected frames / sampled frames
    pub tracking_quality: f64,
    /// Detection rate fell under the configured minimum
    #[serde(default)]
    pub low_confidence: bool,
}

impl PoseMetrics {
    /// Neutral metrics used when no frame could be analyzed
    pub fn unavailable() -> Self {
        Self {
            posture_score: 5.0,
            gesture_count: 0,
            movement_smoothness: 5.0,
            eye_contact_score: 5.0,
            body_openness_score: 5.0,
            frames_analyzed: 0,
            tracking_quality: 0.0,
            low_confidence: true,
        }
    }
}

/// Metrics handed to the language model for evaluation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub speech: SpeechMetrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pose: Option<PoseMetrics>,
}
