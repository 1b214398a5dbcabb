//! Body language metrics from sampled landmark frames

use serde::{Deserialize, Serialize};

use coach_core::metrics::{clamp_score, round_to};
use coach_core::{Landmark, LandmarkPoint, PoseFrame, PoseMetrics};

use crate::stats::{mean, variance};

/// Landmarks whose visibility decides whether a frame counts as detected
const CORE_LANDMARKS: [Landmark; 5] = [
    Landmark::Nose,
    Landmark::LeftShoulder,
    Landmark::RightShoulder,
    Landmark::LeftHip,
    Landmark::RightHip,
];

/// Hand displacement between samples counted as a gesture movement
const GESTURE_MOVE_THRESHOLD: f64 = 0.1;

/// Movements per reported gesture
const MOVES_PER_GESTURE: u32 = 10;

/// Minimum ear visibility for the face to count as turned to the camera
const EAR_VISIBILITY_THRESHOLD: f64 = 0.5;

/// Horizontal band in which a centered nose counts as eye contact
const EYE_CONTACT_BAND: (f64, f64) = (0.3, 0.7);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoseAnalysisConfig {
    /// Mean visibility of core landmarks needed for a detected frame
    pub confidence_threshold: f64,
    /// Detection rate under which results are flagged low-confidence
    pub min_detection_rate: f64,
}

impl Default for PoseAnalysisConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.5,
            min_detection_rate: 0.8,
        }
    }
}

/// Convert a 0-1 ratio to the 0-10 score scale
pub fn normalize_unit_score(value: f64) -> f64 {
    clamp_score(value * 10.0)
}

/// Aggregate pose metrics over sampled frames
///
/// Returns [`PoseMetrics::unavailable`] when no frame is detected.
pub fn analyze_pose(frames: &[PoseFrame], config: &PoseAnalysisConfig) -> PoseMetrics {
    let detected: Vec<&PoseFrame> = frames
        .iter()
        .filter(|f| is_detected(f, config.confidence_threshold))
        .collect();

    if detected.is_empty() {
        tracing::warn!(sampled = frames.len(), "No pose detected in any frame");
        return PoseMetrics::unavailable();
    }

    let tracking_quality = detected.len() as f64 / frames.len() as f64;

    let hands: Vec<(f64, f64)> = detected.iter().filter_map(|f| hand_position(f)).collect();
    let movements: Vec<f64> = hands
        .windows(2)
        .map(|pair| distance(pair[0], pair[1]))
        .collect();

    let metrics = PoseMetrics {
        posture_score: round_to(posture_score(&detected), 2),
        gesture_count: gesture_count(hands.len(), &movements),
        movement_smoothness: round_to(movement_smoothness(hands.len(), &movements), 2),
        eye_contact_score: round_to(eye_contact_score(&detected), 2),
        body_openness_score: round_to(openness_score(&detected), 2),
        frames_analyzed: detected.len() as u32,
        tracking_quality: round_to(tracking_quality, 2),
        low_confidence: tracking_quality < config.min_detection_rate,
    };

    if metrics.low_confidence {
        tracing::warn!(
            tracking_quality,
            min = config.min_detection_rate,
            "Pose tracking below minimum detection rate"
        );
    }

    metrics
}

fn is_detected(frame: &PoseFrame, threshold: f64) -> bool {
    if !frame.detected() {
        return false;
    }
    let visibility: Vec<f64> = CORE_LANDMARKS
        .iter()
        .map(|l| frame.get(*l).map(|p| p.visibility).unwrap_or(0.0))
        .collect();
    mean(&visibility).is_some_and(|v| v >= threshold)
}

fn midpoint(a: Option<&LandmarkPoint>, b: Option<&LandmarkPoint>) -> Option<(f64, f64)> {
    match (a, b) {
        (Some(a), Some(b)) => Some(((a.x + b.x) / 2.0, (a.y + b.y) / 2.0)),
        (Some(p), None) | (None, Some(p)) => Some((p.x, p.y)),
        (None, None) => None,
    }
}

fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

/// Head over shoulders over hips
fn posture_score(frames: &[&PoseFrame]) -> f64 {
    let per_frame: Vec<f64> = frames
        .iter()
        .filter_map(|f| {
            let nose = f.get(Landmark::Nose)?;
            let shoulders = midpoint(
                f.get(Landmark::LeftShoulder),
                f.get(Landmark::RightShoulder),
            )?;
            let hips = midpoint(f.get(Landmark::LeftHip), f.get(Landmark::RightHip))?;
            let offset = (nose.x - shoulders.0).abs() + (shoulders.0 - hips.0).abs();
            Some(clamp_score(10.0 - offset * 20.0))
        })
        .collect();
    mean(&per_frame).unwrap_or(5.0)
}

fn hand_position(frame: &PoseFrame) -> Option<(f64, f64)> {
    midpoint(frame.get(Landmark::LeftWrist), frame.get(Landmark::RightWrist))
}

fn gesture_count(positions: usize, movements: &[f64]) -> u32 {
    if positions == 0 {
        return 0;
    }
    let moves = movements
        .iter()
        .filter(|m| **m > GESTURE_MOVE_THRESHOLD)
        .count() as u32;
    (moves / MOVES_PER_GESTURE).max(1)
}

fn movement_smoothness(positions: usize, movements: &[f64]) -> f64 {
    if positions < 3 {
        return 5.0;
    }
    let var = variance(movements).unwrap_or(0.0);
    clamp_score(10.0 / (1.0 + var * 100.0))
}

fn eye_contact_score(frames: &[&PoseFrame]) -> f64 {
    let facing = frames
        .iter()
        .filter(|f| {
            let ears_visible = [Landmark::LeftEar, Landmark::RightEar].iter().all(|l| {
                f.get(*l)
                    .is_some_and(|p| p.visibility > EAR_VISIBILITY_THRESHOLD)
            });
            let centered = f
                .get(Landmark::Nose)
                .is_some_and(|n| n.x > EYE_CONTACT_BAND.0 && n.x < EYE_CONTACT_BAND.1);
            ears_visible && centered
        })
        .count();
    normalize_unit_score(facing as f64 / frames.len() as f64)
}

/// Level shoulders read as open
fn openness_score(frames: &[&PoseFrame]) -> f64 {
    let tilts: Vec<f64> = frames
        .iter()
        .filter_map(|f| {
            let left = f.get(Landmark::LeftShoulder)?;
            let right = f.get(Landmark::RightShoulder)?;
            let angle = (right.y - left.y).atan2(right.x - left.x).to_degrees().abs();
            // deviation from horizontal regardless of which side faces the camera
            Some(if angle > 90.0 { 180.0 - angle } else { angle })
        })
        .collect();
    match mean(&tilts) {
        Some(avg) => 10.0 - (avg / 2.0).min(10.0),
        None => 5.0,
    }
}
