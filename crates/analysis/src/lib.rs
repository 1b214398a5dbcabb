//! Metrics aggregation
//!
//! Pure functions that turn a transcript, an optional audio signal summary
//! and an optional landmark sequence into [`SpeechMetrics`] and
//! [`PoseMetrics`]. Every input is explicit; identical inputs give identical
//! outputs.
//!
//! [`SpeechMetrics`]: coach_core::SpeechMetrics
//! [`PoseMetrics`]: coach_core::PoseMetrics

pub mod filler;
pub mod pose;
pub mod speech;
mod stats;

pub use filler::{count_fillers, tokenize, FillerCount, FILLER_WORDS};
pub use pose::{analyze_pose, normalize_unit_score, PoseAnalysisConfig};
pub use speech::{analyze_speech, clarity_score, SpeechAnalysisConfig};
