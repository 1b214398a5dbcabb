//! Core traits and types for the digital coach
//!
//! This crate provides the foundational types used across all other crates:
//! - Session model and its status state machine
//! - Conversation messages and history
//! - Speech/pose metrics and the evaluation report
//! - Provider traits (STT, LLM, TTS, pose, avatar animation, media extraction)
//! - Error taxonomy and the retry policy keyed by error kind

pub mod animation;
pub mod audio;
pub mod conversation;
pub mod error;
pub mod evaluation;
pub mod metrics;
pub mod pose;
pub mod retry;
pub mod session;
pub mod traits;
pub mod transcript;

pub use animation::{FaceAnimation, BLENDSHAPE_COUNT};
pub use audio::{AudioClip, AudioFormat, SignalSummary};
pub use conversation::{ConversationHistory, ConversationMessage, MessageRole};
pub use error::{Error, LlmErrorKind, Result};
pub use evaluation::{AIFeedback, EvaluationProgress, EvaluationResult, EvaluationStage};
pub use metrics::{MetricsSummary, PoseMetrics, SpeechMetrics};
pub use pose::{Landmark, LandmarkPoint, PoseFrame};
pub use retry::RetryPolicy;
pub use session::{Session, SessionFilter, SessionStatus, SessionType};
pub use transcript::{Transcript, WordTiming};

pub use traits::{
    AvatarAnimator, LanguageModel, MediaExtractor, PoseEstimator, SpeechToText, TextToSpeech,
    VideoInput, VoiceStyle,
};
