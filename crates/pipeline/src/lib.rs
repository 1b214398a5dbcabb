//! Provider adapters and media processing
//!
//! This crate provides the concrete capabilities behind the core traits:
//! - Speech-to-Text: Whisper sidecar, Deepgram, Google Cloud Speech
//! - Text-to-Speech: ElevenLabs, Edge/local sidecars, Google Translate TTS
//! - Pose estimation: MediaPipe landmark sidecar scored locally, or a
//!   sidecar that returns finished scores
//! - Avatar animation: hosted Audio2Face or a local envelope animator
//! - Energy VAD segmenting streamed PCM into utterances
//! - Audio extraction and duration probing through ffmpeg
//! - WAV signal summaries (frame energy, pitch proxy) for the aggregator
//! - Factories resolving provider settings into trait objects

mod http;

pub mod avatar;
pub mod factory;
pub mod media;
pub mod pose;
pub mod signal;
pub mod stt;
pub mod tts;
pub mod vad;

pub use avatar::{HuggingFaceAvatar, NvidiaAvatar, ProceduralAvatar};
pub use factory::{
    AvatarFactory, AvatarProvider, PoseFactory, PoseProvider, SttFactory, SttProvider,
    TtsFactory, TtsProvider,
};
pub use media::FfmpegExtractor;
pub use pose::{MediaPipePose, RemoteScoresPose};
pub use signal::{summarize_samples, summarize_wav, summarize_wav_file, FRAME_HOP};
pub use stt::{DeepgramStt, GoogleCloudStt, WhisperSidecarStt};
pub use tts::{ElevenLabsTts, GttsTts, SidecarTts};
pub use vad::{pcm_to_wav, VadConfig, VadEvent, VadSegmenter, VadState};

use reqwest::StatusCode;
use thiserror::Error;

/// Capability a provider call served, used to pick the core error variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Stt,
    Tts,
    Pose,
    Avatar,
}

/// Pipeline errors
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("{provider} returned HTTP {status}: {body}")]
    Status {
        provider: &'static str,
        status: StatusCode,
        body: String,
    },

    #[error("{0} request timed out")]
    Timeout(&'static str),

    #[error("{provider} unreachable: {message}")]
    Network {
        provider: &'static str,
        message: String,
    },

    #[error("Invalid response from {provider}: {message}")]
    InvalidResponse {
        provider: &'static str,
        message: String,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Audio error: {0}")]
    Audio(String),

    #[error("Media tool failed: {0}")]
    Media(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Provider was briefly unavailable and the call may succeed if repeated
    pub fn is_transient(&self) -> bool {
        match self {
            PipelineError::Status { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            },
            PipelineError::Timeout(_) | PipelineError::Network { .. } => true,
            _ => false,
        }
    }

    /// Convert into the core error for the capability that failed
    pub fn into_core(self, capability: Capability) -> coach_core::Error {
        use coach_core::Error;

        match (capability, self) {
            (_, PipelineError::Configuration(msg)) => Error::Configuration(msg),
            (Capability::Stt, err) if err.is_transient() => {
                Error::transient_transcription(err.to_string())
            },
            (Capability::Stt, err) => Error::transcription(err.to_string()),
            (Capability::Tts, err) => Error::Synthesis(err.to_string()),
            (Capability::Pose, err) => Error::PoseAnalysis(err.to_string()),
            (Capability::Avatar, err) => Error::Animation(err.to_string()),
        }
    }
}

impl From<PipelineError> for coach_core::Error {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Configuration(msg) => coach_core::Error::Configuration(msg),
            other => coach_core::Error::Media(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> PipelineError {
        PipelineError::Status {
            provider: "deepgram",
            status: StatusCode::from_u16(code).unwrap(),
            body: String::new(),
        }
    }

    #[test]
    fn test_stt_classification() {
        assert!(status(429).into_core(Capability::Stt).is_retryable());
        assert!(status(503).into_core(Capability::Stt).is_retryable());
        assert!(PipelineError::Timeout("whisper-local")
            .into_core(Capability::Stt)
            .is_retryable());
        assert!(!status(401).into_core(Capability::Stt).is_retryable());
        assert!(!status(400).into_core(Capability::Stt).is_retryable());
    }

    #[test]
    fn test_capability_variants() {
        assert!(matches!(
            status(500).into_core(Capability::Tts),
            coach_core::Error::Synthesis(_)
        ));
        assert!(matches!(
            status(500).into_core(Capability::Pose),
            coach_core::Error::PoseAnalysis(_)
        ));
        assert!(matches!(
            status(502).into_core(Capability::Avatar),
            coach_core::Error::Animation(_)
        ));
        assert!(matches!(
            PipelineError::Configuration("no key".into()).into_core(Capability::Tts),
            coach_core::Error::Configuration(_)
        ));
        assert!(matches!(
            coach_core::Error::from(PipelineError::Media("ffmpeg exited 1".into())),
            coach_core::Error::Media(_)
        ));
    }
}
