//! Error taxonomy shared by every crate
//!
//! Crate-local errors (`LlmError`, `PipelineError`, `PersistenceError`, ...)
//! convert into [`Error`], which is what orchestrators record on sessions and
//! what the API layer maps to HTTP responses.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::session::SessionStatus;

/// Result alias used throughout the workspace
pub type Result<T> = std::result::Result<T, Error>;

/// Classification of language-model failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmErrorKind {
    RateLimited,
    AuthInvalid,
    Timeout,
    Other,
}

impl LlmErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RateLimited => "rate_limited",
            Self::AuthInvalid => "auth_invalid",
            Self::Timeout => "timeout",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for LlmErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Workspace error
#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Transcription error: {message}")]
    Transcription { message: String, transient: bool },

    #[error("LLM error ({kind}): {message}")]
    Llm { kind: LlmErrorKind, message: String },

    #[error("Synthesis error: {0}")]
    Synthesis(String),

    #[error("Pose analysis error: {0}")]
    PoseAnalysis(String),

    #[error("Animation error: {0}")]
    Animation(String),

    #[error("Media error: {0}")]
    Media(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Not ready: {0}")]
    NotReady(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: SessionStatus,
        to: SessionStatus,
    },

    #[error("Already running: {0}")]
    AlreadyRunning(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl Error {
    pub fn transcription(message: impl Into<String>) -> Self {
        Self::Transcription {
            message: message.into(),
            transient: false,
        }
    }

    pub fn transient_transcription(message: impl Into<String>) -> Self {
        Self::Transcription {
            message: message.into(),
            transient: true,
        }
    }

    pub fn llm(kind: LlmErrorKind, message: impl Into<String>) -> Self {
        Self::Llm {
            kind,
            message: message.into(),
        }
    }

    /// Whether a provider call failing with this error may be retried
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Llm { kind, .. } => {
                matches!(kind, LlmErrorKind::RateLimited | LlmErrorKind::Timeout)
            },
            Self::Transcription { transient, .. } => *transient,
            _ => false,
        }
    }

    /// Expected conditions caused by the caller rather than the system
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_)
                | Self::NotReady(_)
                | Self::Validation(_)
                | Self::InvalidTransition { .. }
                | Self::AlreadyRunning(_)
        )
    }

    /// Short label used for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Transcription { .. } => "transcription",
            Self::Llm { .. } => "llm",
            Self::Synthesis(_) => "synthesis",
            Self::PoseAnalysis(_) => "pose",
            Self::Animation(_) => "animation",
            Self::Media(_) => "media",
            Self::NotFound(_) => "not_found",
            Self::NotReady(_) => "not_ready",
            Self::Validation(_) => "validation",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::AlreadyRunning(_) => "already_running",
            Self::Storage(_) => "storage",
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Storage(format!("Serialization failed: {}", err))
    }
}
