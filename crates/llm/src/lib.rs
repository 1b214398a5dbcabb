//! Language model integration
//!
//! Features:
//! - OpenAI-compatible backend (OpenAI, Gemini, Typhoon, NVIDIA)
//! - Native Anthropic Messages backend
//! - Coaching and evaluation prompts, feedback JSON parsing
//! - Adapter onto the core `LanguageModel` trait with retry

pub mod adapter;
pub mod backend;
pub mod claude;
pub mod factory;
pub mod prompt;

pub use adapter::LanguageModelAdapter;
pub use backend::{FinishReason, GenerationResult, LlmBackend, OpenAIBackend, OpenAIConfig};
pub use claude::{ClaudeBackend, ClaudeConfig};
pub use factory::{LlmFactory, LlmProvider};
pub use prompt::{
    evaluation_prompt, parse_feedback, truncate_graphemes, Message, PromptBuilder, Role,
    CONVERSATION_SYSTEM_PROMPT, EVALUATION_SYSTEM_PROMPT,
};

use coach_core::LlmErrorKind;
use reqwest::StatusCode;
use thiserror::Error;

/// LLM errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Authentication rejected: {0}")]
    AuthInvalid(String),

    #[error("Request timed out")]
    Timeout,

    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl LlmError {
    /// Classify a non-success HTTP response
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = format!("HTTP {}: {}", status.as_u16(), body);
        match status {
            StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimited(message),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::AuthInvalid(message),
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => LlmError::Timeout,
            _ => LlmError::Api(message),
        }
    }

    pub fn kind(&self) -> LlmErrorKind {
        match self {
            LlmError::RateLimited(_) => LlmErrorKind::RateLimited,
            LlmError::AuthInvalid(_) => LlmErrorKind::AuthInvalid,
            LlmError::Timeout => LlmErrorKind::Timeout,
            _ => LlmErrorKind::Other,
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

impl From<LlmError> for coach_core::Error {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Configuration(msg) => coach_core::Error::Configuration(msg),
            other => coach_core::Error::llm(other.kind(), other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            LlmError::from_status(StatusCode::TOO_MANY_REQUESTS, ""),
            LlmError::RateLimited(_)
        ));
        assert!(matches!(
            LlmError::from_status(StatusCode::UNAUTHORIZED, ""),
            LlmError::AuthInvalid(_)
        ));
        assert!(matches!(
            LlmError::from_status(StatusCode::FORBIDDEN, ""),
            LlmError::AuthInvalid(_)
        ));
        assert!(matches!(
            LlmError::from_status(StatusCode::INTERNAL_SERVER_ERROR, "boom"),
            LlmError::Api(_)
        ));
    }

    #[test]
    fn test_core_error_keeps_kind() {
        let err: coach_core::Error = LlmError::RateLimited("slow".into()).into();
        assert!(err.is_retryable());

        let err: coach_core::Error = LlmError::AuthInvalid("bad key".into()).into();
        assert!(!err.is_retryable());
        assert!(matches!(
            err,
            coach_core::Error::Llm {
                kind: LlmErrorKind::AuthInvalid,
                ..
            }
        ));

        let err: coach_core::Error = LlmError::Configuration("no key".into()).into();
        assert!(matches!(err, coach_core::Error::Configuration(_)));
    }
}
