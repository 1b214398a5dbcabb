//! Configuration management for the digital coach
//!
//! Supports loading configuration from:
//! - `config/default.*` and `config/{env}.*` files (any format the `config`
//!   crate understands)
//! - Environment variables (`COACH__` prefix, `__` separator), e.g.
//!   `COACH__PROVIDERS__LLM__PROVIDER=anthropic`
//!
//! Provider credentials left empty here fall back to the conventional
//! environment variables listed in [`constants::env_keys`].

pub mod constants;
pub mod providers;
pub mod settings;

pub use providers::{
    AvatarSettings, LlmSettings, PoseSettings, ProvidersConfig, SttSettings, TtsSettings,
};
pub use settings::{
    load_settings, load_settings_in, ConversationConfig, EvaluationConfig, ObservabilityConfig,
    RetryConfig, RuntimeEnvironment, ServerConfig, Settings, StorageConfig, VadSettings,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &str, message: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
