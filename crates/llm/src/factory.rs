//! LLM Factory
//!
//! Resolves `providers.llm` settings into a backend. Unknown provider names
//! and missing credentials fail here, before any network I/O.
//!
//! ## Supported Providers
//! - **openai**: `/chat/completions`
//! - **anthropic** (`claude`): native Messages API
//! - **google** (`gemini`): Gemini's OpenAI-compatible surface
//! - **typhoon**: OpenAI-compatible
//! - **nvidia**: OpenAI-compatible, NVIDIA API catalog

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use coach_config::constants::{endpoints, env_keys, models, resolve_api_key};
use coach_config::LlmSettings;

use crate::adapter::LanguageModelAdapter;
use crate::backend::{LlmBackend, OpenAIBackend, OpenAIConfig};
use crate::claude::{ClaudeBackend, ClaudeConfig};
use crate::LlmError;

/// LLM provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    OpenAI,
    Anthropic,
    Google,
    Typhoon,
    Nvidia,
}

impl LlmProvider {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" | "gpt" => Some(LlmProvider::OpenAI),
            "anthropic" | "claude" => Some(LlmProvider::Anthropic),
            "google" | "gemini" => Some(LlmProvider::Google),
            "typhoon" => Some(LlmProvider::Typhoon),
            "nvidia" => Some(LlmProvider::Nvidia),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProvider::OpenAI => "openai",
            LlmProvider::Anthropic => "anthropic",
            LlmProvider::Google => "google",
            LlmProvider::Typhoon => "typhoon",
            LlmProvider::Nvidia => "nvidia",
        }
    }

    fn key_vars(&self) -> &'static [&'static str] {
        match self {
            LlmProvider::OpenAI => &[env_keys::OPENAI],
            LlmProvider::Anthropic => &[env_keys::ANTHROPIC],
            LlmProvider::Google => env_keys::GOOGLE,
            LlmProvider::Typhoon => &[env_keys::TYPHOON],
            LlmProvider::Nvidia => &[env_keys::NVIDIA],
        }
    }

    /// (endpoint, model, temperature, top_p, max_tokens)
    fn defaults(&self) -> (&'static str, &'static str, f32, Option<f32>, usize) {
        match self {
            LlmProvider::OpenAI => (endpoints::OPENAI, models::OPENAI, 0.7, None, 500),
            LlmProvider::Anthropic => (endpoints::ANTHROPIC, models::ANTHROPIC, 0.7, None, 1024),
            LlmProvider::Google => (endpoints::GOOGLE_GEMINI, models::GOOGLE, 0.7, None, 1024),
            LlmProvider::Typhoon => (endpoints::TYPHOON, models::TYPHOON, 0.7, None, 1024),
            LlmProvider::Nvidia => (endpoints::NVIDIA, models::NVIDIA, 0.6, Some(0.7), 4096),
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// LLM Factory
pub struct LlmFactory;

impl LlmFactory {
    /// Build the backend selected by `settings`
    pub fn create_backend(settings: &LlmSettings) -> Result<Arc<dyn LlmBackend>, LlmError> {
        let provider = LlmProvider::from_str(&settings.provider).ok_or_else(|| {
            LlmError::Configuration(format!("Unknown LLM provider: '{}'", settings.provider))
        })?;

        let api_key = resolve_api_key(settings.api_key.as_deref(), provider.key_vars())
            .ok_or_else(|| {
                LlmError::Configuration(format!(
                    "Missing API key for LLM provider '{}' (set {})",
                    provider,
                    provider.key_vars().join(" or ")
                ))
            })?;

        let (endpoint, model, temperature, top_p, max_tokens) = provider.defaults();
        let endpoint = settings.endpoint.clone().unwrap_or_else(|| endpoint.to_string());
        let model = settings.model.clone().unwrap_or_else(|| model.to_string());
        let timeout = Duration::from_secs(settings.timeout_secs);

        tracing::info!(provider = %provider, model = %model, "Creating LLM backend");

        let backend: Arc<dyn LlmBackend> = match provider {
            LlmProvider::Anthropic => Arc::new(ClaudeBackend::new(ClaudeConfig {
                api_key,
                model,
                max_tokens: settings.max_tokens.unwrap_or(max_tokens),
                temperature: Some(settings.temperature.unwrap_or(temperature).clamp(0.0, 1.0)),
                top_p: settings.top_p.or(top_p),
                timeout,
                endpoint,
            })?),
            _ => Arc::new(OpenAIBackend::new(OpenAIConfig {
                provider: provider.as_str().to_string(),
                endpoint,
                api_key,
                model,
                max_tokens: Some(settings.max_tokens.unwrap_or(max_tokens)),
                temperature: Some(settings.temperature.unwrap_or(temperature)),
                top_p: settings.top_p.or(top_p),
                timeout,
            })?),
        };

        Ok(backend)
    }

    /// Build the backend and wrap it as a core `LanguageModel`
    pub fn create(settings: &LlmSettings) -> Result<LanguageModelAdapter, LlmError> {
        Ok(LanguageModelAdapter::from_arc(Self::create_backend(settings)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(provider: &str, key: Option<&str>) -> LlmSettings {
        LlmSettings {
            provider: provider.to_string(),
            api_key: key.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_provider_aliases() {
        assert_eq!(LlmProvider::from_str("Claude"), Some(LlmProvider::Anthropic));
        assert_eq!(LlmProvider::from_str("gemini"), Some(LlmProvider::Google));
        assert_eq!(LlmProvider::from_str(" openai "), Some(LlmProvider::OpenAI));
        assert_eq!(LlmProvider::from_str("nonexistent-provider"), None);
    }

    #[test]
    fn test_unknown_provider_is_configuration_error() {
        let err = LlmFactory::create(&settings("nonexistent-provider", Some("key")))
            .err()
            .unwrap();
        assert!(matches!(err, LlmError::Configuration(ref m) if m.contains("nonexistent-provider")));
    }

    #[test]
    fn test_each_provider_builds_with_key() {
        for name in ["openai", "anthropic", "google", "typhoon", "nvidia"] {
            let backend = LlmFactory::create_backend(&settings(name, Some("test-key"))).unwrap();
            assert_eq!(backend.provider_name(), name);
        }
    }

    #[test]
    fn test_defaults_per_provider() {
        let backend = LlmFactory::create_backend(&settings("nvidia", Some("k"))).unwrap();
        assert_eq!(backend.model_name(), models::NVIDIA);

        let mut custom = settings("typhoon", Some("k"));
        custom.model = Some("typhoon-custom".to_string());
        let backend = LlmFactory::create_backend(&custom).unwrap();
        assert_eq!(backend.model_name(), "typhoon-custom");
    }
}
