//! Main settings module

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::{ConfigError, ProvidersConfig};

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    #[default]
    Development,
    Staging,
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    #[serde(default)]
    pub server: ServerConfig,

    /// Session files and retention
    #[serde(default)]
    pub storage: StorageConfig,

    /// Capability -> provider selection
    #[serde(default)]
    pub providers: ProvidersConfig,

    #[serde(default)]
    pub conversation: ConversationConfig,

    #[serde(default)]
    pub evaluation: EvaluationConfig,

    /// Backoff policy for retryable provider failures
    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_storage()?;
        self.validate_conversation()?;
        self.validate_evaluation()?;
        self.validate_retry()?;
        Ok(())
    }

    fn validate_conversation(&self) -> Result<(), ConfigError> {
        let vad = &self.conversation.vad;

        if vad.sample_rate == 0 || vad.frame_ms == 0 {
            return Err(ConfigError::invalid(
                "conversation.vad",
                "Sample rate and frame length must be positive",
            ));
        }

        if !(vad.energy_threshold > 0.0 && vad.energy_threshold < 1.0) {
            return Err(ConfigError::invalid(
                "conversation.vad.energy_threshold",
                format!("Must be between 0.0 and 1.0, got {}", vad.energy_threshold),
            ));
        }

        if vad.padding_ms < vad.frame_ms {
            return Err(ConfigError::invalid(
                "conversation.vad.padding_ms",
                "Must cover at least one frame",
            ));
        }

        if self.providers.avatar.fps == 0 {
            return Err(ConfigError::invalid(
                "providers.avatar.fps",
                "Must be positive",
            ));
        }

        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        let server = &self.server;

        if server.port == 0 {
            return Err(ConfigError::invalid("server.port", "Port cannot be 0"));
        }

        if server.timeout_seconds == 0 {
            return Err(ConfigError::invalid(
                "server.timeout_seconds",
                "Timeout must be at least 1 second",
            ));
        }

        if server.max_upload_mb == 0 {
            return Err(ConfigError::invalid(
                "server.max_upload_mb",
                "Upload limit must be at least 1 MB",
            ));
        }

        if self.environment.is_production() && server.cors_enabled && server.cors_origins.is_empty()
        {
            tracing::warn!(
                "CORS is enabled in production but no origins are configured. \
                 This may block legitimate requests."
            );
        }

        Ok(())
    }

    fn validate_storage(&self) -> Result<(), ConfigError> {
        let storage = &self.storage;

        if storage.base_dir.as_os_str().is_empty() {
            return Err(ConfigError::MissingField("storage.base_dir".to_string()));
        }

        if storage.ttl_hours == 0 {
            return Err(ConfigError::invalid(
                "storage.ttl_hours",
                "Retention must be at least 1 hour",
            ));
        }

        if storage.sweep_interval_secs == 0 {
            return Err(ConfigError::invalid(
                "storage.sweep_interval_secs",
                "Sweep interval must be at least 1 second",
            ));
        }

        if !storage.public_prefix.starts_with('/') {
            return Err(ConfigError::invalid(
                "storage.public_prefix",
                format!("Must start with '/', got {}", storage.public_prefix),
            ));
        }

        Ok(())
    }

    fn validate_evaluation(&self) -> Result<(), ConfigError> {
        let eval = &self.evaluation;

        if eval.pause_threshold_secs <= 0.0 {
            return Err(ConfigError::invalid(
                "evaluation.pause_threshold_secs",
                format!("Must be positive, got {}", eval.pause_threshold_secs),
            ));
        }

        if eval.extract_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "evaluation.extract_timeout_secs",
                "Timeout must be at least 1 second",
            ));
        }

        if !(0.0..=1.0).contains(&eval.min_detection_rate) {
            return Err(ConfigError::invalid(
                "evaluation.min_detection_rate",
                format!("Must be between 0.0 and 1.0, got {}", eval.min_detection_rate),
            ));
        }

        if !(0.0..=1.0).contains(&self.providers.pose.confidence_threshold) {
            return Err(ConfigError::invalid(
                "providers.pose.confidence_threshold",
                format!(
                    "Must be between 0.0 and 1.0, got {}",
                    self.providers.pose.confidence_threshold
                ),
            ));
        }

        if self.providers.pose.sample_fps <= 0.0 {
            return Err(ConfigError::invalid(
                "providers.pose.sample_fps",
                "Must be positive",
            ));
        }

        Ok(())
    }

    fn validate_retry(&self) -> Result<(), ConfigError> {
        let retry = &self.retry;

        if retry.max_retries > 10 {
            return Err(ConfigError::invalid(
                "retry.max_retries",
                format!("At most 10 retries, got {}", retry.max_retries),
            ));
        }

        if retry.max_backoff_ms < retry.initial_backoff_ms {
            return Err(ConfigError::invalid(
                "retry.max_backoff_ms",
                "Must not be smaller than retry.initial_backoff_ms",
            ));
        }

        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds (uploads and synchronous turns)
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Largest accepted video upload
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8000
}
fn default_timeout() -> u64 {
    120
}
fn default_true() -> bool {
    true
}
fn default_max_upload_mb() -> usize {
    500
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout_seconds: default_timeout(),
            cors_enabled: default_true(),
            // Empty by default; use ["http://localhost:8501"] for the local UI
            cors_origins: Vec::new(),
            max_upload_mb: default_max_upload_mb(),
        }
    }
}

impl ServerConfig {
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

/// Session storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory holding one directory per session
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,

    /// URL prefix under which session files are served
    #[serde(default = "default_public_prefix")]
    pub public_prefix: String,

    /// Retention window for terminal sessions
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: u64,

    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

fn default_base_dir() -> PathBuf {
    PathBuf::from("temp/sessions")
}
fn default_public_prefix() -> String {
    "/files".to_string()
}
fn default_ttl_hours() -> u64 {
    24
}
fn default_sweep_interval() -> u64 {
    3600
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            public_prefix: default_public_prefix(),
            ttl_hours: default_ttl_hours(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

impl StorageConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_hours * 3600)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Conversation coaching configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Replaces the built-in coaching system prompt
    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Synthesize audio for assistant replies
    #[serde(default = "default_true")]
    pub synthesize_replies: bool,

    /// Speech segmentation on the streaming socket
    #[serde(default)]
    pub vad: VadSettings,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            system_prompt: None,
            synthesize_replies: true,
            vad: VadSettings::default(),
        }
    }
}

/// Energy VAD over 16-bit mono PCM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VadSettings {
    #[serde(default = "default_vad_sample_rate")]
    pub sample_rate: u32,
    /// Frame RMS (0-1) above which a frame counts as speech
    #[serde(default = "default_vad_threshold")]
    pub energy_threshold: f32,
    #[serde(default = "default_vad_frame_ms")]
    pub frame_ms: u32,
    /// Trailing silence that closes a segment
    #[serde(default = "default_vad_padding_ms")]
    pub padding_ms: u32,
    /// Shorter segments are dropped
    #[serde(default = "default_vad_min_speech_ms")]
    pub min_speech_ms: u32,
    /// Longer speech is cut into a segment anyway
    #[serde(default = "default_vad_max_segment_secs")]
    pub max_segment_secs: u32,
}

fn default_vad_sample_rate() -> u32 {
    16_000
}
fn default_vad_threshold() -> f32 {
    0.01
}
fn default_vad_frame_ms() -> u32 {
    30
}
fn default_vad_padding_ms() -> u32 {
    300
}
fn default_vad_min_speech_ms() -> u32 {
    250
}
fn default_vad_max_segment_secs() -> u32 {
    30
}

impl Default for VadSettings {
    fn default() -> Self {
        Self {
            sample_rate: default_vad_sample_rate(),
            energy_threshold: default_vad_threshold(),
            frame_ms: default_vad_frame_ms(),
            padding_ms: default_vad_padding_ms(),
            min_speech_ms: default_vad_min_speech_ms(),
            max_segment_secs: default_vad_max_segment_secs(),
        }
    }
}

/// Evaluation pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Gap between words (or silent run) counted as a pause
    #[serde(default = "default_pause_threshold")]
    pub pause_threshold_secs: f64,

    /// Frame RMS below which audio counts as silence
    #[serde(default = "default_silence_rms")]
    pub silence_rms_threshold: f32,

    /// Pose metrics are flagged low-confidence under this detection rate
    #[serde(default = "default_min_detection_rate")]
    pub min_detection_rate: f64,

    /// Transcript budget for the feedback prompt
    #[serde(default = "default_max_transcript_chars")]
    pub max_transcript_chars: usize,

    /// Synthesize the narrative feedback to audio
    #[serde(default = "default_true")]
    pub synthesize_feedback: bool,

    /// Deadline for each ffmpeg/ffprobe child process
    #[serde(default = "default_extract_timeout")]
    pub extract_timeout_secs: u64,
}

impl EvaluationConfig {
    pub fn extract_timeout(&self) -> Duration {
        Duration::from_secs(self.extract_timeout_secs)
    }
}

fn default_pause_threshold() -> f64 {
    0.5
}
fn default_silence_rms() -> f32 {
    0.02
}
fn default_min_detection_rate() -> f64 {
    0.8
}
fn default_max_transcript_chars() -> usize {
    12_000
}
fn default_extract_timeout() -> u64 {
    300
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            pause_threshold_secs: default_pause_threshold(),
            silence_rms_threshold: default_silence_rms(),
            min_detection_rate: default_min_detection_rate(),
            max_transcript_chars: default_max_transcript_chars(),
            synthesize_feedback: true,
            extract_timeout_secs: default_extract_timeout(),
        }
    }
}

/// Retry policy for provider calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_max_retries() -> u32 {
    2
}
fn default_initial_backoff_ms() -> u64 {
    500
}
fn default_max_backoff_ms() -> u64 {
    8_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit JSON log lines
    #[serde(default)]
    pub log_json: bool,

    /// Install the Prometheus recorder and serve `/metrics`
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            metrics_enabled: true,
        }
    }
}

const CONFIG_EXTENSIONS: [&str; 5] = ["toml", "yaml", "yml", "json", "ini"];

/// Load settings from files and environment
///
/// Priority (highest to lowest):
/// 1. Environment variables (`COACH__` prefix)
/// 2. `config/{env}.*` (if env specified)
/// 3. `config/default.*`
///
/// A missing default file is skipped. A named env whose file does not exist
/// is `FileNotFound`; a file or variable that fails to parse or validate is
/// an error.
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    load_settings_in(Path::new("config"), env)
}

/// [`load_settings`] with files looked up under `config_dir`
pub fn load_settings_in(config_dir: &Path, env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    let default_file = config_dir.join("default");
    builder = builder.add_source(File::with_name(&default_file.to_string_lossy()).required(false));

    if let Some(env_name) = env {
        let env_file = config_dir.join(env_name);
        let exists = CONFIG_EXTENSIONS
            .iter()
            .any(|ext| env_file.with_extension(ext).is_file());
        if !exists {
            return Err(ConfigError::FileNotFound(env_file.display().to_string()));
        }
        builder = builder.add_source(File::with_name(&env_file.to_string_lossy()));
    }

    builder = builder.add_source(
        Environment::with_prefix("COACH")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8000);
        assert_eq!(settings.storage.ttl_hours, 24);
        assert_eq!(settings.retry.max_retries, 2);
        assert_eq!(settings.providers.llm.provider, "openai");
        assert_eq!(settings.providers.stt.provider, "whisper-local");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let raw = r#"{
            "providers": { "llm": { "provider": "anthropic", "temperature": 0.3 } },
            "storage": { "ttl_hours": 48 }
        }"#;
        let settings: Settings = Config::builder()
            .add_source(File::from_str(raw, FileFormat::Json))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.providers.llm.provider, "anthropic");
        assert_eq!(settings.providers.llm.temperature, Some(0.3));
        assert_eq!(settings.providers.tts.provider, "edge");
        assert_eq!(settings.storage.ttl(), Duration::from_secs(48 * 3600));
        assert_eq!(settings.storage.sweep_interval_secs, 3600);
    }

    #[test]
    fn test_server_validation() {
        let mut settings = Settings::default();
        settings.server.port = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.server.max_upload_mb = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_storage_validation() {
        let mut settings = Settings::default();
        settings.storage.ttl_hours = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.storage.public_prefix = "files".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_evaluation_validation() {
        let mut settings = Settings::default();
        settings.evaluation.min_detection_rate = 1.5;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.evaluation.pause_threshold_secs = 0.0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.providers.pose.confidence_threshold = -0.1;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.evaluation.extract_timeout_secs = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_conversation_validation() {
        let mut settings = Settings::default();
        settings.conversation.vad.energy_threshold = 0.0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.conversation.vad.padding_ms = 10;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.providers.avatar.fps = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_missing_config_dir_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings_in(&dir.path().join("absent"), None).unwrap();
        assert_eq!(settings.server.port, 8000);
        assert_eq!(settings.evaluation.extract_timeout(), Duration::from_secs(300));
    }

    #[test]
    fn test_missing_env_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_settings_in(dir.path(), Some("production")).unwrap_err();
        match err {
            ConfigError::FileNotFound(path) => assert!(path.ends_with("production"), "{}", path),
            other => panic!("expected FileNotFound, got {}", other),
        }
    }

    #[test]
    fn test_invalid_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("default.json"),
            r#"{ "providers": { "llm": { "provider": "anthropic" } }, "retry": { "max_retries": 50 } }"#,
        )
        .unwrap();
        let err = load_settings_in(dir.path(), None).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }), "{}", err);

        std::fs::write(
            dir.path().join("default.json"),
            r#"{ "server": { "port": "eighty" } }"#,
        )
        .unwrap();
        let err = load_settings_in(dir.path(), None).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)), "{}", err);
    }

    #[test]
    fn test_env_file_overrides_default() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("default.json"),
            r#"{ "storage": { "ttl_hours": 12 } }"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("staging.json"),
            r#"{ "environment": "staging", "storage": { "ttl_hours": 6 } }"#,
        )
        .unwrap();

        let settings = load_settings_in(dir.path(), Some("staging")).unwrap();
        assert_eq!(settings.environment, RuntimeEnvironment::Staging);
        assert_eq!(settings.storage.ttl_hours, 6);
    }

    #[test]
    fn test_retry_validation() {
        let mut settings = Settings::default();
        settings.retry.initial_backoff_ms = 10_000;
        settings.retry.max_backoff_ms = 1_000;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.retry.max_retries = 0;
        assert!(settings.validate().is_ok());
    }
}
