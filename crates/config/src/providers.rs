//! Provider selection and credentials
//!
//! One block per capability. `provider` is resolved to a concrete adapter by
//! the factories in `coach-llm` and `coach-pipeline`; an unknown name is a
//! configuration error at construction time.

use serde::{Deserialize, Serialize};

/// Capability -> provider mapping
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub stt: SttSettings,
    #[serde(default)]
    pub llm: LlmSettings,
    #[serde(default)]
    pub tts: TtsSettings,
    #[serde(default)]
    pub pose: PoseSettings,
    #[serde(default)]
    pub avatar: AvatarSettings,
}

/// Speech-to-text provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SttSettings {
    /// whisper-local, deepgram, google-cloud
    #[serde(default = "default_stt_provider")]
    pub provider: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_language")]
    pub language: String,
    /// Overrides the provider's default base URL
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_stt_timeout")]
    pub timeout_secs: u64,
}

fn default_stt_provider() -> String {
    "whisper-local".to_string()
}
fn default_language() -> String {
    "en".to_string()
}
fn default_stt_timeout() -> u64 {
    60
}

impl Default for SttSettings {
    fn default() -> Self {
        Self {
            provider: default_stt_provider(),
            api_key: None,
            model: None,
            language: default_language(),
            endpoint: None,
            timeout_secs: default_stt_timeout(),
        }
    }
}

/// Language model provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    /// openai, anthropic, google, typhoon, nvidia
    #[serde(default = "default_llm_provider")]
    pub provider: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Provider default when unset
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<usize>,
    #[serde(default)]
    pub top_p: Option<f32>,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

fn default_llm_provider() -> String {
    "openai".to_string()
}
fn default_llm_timeout() -> u64 {
    60
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            api_key: None,
            model: None,
            endpoint: None,
            temperature: None,
            max_tokens: None,
            top_p: None,
            timeout_secs: default_llm_timeout(),
        }
    }
}

/// Text-to-speech provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsSettings {
    /// elevenlabs, edge, gtts, local
    #[serde(default = "default_tts_provider")]
    pub provider: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub voice_id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_speed")]
    pub speed: f32,
    #[serde(default = "default_tts_timeout")]
    pub timeout_secs: u64,
}

fn default_tts_provider() -> String {
    "edge".to_string()
}
fn default_speed() -> f32 {
    1.0
}
fn default_tts_timeout() -> u64 {
    30
}

impl Default for TtsSettings {
    fn default() -> Self {
        Self {
            provider: default_tts_provider(),
            api_key: None,
            voice_id: None,
            model: None,
            endpoint: None,
            language: default_language(),
            speed: default_speed(),
            timeout_secs: default_tts_timeout(),
        }
    }
}

/// Pose estimation provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoseSettings {
    /// mediapipe, remote-scores
    #[serde(default = "default_pose_provider")]
    pub provider: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Minimum landmark confidence for a frame to count as detected
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    /// Frames sampled per second of video
    #[serde(default = "default_sample_fps")]
    pub sample_fps: f64,
    #[serde(default = "default_pose_timeout")]
    pub timeout_secs: u64,
}

fn default_pose_provider() -> String {
    "mediapipe".to_string()
}
fn default_confidence_threshold() -> f64 {
    0.5
}
fn default_sample_fps() -> f64 {
    5.0
}
fn default_pose_timeout() -> u64 {
    300
}

impl Default for PoseSettings {
    fn default() -> Self {
        Self {
            provider: default_pose_provider(),
            endpoint: None,
            confidence_threshold: default_confidence_threshold(),
            sample_fps: default_sample_fps(),
            timeout_secs: default_pose_timeout(),
        }
    }
}

/// Avatar animation provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvatarSettings {
    /// nvidia, huggingface, procedural
    #[serde(default = "default_avatar_provider")]
    pub provider: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Animation frames per second
    #[serde(default = "default_avatar_fps")]
    pub fps: u32,
    #[serde(default = "default_avatar_timeout")]
    pub timeout_secs: u64,
}

fn default_avatar_provider() -> String {
    "procedural".to_string()
}
fn default_avatar_fps() -> u32 {
    60
}
fn default_avatar_timeout() -> u64 {
    120
}

impl Default for AvatarSettings {
    fn default() -> Self {
        Self {
            provider: default_avatar_provider(),
            api_key: None,
            model: None,
            endpoint: None,
            fps: default_avatar_fps(),
            timeout_secs: default_avatar_timeout(),
        }
    }
}
