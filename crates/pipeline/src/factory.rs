//! Provider factories
//!
//! Resolve a provider name plus its settings block into a trait object.
//! Unknown names and missing credentials fail here with a configuration
//! error; construction never touches the network.

use std::sync::Arc;
use std::time::Duration;

use coach_analysis::PoseAnalysisConfig;
use coach_config::constants::{endpoints, env_keys, models, resolve_api_key};
use coach_config::{AvatarSettings, PoseSettings, SttSettings, TtsSettings};
use coach_core::{AvatarAnimator, PoseEstimator, SpeechToText, TextToSpeech};

use crate::avatar::{
    HuggingFaceAvatar, HuggingFaceConfig, NvidiaAvatar, NvidiaConfig, ProceduralAvatar,
    ProceduralConfig,
};
use crate::pose::{MediaPipeConfig, MediaPipePose, RemoteScoresConfig, RemoteScoresPose};
use crate::stt::{
    DeepgramConfig, DeepgramStt, GoogleCloudConfig, GoogleCloudStt, WhisperConfig,
    WhisperSidecarStt,
};
use crate::tts::{ElevenLabsConfig, ElevenLabsTts, GttsConfig, GttsTts, SidecarConfig, SidecarTts};
use crate::PipelineError;

fn unknown(capability: &str, name: &str, known: &[&str]) -> PipelineError {
    PipelineError::Configuration(format!(
        "Unknown {} provider: '{}' (available: {})",
        capability,
        name,
        known.join(", ")
    ))
}

fn require_key(provider: &str, explicit: Option<&str>, vars: &[&str]) -> Result<String, PipelineError> {
    resolve_api_key(explicit, vars).ok_or_else(|| {
        PipelineError::Configuration(format!(
            "Missing API key for provider '{}' (set {})",
            provider,
            vars.join(" or ")
        ))
    })
}

/// STT provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SttProvider {
    WhisperLocal,
    Deepgram,
    GoogleCloud,
}

impl SttProvider {
    const NAMES: &'static [&'static str] = &["whisper-local", "deepgram", "google-cloud"];

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "whisper-local" | "whisper" => Some(SttProvider::WhisperLocal),
            "deepgram" => Some(SttProvider::Deepgram),
            "google-cloud" | "google" => Some(SttProvider::GoogleCloud),
            _ => None,
        }
    }
}

/// STT factory
pub struct SttFactory;

impl SttFactory {
    pub fn create(settings: &SttSettings) -> Result<Arc<dyn SpeechToText>, PipelineError> {
        let provider = SttProvider::from_str(&settings.provider)
            .ok_or_else(|| unknown("STT", &settings.provider, SttProvider::NAMES))?;
        let timeout = Duration::from_secs(settings.timeout_secs);

        let stt: Arc<dyn SpeechToText> = match provider {
            SttProvider::WhisperLocal => Arc::new(WhisperSidecarStt::new(WhisperConfig {
                url: settings
                    .endpoint
                    .clone()
                    .unwrap_or_else(|| endpoints::WHISPER_SIDECAR.to_string()),
                model: settings
                    .model
                    .clone()
                    .unwrap_or_else(|| models::WHISPER.to_string()),
                language: settings.language.clone(),
                timeout,
            })?),
            SttProvider::Deepgram => Arc::new(DeepgramStt::new(DeepgramConfig {
                api_key: require_key(
                    "deepgram",
                    settings.api_key.as_deref(),
                    &[env_keys::DEEPGRAM],
                )?,
                model: settings
                    .model
                    .clone()
                    .unwrap_or_else(|| models::DEEPGRAM.to_string()),
                language: settings.language.clone(),
                endpoint: settings
                    .endpoint
                    .clone()
                    .unwrap_or_else(|| endpoints::DEEPGRAM.to_string()),
                timeout,
            })?),
            SttProvider::GoogleCloud => Arc::new(GoogleCloudStt::new(GoogleCloudConfig {
                api_key: require_key(
                    "google-cloud",
                    settings.api_key.as_deref(),
                    &[env_keys::GOOGLE_CLOUD],
                )?,
                language: settings.language.clone(),
                endpoint: settings
                    .endpoint
                    .clone()
                    .unwrap_or_else(|| endpoints::GOOGLE_SPEECH.to_string()),
                timeout,
            })?),
        };

        tracing::info!(provider = stt.provider_name(), "Created STT provider");
        Ok(stt)
    }
}

/// TTS provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtsProvider {
    ElevenLabs,
    Edge,
    Gtts,
    Local,
}

impl TtsProvider {
    const NAMES: &'static [&'static str] = &["elevenlabs", "edge", "gtts", "local"];

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "elevenlabs" => Some(TtsProvider::ElevenLabs),
            "edge" => Some(TtsProvider::Edge),
            "gtts" => Some(TtsProvider::Gtts),
            "local" | "coqui" => Some(TtsProvider::Local),
            _ => None,
        }
    }
}

/// TTS factory
pub struct TtsFactory;

impl TtsFactory {
    pub fn create(settings: &TtsSettings) -> Result<Arc<dyn TextToSpeech>, PipelineError> {
        let provider = TtsProvider::from_str(&settings.provider)
            .ok_or_else(|| unknown("TTS", &settings.provider, TtsProvider::NAMES))?;
        let timeout = Duration::from_secs(settings.timeout_secs);

        let tts: Arc<dyn TextToSpeech> = match provider {
            TtsProvider::ElevenLabs => {
                let defaults = ElevenLabsConfig::default();
                Arc::new(ElevenLabsTts::new(ElevenLabsConfig {
                    api_key: require_key(
                        "elevenlabs",
                        settings.api_key.as_deref(),
                        &[env_keys::ELEVENLABS],
                    )?,
                    voice_id: settings.voice_id.clone().unwrap_or(defaults.voice_id),
                    model_id: settings.model.clone().unwrap_or(defaults.model_id),
                    speed: settings.speed,
                    endpoint: settings.endpoint.clone().unwrap_or(defaults.endpoint),
                    timeout,
                    ..defaults
                })?)
            },
            TtsProvider::Edge => Arc::new(SidecarTts::new(SidecarConfig {
                provider: "edge",
                url: settings
                    .endpoint
                    .clone()
                    .unwrap_or_else(|| endpoints::EDGE_TTS_SIDECAR.to_string()),
                voice: Some(
                    settings
                        .voice_id
                        .clone()
                        .unwrap_or_else(|| models::EDGE_VOICE.to_string()),
                ),
                speed: settings.speed,
                timeout,
            })?),
            TtsProvider::Local => Arc::new(SidecarTts::new(SidecarConfig {
                provider: "local",
                url: settings
                    .endpoint
                    .clone()
                    .unwrap_or_else(|| endpoints::LOCAL_TTS_SIDECAR.to_string()),
                voice: settings.voice_id.clone(),
                speed: settings.speed,
                timeout,
            })?),
            TtsProvider::Gtts => Arc::new(GttsTts::new(GttsConfig {
                language: settings.language.clone(),
                slow: settings.speed < 1.0,
                endpoint: settings
                    .endpoint
                    .clone()
                    .unwrap_or_else(|| endpoints::GTTS.to_string()),
                timeout,
            })?),
        };

        tracing::info!(provider = tts.provider_name(), "Created TTS provider");
        Ok(tts)
    }
}

/// Pose provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoseProvider {
    MediaPipe,
    RemoteScores,
}

impl PoseProvider {
    const NAMES: &'static [&'static str] = &["mediapipe", "remote-scores"];

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "mediapipe" => Some(PoseProvider::MediaPipe),
            "remote-scores" | "remote" => Some(PoseProvider::RemoteScores),
            _ => None,
        }
    }
}

/// Pose factory
pub struct PoseFactory;

impl PoseFactory {
    /// `min_detection_rate` is the tracking quality below which metrics are
    /// flagged low-confidence
    pub fn create(
        settings: &PoseSettings,
        min_detection_rate: f64,
    ) -> Result<Arc<dyn PoseEstimator>, PipelineError> {
        let provider = PoseProvider::from_str(&settings.provider)
            .ok_or_else(|| unknown("pose", &settings.provider, PoseProvider::NAMES))?;
        let url = settings
            .endpoint
            .clone()
            .unwrap_or_else(|| endpoints::POSE_SIDECAR.to_string());
        let timeout = Duration::from_secs(settings.timeout_secs);

        let pose: Arc<dyn PoseEstimator> = match provider {
            PoseProvider::MediaPipe => Arc::new(MediaPipePose::new(MediaPipeConfig {
                url,
                sample_fps: settings.sample_fps,
                analysis: PoseAnalysisConfig {
                    confidence_threshold: settings.confidence_threshold,
                    min_detection_rate,
                },
                timeout,
            })?),
            PoseProvider::RemoteScores => Arc::new(RemoteScoresPose::new(RemoteScoresConfig {
                url,
                sample_fps: settings.sample_fps,
                min_detection_rate,
                timeout,
            })?),
        };

        tracing::info!(provider = pose.provider_name(), "Created pose provider");
        Ok(pose)
    }
}

/// Avatar provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvatarProvider {
    Nvidia,
    HuggingFace,
    Procedural,
}

impl AvatarProvider {
    const NAMES: &'static [&'static str] = &["nvidia", "huggingface", "procedural"];

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "nvidia" => Some(AvatarProvider::Nvidia),
            "huggingface" | "hf" => Some(AvatarProvider::HuggingFace),
            "procedural" | "mock" => Some(AvatarProvider::Procedural),
            _ => None,
        }
    }
}

/// Avatar factory
pub struct AvatarFactory;

impl AvatarFactory {
    pub fn create(settings: &AvatarSettings) -> Result<Arc<dyn AvatarAnimator>, PipelineError> {
        let provider = AvatarProvider::from_str(&settings.provider)
            .ok_or_else(|| unknown("avatar", &settings.provider, AvatarProvider::NAMES))?;
        let timeout = Duration::from_secs(settings.timeout_secs);

        let avatar: Arc<dyn AvatarAnimator> = match provider {
            AvatarProvider::Nvidia => Arc::new(NvidiaAvatar::new(NvidiaConfig {
                api_key: require_key("nvidia", settings.api_key.as_deref(), &[env_keys::NVIDIA])?,
                model: settings
                    .model
                    .clone()
                    .unwrap_or_else(|| models::AUDIO2FACE_NVIDIA.to_string()),
                endpoint: settings
                    .endpoint
                    .clone()
                    .unwrap_or_else(|| endpoints::NVIDIA_AUDIO2FACE.to_string()),
                fps: settings.fps,
                timeout,
            })?),
            AvatarProvider::HuggingFace => Arc::new(HuggingFaceAvatar::new(HuggingFaceConfig {
                api_key: require_key(
                    "huggingface",
                    settings.api_key.as_deref(),
                    &[env_keys::HUGGINGFACE],
                )?,
                model: settings
                    .model
                    .clone()
                    .unwrap_or_else(|| models::AUDIO2FACE_HUGGINGFACE.to_string()),
                endpoint: settings
                    .endpoint
                    .clone()
                    .unwrap_or_else(|| endpoints::HUGGINGFACE_INFERENCE.to_string()),
                fps: settings.fps,
                timeout,
            })?),
            AvatarProvider::Procedural => {
                Arc::new(ProceduralAvatar::new(ProceduralConfig { fps: settings.fps }))
            },
        };

        tracing::info!(provider = avatar.provider_name(), "Created avatar provider");
        Ok(avatar)
    }
}
