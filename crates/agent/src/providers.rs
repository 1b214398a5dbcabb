//! Provider bundle
//!
//! Every capability the orchestrators call, resolved once at startup from
//! [`Settings`]. Tests build the bundle directly from mocks.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use coach_config::{RetryConfig, Settings};
use coach_core::{
    AvatarAnimator, LanguageModel, MediaExtractor, PoseEstimator, Result, RetryPolicy,
    SpeechToText, TextToSpeech,
};
use coach_llm::LlmFactory;
use coach_pipeline::{AvatarFactory, FfmpegExtractor, PoseFactory, SttFactory, TtsFactory};

/// Retry policy from settings
pub fn retry_policy(config: &RetryConfig) -> RetryPolicy {
    RetryPolicy {
        max_retries: config.max_retries,
        initial_backoff: Duration::from_millis(config.initial_backoff_ms),
        max_backoff: Duration::from_millis(config.max_backoff_ms),
        jitter: true,
    }
}

/// Selected provider per capability, reported by `/health`
#[derive(Debug, Clone, Serialize)]
pub struct ProviderNames {
    pub stt: String,
    pub llm: String,
    pub llm_model: String,
    pub tts: String,
    pub pose: String,
    pub avatar: String,
}

#[derive(Clone)]
pub struct Providers {
    pub stt: Arc<dyn SpeechToText>,
    pub llm: Arc<dyn LanguageModel>,
    pub tts: Arc<dyn TextToSpeech>,
    pub pose: Arc<dyn PoseEstimator>,
    pub media: Arc<dyn MediaExtractor>,
    pub avatar: Arc<dyn AvatarAnimator>,
}

impl Providers {
    /// Build every provider named in settings
    ///
    /// Unknown names and missing credentials fail here, before the server
    /// accepts requests.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let providers = &settings.providers;

        let llm = LlmFactory::create(&providers.llm)?
            .with_retry(retry_policy(&settings.retry))
            .with_max_transcript_chars(settings.evaluation.max_transcript_chars);

        let bundle = Self {
            stt: SttFactory::create(&providers.stt)?,
            llm: Arc::new(llm),
            tts: TtsFactory::create(&providers.tts)?,
            pose: PoseFactory::create(&providers.pose, settings.evaluation.min_detection_rate)?,
            media: Arc::new(
                FfmpegExtractor::default().with_timeout(settings.evaluation.extract_timeout()),
            ),
            avatar: AvatarFactory::create(&providers.avatar)?,
        };

        let names = bundle.names();
        tracing::info!(
            stt = %names.stt,
            llm = %names.llm,
            model = %names.llm_model,
            tts = %names.tts,
            pose = %names.pose,
            avatar = %names.avatar,
            "Providers ready"
        );
        Ok(bundle)
    }

    pub fn names(&self) -> ProviderNames {
        ProviderNames {
            stt: self.stt.provider_name().to_string(),
            llm: self.llm.provider_name().to_string(),
            llm_model: self.llm.model_name().to_string(),
            tts: self.tts.provider_name().to_string(),
            pose: self.pose.provider_name().to_string(),
            avatar: self.avatar.provider_name().to_string(),
        }
    }
}
