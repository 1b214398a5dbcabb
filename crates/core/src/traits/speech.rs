//! Speech processing traits

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::audio::AudioClip;
use crate::transcript::Transcript;
use crate::Result;

/// Speech-to-Text interface
///
/// Implementations:
/// - `WhisperSidecarStt` - local Whisper served over HTTP
/// - `DeepgramStt` - Deepgram REST API
/// - `GoogleCloudStt` - Google Cloud Speech REST API
///
/// # Example
///
/// ```ignore
/// let stt: Arc<dyn SpeechToText> = SttFactory::create(&settings.providers.stt)?;
/// let transcript = stt.transcribe(&AudioClip::wav(bytes)).await?;
/// println!("Transcribed: {}", transcript.text);
/// ```
#[async_trait]
pub trait SpeechToText: Send + Sync + 'static {
    /// Transcribe a complete recording
    ///
    /// Fails with `Error::Transcription`; `transient` is set when the
    /// provider was unavailable rather than the audio unreadable.
    async fn transcribe(&self, audio: &AudioClip) -> Result<Transcript>;

    /// Provider name for logging
    fn provider_name(&self) -> &str;
}

/// Voice selection for synthesis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceStyle {
    /// Provider specific voice identifier
    #[serde(default)]
    pub voice_id: Option<String>,
    /// Speaking rate multiplier
    #[serde(default = "default_speed")]
    pub speed: f32,
}

fn default_speed() -> f32 {
    1.0
}

impl Default for VoiceStyle {
    fn default() -> Self {
        Self {
            voice_id: None,
            speed: default_speed(),
        }
    }
}

/// Text-to-Speech interface
///
/// Implementations:
/// - `ElevenLabsTts` - ElevenLabs REST API
/// - `EdgeTts` / `LocalTts` - sidecar services
/// - `GttsTts` - Google Translate TTS endpoint
#[async_trait]
pub trait TextToSpeech: Send + Sync + 'static {
    /// Synthesize text to encoded audio
    async fn synthesize(&self, text: &str, style: Option<&VoiceStyle>) -> Result<AudioClip>;

    /// Provider name for logging
    fn provider_name(&self) -> &str;
}
