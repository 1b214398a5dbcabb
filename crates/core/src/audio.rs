//! Audio payloads and signal summaries

use serde::{Deserialize, Serialize};

/// Container format of an audio payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Wav,
    Mp3,
    Webm,
    Ogg,
}

impl AudioFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Mp3 => "mp3",
            Self::Webm => "webm",
            Self::Ogg => "ogg",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Wav => "audio/wav",
            Self::Mp3 => "audio/mpeg",
            Self::Webm => "audio/webm",
            Self::Ogg => "audio/ogg",
        }
    }

    /// Guess from a MIME type or file name
    pub fn detect(content_type: Option<&str>, file_name: Option<&str>) -> Self {
        let hint = content_type
            .or(file_name)
            .unwrap_or_default()
            .to_lowercase();
        if hint.contains("mpeg") || hint.ends_with(".mp3") || hint.contains("mp3") {
            Self::Mp3
        } else if hint.contains("webm") {
            Self::Webm
        } else if hint.contains("ogg") {
            Self::Ogg
        } else {
            Self::Wav
        }
    }
}

/// Encoded audio bytes
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub data: Vec<u8>,
    pub format: AudioFormat,
    /// Known for PCM payloads
    pub sample_rate: Option<u32>,
}

impl AudioClip {
    pub fn new(data: Vec<u8>, format: AudioFormat) -> Self {
        Self {
            data,
            format,
            sample_rate: None,
        }
    }

    pub fn wav(data: Vec<u8>) -> Self {
        Self::new(data, AudioFormat::Wav)
    }

    pub fn mp3(data: Vec<u8>) -> Self {
        Self::new(data, AudioFormat::Mp3)
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = Some(sample_rate);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }
}

/// Per-frame energy and pitch proxy of a mono recording
///
/// Produced by the pipeline from the extracted WAV and consumed by the
/// metrics aggregator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalSummary {
    pub duration_seconds: f64,
    /// Seconds covered by one entry of `frame_rms`
    pub frame_seconds: f64,
    pub frame_rms: Vec<f32>,
    /// Estimated fundamental frequency of voiced frames, Hz
    pub voiced_pitch_hz: Vec<f32>,
}

impl SignalSummary {
    pub fn is_empty(&self) -> bool {
        self.frame_rms.is_empty()
    }
}
