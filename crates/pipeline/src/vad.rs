//! Energy voice activity detection and utterance segmentation
//!
//! Streaming audio arrives as 16-bit little-endian mono PCM in chunks of any
//! size. Chunks are cut into fixed frames; a frame whose RMS exceeds the
//! threshold is speech. A segment opens on the first speech frame and closes
//! after `padding_ms` of trailing silence, or when it reaches the length cap.
//! Segments with less than `min_speech_ms` of voiced frames are dropped.

use std::io::Cursor;

use coach_config::VadSettings;

use crate::PipelineError;

/// Segmenter state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VadState {
    #[default]
    Silence,
    Speech,
}

/// What a chunk of audio produced
#[derive(Debug, Clone, PartialEq)]
pub enum VadEvent {
    SpeechStarted,
    /// Complete utterance as raw PCM, trailing silence included
    Segment(Vec<u8>),
    /// Speech too short to keep
    Discarded { duration_ms: u32 },
}

#[derive(Debug, Clone)]
pub struct VadConfig {
    pub sample_rate: u32,
    pub energy_threshold: f32,
    pub frame_ms: u32,
    pub padding_ms: u32,
    pub min_speech_ms: u32,
    pub max_segment_ms: u32,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self::from(&VadSettings::default())
    }
}

impl From<&VadSettings> for VadConfig {
    fn from(settings: &VadSettings) -> Self {
        Self {
            sample_rate: settings.sample_rate,
            energy_threshold: settings.energy_threshold,
            frame_ms: settings.frame_ms.max(1),
            padding_ms: settings.padding_ms,
            min_speech_ms: settings.min_speech_ms,
            max_segment_ms: settings.max_segment_secs.saturating_mul(1000),
        }
    }
}

impl VadConfig {
    fn frame_bytes(&self) -> usize {
        (self.sample_rate as usize * self.frame_ms as usize / 1000).max(1) * 2
    }

    fn padding_frames(&self) -> u32 {
        (self.padding_ms / self.frame_ms).max(1)
    }
}

/// RMS of a 16-bit PCM frame, scaled to 0-1
pub fn frame_energy(frame: &[u8]) -> f32 {
    let samples = frame.len() / 2;
    if samples == 0 {
        return 0.0;
    }
    let sum: f32 = frame
        .chunks_exact(2)
        .map(|b| {
            let s = i16::from_le_bytes([b[0], b[1]]) as f32 / 32768.0;
            s * s
        })
        .sum();
    (sum / samples as f32).sqrt()
}

pub struct VadSegmenter {
    config: VadConfig,
    state: VadState,
    /// Bytes short of a full frame
    pending: Vec<u8>,
    speech: Vec<u8>,
    /// Frames in the open segment, silence included
    speech_frames: u32,
    voiced_frames: u32,
    silence_frames: u32,
}

impl VadSegmenter {
    pub fn new(config: VadConfig) -> Self {
        Self {
            config,
            state: VadState::Silence,
            pending: Vec::new(),
            speech: Vec::new(),
            speech_frames: 0,
            voiced_frames: 0,
            silence_frames: 0,
        }
    }

    pub fn state(&self) -> VadState {
        self.state
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    /// Feed a chunk of PCM; events come back in stream order
    pub fn push(&mut self, pcm: &[u8]) -> Vec<VadEvent> {
        let frame_bytes = self.config.frame_bytes();
        self.pending.extend_from_slice(pcm);

        let mut events = Vec::new();
        let mut offset = 0;
        while self.pending.len() - offset >= frame_bytes {
            let frame = self.pending[offset..offset + frame_bytes].to_vec();
            offset += frame_bytes;
            if let Some(event) = self.process_frame(&frame) {
                events.push(event);
            }
        }
        self.pending.drain(..offset);
        events
    }

    /// Drop buffered audio and return to silence
    pub fn reset(&mut self) {
        self.state = VadState::Silence;
        self.pending.clear();
        self.clear_segment();
    }

    fn process_frame(&mut self, frame: &[u8]) -> Option<VadEvent> {
        let is_speech = frame_energy(frame) > self.config.energy_threshold;

        match (self.state, is_speech) {
            (VadState::Silence, false) => None,
            (VadState::Silence, true) => {
                self.state = VadState::Speech;
                self.speech.extend_from_slice(frame);
                self.speech_frames = 1;
                self.voiced_frames = 1;
                self.silence_frames = 0;
                tracing::trace!("Speech started");
                Some(VadEvent::SpeechStarted)
            },
            (VadState::Speech, speech) => {
                self.speech.extend_from_slice(frame);
                self.speech_frames += 1;
                if speech {
                    self.voiced_frames += 1;
                    self.silence_frames = 0;
                } else {
                    self.silence_frames += 1;
                }

                let duration_ms = self.speech_frames * self.config.frame_ms;
                if self.silence_frames >= self.config.padding_frames()
                    || duration_ms >= self.config.max_segment_ms
                {
                    Some(self.close_segment())
                } else {
                    None
                }
            },
        }
    }

    fn close_segment(&mut self) -> VadEvent {
        self.state = VadState::Silence;
        let duration_ms = self.voiced_frames * self.config.frame_ms;
        let segment = std::mem::take(&mut self.speech);
        self.clear_segment();

        if duration_ms >= self.config.min_speech_ms {
            tracing::debug!(duration_ms, "Speech segment complete");
            VadEvent::Segment(segment)
        } else {
            tracing::debug!(duration_ms, "Speech too short, discarded");
            VadEvent::Discarded { duration_ms }
        }
    }

    fn clear_segment(&mut self) {
        self.speech.clear();
        self.speech_frames = 0;
        self.voiced_frames = 0;
        self.silence_frames = 0;
    }
}

/// Wrap raw 16-bit mono PCM in a WAV container
pub fn pcm_to_wav(pcm: &[u8], sample_rate: u32) -> Result<Vec<u8>, PipelineError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::with_capacity(pcm.len() + 44));
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| PipelineError::Audio(e.to_string()))?;
        for b in pcm.chunks_exact(2) {
            writer
                .write_sample(i16::from_le_bytes([b[0], b[1]]))
                .map_err(|e| PipelineError::Audio(e.to_string()))?;
        }
        writer
            .finalize()
            .map_err(|e| PipelineError::Audio(e.to_string()))?;
    }
    Ok(cursor.into_inner())
}
