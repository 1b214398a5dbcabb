//! Envelope-driven facial animation
//!
//! Jaw opening follows the frame energy of the speech, with a slow smile
//! drift and periodic blinks. Needs WAV input; runs without a network.

use async_trait::async_trait;

use coach_core::animation::blendshape;
use coach_core::{AudioClip, AudioFormat, AvatarAnimator, FaceAnimation, Result, BLENDSHAPE_COUNT};

use crate::signal::summarize_wav;
use crate::{Capability, PipelineError};

const PROVIDER: &str = "procedural";

/// Frame RMS that opens the jaw fully
const FULL_OPEN_RMS: f32 = 0.25;

const BLINK_PERIOD_SECS: f64 = 3.5;
const BLINK_SECS: f64 = 0.15;

#[derive(Debug, Clone)]
pub struct ProceduralConfig {
    pub fps: u32,
}

impl Default for ProceduralConfig {
    fn default() -> Self {
        Self { fps: 60 }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProceduralAvatar {
    config: ProceduralConfig,
}

impl ProceduralAvatar {
    pub fn new(config: ProceduralConfig) -> Self {
        Self { config }
    }

    fn render(&self, wav: &[u8]) -> std::result::Result<FaceAnimation, PipelineError> {
        let summary = summarize_wav(wav)?;
        let fps = self.config.fps.max(1);
        let count = (summary.duration_seconds * fps as f64).round() as usize;

        let frames = (0..count)
            .map(|i| {
                let t = i as f64 / fps as f64;
                let rms = if summary.frame_seconds > 0.0 {
                    let index = (t / summary.frame_seconds) as usize;
                    summary.frame_rms.get(index).copied().unwrap_or(0.0)
                } else {
                    0.0
                };

                let mut frame = vec![0.0_f32; BLENDSHAPE_COUNT];
                frame[blendshape::JAW_OPEN] = (rms / FULL_OPEN_RMS).clamp(0.0, 1.0);
                frame[blendshape::MOUTH_SMILE] = (0.15 * (1.0 + (t * 0.5).sin())) as f32;
                if t % BLINK_PERIOD_SECS < BLINK_SECS {
                    frame[blendshape::EYE_BLINK] = 1.0;
                }
                frame
            })
            .collect();

        Ok(FaceAnimation::from_frames(PROVIDER, fps, frames))
    }
}

#[async_trait]
impl AvatarAnimator for ProceduralAvatar {
    async fn animate(&self, audio: &AudioClip) -> Result<FaceAnimation> {
        if audio.format != AudioFormat::Wav {
            return Err(coach_core::Error::Validation(format!(
                "procedural animation needs WAV audio, got {}",
                audio.format.extension()
            )));
        }

        let this = self.clone();
        let data = audio.data.clone();
        tokio::task::spawn_blocking(move || this.render(&data))
            .await
            .map_err(|e| coach_core::Error::Animation(format!("render task failed: {}", e)))?
            .map_err(|e| e.into_core(Capability::Avatar))
    }

    fn provider_name(&self) -> &str {
        PROVIDER
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Half a second of silence then half a second of loud tone
    fn silence_then_tone() -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for i in 0..16_000 {
                let sample = if i < 8_000 {
                    0.0
                } else {
                    0.5 * (2.0 * std::f32::consts::PI * 200.0 * i as f32 / 16_000.0).sin()
                };
                writer.write_sample((sample * i16::MAX as f32) as i16).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[tokio::test]
    async fn test_jaw_follows_energy() {
        let avatar = ProceduralAvatar::new(ProceduralConfig { fps: 30 });
        let animation = avatar
            .animate(&AudioClip::wav(silence_then_tone()))
            .await
            .unwrap();

        assert_eq!(animation.fps, 30);
        assert_eq!(animation.frame_count(), 30);
        assert_eq!(animation.model, "procedural");
        assert!(animation.frames.iter().all(|f| f.len() == BLENDSHAPE_COUNT));
        assert_eq!(animation.frames[5][blendshape::JAW_OPEN], 0.0);
        assert!(animation.frames[25][blendshape::JAW_OPEN] > 0.5);
        // blink at the start of the clip
        assert_eq!(animation.frames[0][blendshape::EYE_BLINK], 1.0);
    }

    #[tokio::test]
    async fn test_compressed_audio_rejected() {
        let err = ProceduralAvatar::default()
            .animate(&AudioClip::mp3(vec![0xFF, 0xFB, 0x90]))
            .await
            .unwrap_err();
        assert!(matches!(err, coach_core::Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_garbage_wav_is_animation_error() {
        let err = ProceduralAvatar::default()
            .animate(&AudioClip::wav(b"not a wav".to_vec()))
            .await
            .unwrap_err();
        assert!(matches!(err, coach_core::Error::Animation(_)));
    }
}
