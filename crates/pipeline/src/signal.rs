//! WAV signal summary
//!
//! Reduces a recording to per-frame RMS energy and a zero-crossing pitch
//! estimate for voiced frames. Channels are averaged to mono; integer
//! samples are scaled to [-1, 1].

use std::io::{Cursor, Read};
use std::path::Path;

use hound::{SampleFormat, WavReader};

use coach_core::SignalSummary;

use crate::PipelineError;

/// Samples per analysis frame
pub const FRAME_HOP: usize = 512;

/// Frames quieter than this carry no pitch estimate
const VOICED_RMS: f32 = 0.02;

/// Plausible range of a speaking voice's fundamental, Hz
const PITCH_RANGE: (f32, f32) = (60.0, 500.0);

/// Summarize WAV bytes
pub fn summarize_wav(bytes: &[u8]) -> Result<SignalSummary, PipelineError> {
    summarize_reader(Cursor::new(bytes))
}

/// Summarize a WAV file on disk
///
/// Blocking; run it on a blocking thread from async code.
pub fn summarize_wav_file(path: &Path) -> Result<SignalSummary, PipelineError> {
    let file = std::fs::File::open(path)?;
    summarize_reader(std::io::BufReader::new(file))
}

fn summarize_reader<R: Read>(reader: R) -> Result<SignalSummary, PipelineError> {
    let mut reader =
        WavReader::new(reader).map_err(|e| PipelineError::Audio(format!("invalid WAV: {}", e)))?;
    let spec = reader.spec();
    if spec.sample_rate == 0 || spec.channels == 0 {
        return Err(PipelineError::Audio("WAV header has no samples".to_string()));
    }

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(|e| PipelineError::Audio(e.to_string()))?,
        SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
                .map_err(|e| PipelineError::Audio(e.to_string()))?
        },
    };

    let channels = spec.channels as usize;
    let mono: Vec<f32> = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect();

    Ok(summarize_samples(&mono, spec.sample_rate))
}

/// Summarize mono samples in [-1, 1]
pub fn summarize_samples(samples: &[f32], sample_rate: u32) -> SignalSummary {
    let frame_seconds = FRAME_HOP as f64 / sample_rate as f64;
    let mut frame_rms = Vec::with_capacity(samples.len() / FRAME_HOP + 1);
    let mut voiced_pitch_hz = Vec::new();

    for frame in samples.chunks(FRAME_HOP) {
        let rms = (frame.iter().map(|s| s * s).sum::<f32>() / frame.len() as f32).sqrt();
        frame_rms.push(rms);

        if rms < VOICED_RMS || frame.len() < FRAME_HOP / 2 {
            continue;
        }
        let crossings = frame
            .windows(2)
            .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
            .count();
        let seconds = frame.len() as f32 / sample_rate as f32;
        let pitch = crossings as f32 / 2.0 / seconds;
        if (PITCH_RANGE.0..=PITCH_RANGE.1).contains(&pitch) {
            voiced_pitch_hz.push(pitch);
        }
    }

    SignalSummary {
        duration_seconds: samples.len() as f64 / sample_rate as f64,
        frame_seconds,
        frame_rms,
        voiced_pitch_hz,
    }
}
