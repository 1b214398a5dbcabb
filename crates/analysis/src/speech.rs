//! Speech delivery metrics

use serde::{Deserialize, Serialize};

use coach_core::metrics::{clamp_score, round_to};
use coach_core::{SignalSummary, SpeechMetrics, Transcript, WordTiming};

use crate::filler::{count_fillers, tokenize};
use crate::stats::coefficient_of_variation;

/// Variation reported when the signal is missing or silent
const NEUTRAL_VARIATION: f64 = 0.5;

/// Thresholds for speech aggregation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechAnalysisConfig {
    /// Minimum gap between words, or run of silent frames, counted as a pause
    pub pause_threshold_secs: f64,
    /// Frame RMS at or below which audio is silent
    pub silence_rms_threshold: f32,
}

impl Default for SpeechAnalysisConfig {
    fn default() -> Self {
        Self {
            pause_threshold_secs: 0.5,
            silence_rms_threshold: 0.02,
        }
    }
}

/// Speaking time and pauses derived from timings or signal
#[derive(Debug, Default)]
struct Timing {
    speaking_time: f64,
    pauses: Vec<f64>,
}

/// Aggregate speech metrics
///
/// Timing comes from word timings when the transcript has them, otherwise
/// from the signal's silent frames, otherwise from the signal duration.
pub fn analyze_speech(
    transcript: &Transcript,
    signal: Option<&SignalSummary>,
    config: &SpeechAnalysisConfig,
) -> SpeechMetrics {
    let tokens = tokenize(&transcript.text);
    let total_words = tokens.len();
    let fillers = count_fillers(&tokens);

    let timing = if transcript.words.len() >= 2 {
        timing_from_words(&transcript.words, config.pause_threshold_secs)
    } else if let Some(signal) = signal.filter(|s| !s.is_empty()) {
        timing_from_signal(signal, config)
    } else {
        Timing {
            speaking_time: signal.map(|s| s.duration_seconds).unwrap_or(0.0),
            pauses: Vec::new(),
        }
    };

    let wpm = if timing.speaking_time > 0.0 {
        total_words as f64 / (timing.speaking_time / 60.0)
    } else {
        0.0
    };

    let pause_count = timing.pauses.len();
    let average_pause = if pause_count > 0 {
        timing.pauses.iter().sum::<f64>() / pause_count as f64
    } else {
        0.0
    };

    let filler_rate = if total_words > 0 {
        fillers.total as f64 / total_words as f64 * 100.0
    } else {
        0.0
    };

    let (volume_variation, pitch_variation) = match signal {
        Some(signal) => (volume_variation(signal), pitch_variation(signal)),
        None => (NEUTRAL_VARIATION, NEUTRAL_VARIATION),
    };

    let clarity = clarity_score(
        wpm,
        fillers.total,
        total_words,
        pause_count,
        timing.speaking_time,
    );

    tracing::debug!(
        total_words,
        wpm,
        fillers = fillers.total,
        pauses = pause_count,
        "Speech metrics aggregated"
    );

    SpeechMetrics {
        words_per_minute: round_to(wpm, 1),
        total_words,
        speaking_time_seconds: round_to(timing.speaking_time, 1),
        pause_count,
        average_pause_duration: round_to(average_pause, 2),
        filler_words_count: fillers.total,
        filler_words: fillers.breakdown,
        filler_rate: round_to(filler_rate, 2),
        clarity_score: round_to(clarity, 1),
        volume_variation: round_to(volume_variation, 2),
        pitch_variation: round_to(pitch_variation, 2),
    }
}

/// Clarity on the 0-10 scale
///
/// Starts at 10 and loses points for pace outside 100-180 WPM, for the
/// share of filler words, and for more than 20 pauses per minute.
pub fn clarity_score(
    wpm: f64,
    filler_count: usize,
    total_words: usize,
    pause_count: usize,
    speaking_time_secs: f64,
) -> f64 {
    let mut score = 10.0;

    if wpm < 100.0 {
        score -= (100.0 - wpm) / 20.0;
    } else if wpm > 180.0 {
        score -= (wpm - 180.0) / 20.0;
    }

    if total_words > 0 {
        score -= filler_count as f64 / total_words as f64 * 20.0;
    }

    if speaking_time_secs > 0.0 {
        let per_minute = pause_count as f64 / speaking_time_secs * 60.0;
        if per_minute > 20.0 {
            score -= (per_minute - 20.0) / 10.0;
        }
    }

    clamp_score(score)
}

fn timing_from_words(words: &[WordTiming], threshold: f64) -> Timing {
    let pauses: Vec<f64> = words
        .windows(2)
        .map(|pair| pair[1].start - pair[0].end)
        .filter(|gap| *gap > threshold)
        .collect();

    let span = match (words.first(), words.last()) {
        (Some(first), Some(last)) => (last.end - first.start).max(0.0),
        _ => 0.0,
    };

    Timing {
        speaking_time: (span - pauses.iter().sum::<f64>()).max(0.0),
        pauses,
    }
}

fn timing_from_signal(signal: &SignalSummary, config: &SpeechAnalysisConfig) -> Timing {
    let frame = signal.frame_seconds;
    let mut pauses = Vec::new();
    let mut speech_frames = 0usize;
    let mut silent_run = 0usize;
    let mut heard_speech = false;

    for &rms in &signal.frame_rms {
        if rms > config.silence_rms_threshold {
            // leading silence is not a pause
            if heard_speech && silent_run > 0 {
                let duration = silent_run as f64 * frame;
                if duration >= config.pause_threshold_secs {
                    pauses.push(duration);
                }
            }
            silent_run = 0;
            speech_frames += 1;
            heard_speech = true;
        } else {
            silent_run += 1;
        }
    }

    Timing {
        speaking_time: speech_frames as f64 * frame,
        pauses,
    }
}

fn volume_variation(signal: &SignalSummary) -> f64 {
    let rms: Vec<f64> = signal.frame_rms.iter().map(|v| *v as f64).collect();
    coefficient_of_variation(&rms)
        .map(|cv| (cv / 2.0).min(1.0))
        .unwrap_or(NEUTRAL_VARIATION)
}

fn pitch_variation(signal: &SignalSummary) -> f64 {
    let pitch: Vec<f64> = signal.voiced_pitch_hz.iter().map(|v| *v as f64).collect();
    coefficient_of_variation(&pitch)
        .map(|cv| (cv / 0.5).min(1.0))
        .unwrap_or(NEUTRAL_VARIATION)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Hello everyone, um, I'm excited to be here today. \
                          Like, we've been working hard on this project for months now.";

    fn word(w: &str, start: f64, end: f64) -> WordTiming {
        WordTiming {
            word: w.to_string(),
            start,
            end,
        }
    }

    #[test]
    fn test_filler_rate_scenario() {
        let metrics = analyze_speech(
            &Transcript::new(SAMPLE),
            None,
            &SpeechAnalysisConfig::default(),
        );
        assert_eq!(metrics.total_words, 20);
        assert_eq!(metrics.filler_words_count, 2);
        assert_eq!(metrics.filler_rate, 10.0);
        assert_eq!(metrics.filler_words.get("um"), Some(&1));
        assert_eq!(metrics.filler_words.get("like"), Some(&1));
    }

    #[test]
    fn test_zero_fillers_and_empty_transcript() {
        let config = SpeechAnalysisConfig::default();
        let clean = analyze_speech(&Transcript::new("Thank you all for coming"), None, &config);
        assert_eq!(clean.filler_words_count, 0);
        assert_eq!(clean.filler_rate, 0.0);

        let empty = analyze_speech(&Transcript::new(""), None, &config);
        assert_eq!(empty.total_words, 0);
        assert_eq!(empty.words_per_minute, 0.0);
        assert_eq!(empty.volume_variation, 0.5);
    }

    #[test]
    fn test_pauses_from_word_gaps() {
        let transcript = Transcript::new("one two three four").with_words(vec![
            word("one", 0.0, 0.5),
            word("two", 0.6, 1.0),
            // 1.0 second gap
            word("three", 2.0, 2.5),
            // exactly at threshold, not a pause
            word("four", 3.0, 3.5),
        ]);
        let metrics = analyze_speech(&transcript, None, &SpeechAnalysisConfig::default());

        assert_eq!(metrics.pause_count, 1);
        assert_eq!(metrics.average_pause_duration, 1.0);
        // 3.5 s span minus the 1.0 s pause
        assert_eq!(metrics.speaking_time_seconds, 2.5);
        assert_eq!(metrics.words_per_minute, 96.0);
    }

    #[test]
    fn test_pauses_from_signal() {
        let signal = SignalSummary {
            duration_seconds: 3.0,
            frame_seconds: 0.1,
            // silence, speech, 0.6 s silence, speech, 0.2 s silence, speech, trailing silence
            frame_rms: [
                vec![0.0; 5],
                vec![0.2; 10],
                vec![0.01; 6],
                vec![0.2; 5],
                vec![0.0; 2],
                vec![0.1; 2],
                vec![0.0; 3],
            ]
            .concat(),
            voiced_pitch_hz: vec![],
        };
        let metrics = analyze_speech(
            &Transcript::new("a b c d"),
            Some(&signal),
            &SpeechAnalysisConfig::default(),
        );
        assert_eq!(metrics.pause_count, 1);
        assert_eq!(metrics.speaking_time_seconds, 1.7);
        assert_eq!(metrics.pitch_variation, 0.5);
    }

    #[test]
    fn test_clarity_monotonic_in_fillers_and_pauses() {
        let base = clarity_score(140.0, 0, 100, 0, 60.0);
        let with_fillers = clarity_score(140.0, 10, 100, 0, 60.0);
        let with_pauses = clarity_score(140.0, 0, 100, 40, 60.0);
        assert_eq!(base, 10.0);
        assert!(with_fillers < base);
        assert!(with_pauses < base);
        assert_eq!(clarity_score(0.0, 100, 100, 500, 10.0), 0.0);
    }

    #[test]
    fn test_deterministic() {
        let config = SpeechAnalysisConfig::default();
        let transcript = Transcript::new(SAMPLE);
        assert_eq!(
            analyze_speech(&transcript, None, &config),
            analyze_speech(&transcript, None, &config)
        );
    }
}
