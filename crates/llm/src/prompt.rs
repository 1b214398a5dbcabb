//! Prompt building and feedback parsing
//!
//! Builds the message list for coaching turns and the evaluation prompt,
//! and turns the evaluator's reply back into [`AIFeedback`].

use std::borrow::Cow;
use std::fmt::{self, Write as _};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use coach_core::metrics::clamp_score;
use coach_core::{AIFeedback, ConversationMessage, MessageRole, MetricsSummary};

pub const CONVERSATION_SYSTEM_PROMPT: &str = "You are a supportive communication coach helping \
people become more confident speakers. Keep replies short and conversational, stay encouraging, \
ask a follow-up question when it helps, and offer one concrete, actionable tip at a time.";

pub const EVALUATION_SYSTEM_PROMPT: &str = "You are an expert communication evaluator. Review \
the transcript and delivery metrics you are given and assess clarity and structure, pacing and \
delivery, and body language. Be honest and encouraging, score from 1 to 10, and answer with a \
single JSON object only.";

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

impl From<MessageRole> for Role {
    fn from(role: MessageRole) -> Self {
        match role {
            MessageRole::User => Role::User,
            MessageRole::Assistant => Role::Assistant,
            MessageRole::System => Role::System,
        }
    }
}

/// Chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Prompt builder
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    messages: Vec<Message>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a system message; blank prompts are skipped
    pub fn system_prompt(mut self, prompt: &str) -> Self {
        if !prompt.trim().is_empty() {
            self.messages.push(Message::system(prompt));
        }
        self
    }

    /// Add prior conversation turns in order
    pub fn with_history(mut self, history: &[ConversationMessage]) -> Self {
        self.messages.extend(history.iter().map(|m| Message {
            role: m.role.into(),
            content: m.content.clone(),
        }));
        self
    }

    /// Add current user message
    pub fn user_message(mut self, message: &str) -> Self {
        self.messages.push(Message::user(message));
        self
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn build(self) -> Vec<Message> {
        self.messages
    }
}

/// Cut `text` to at most `max` grapheme clusters
pub fn truncate_graphemes(text: &str, max: usize) -> Cow<'_, str> {
    match text.grapheme_indices(true).nth(max) {
        Some((byte_idx, _)) => Cow::Owned(format!("{} [...]", &text[..byte_idx])),
        None => Cow::Borrowed(text),
    }
}

/// Evaluation request listing transcript and metrics
pub fn evaluation_prompt(transcript: &str, metrics: &MetricsSummary, max_chars: usize) -> String {
    let speech = &metrics.speech;
    let fillers = if speech.filler_words.is_empty() {
        "none".to_string()
    } else {
        speech
            .filler_words
            .iter()
            .map(|(word, count)| format!("{} x{}", word, count))
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut prompt = String::new();
    let _ = write!(
        prompt,
        "Analyze this communication performance and give detailed feedback.\n\n\
         ## Transcript\n{}\n\n\
         ## Speech Metrics\n\
         - Words per minute: {} (ideal: 120-160)\n\
         - Total words: {}\n\
         - Speaking time: {} seconds\n\
         - Pauses: {} (average {}s)\n\
         - Filler words: {} ({}), {}% of words\n\
         - Clarity score: {}/10\n\
         - Volume variation: {}\n\
         - Pitch variation: {}\n",
        truncate_graphemes(transcript, max_chars),
        speech.words_per_minute,
        speech.total_words,
        speech.speaking_time_seconds,
        speech.pause_count,
        speech.average_pause_duration,
        speech.filler_words_count,
        fillers,
        speech.filler_rate,
        speech.clarity_score,
        speech.volume_variation,
        speech.pitch_variation,
    );

    if let Some(pose) = &metrics.pose {
        let _ = write!(
            prompt,
            "\n## Body Language Metrics\n\
             - Posture score: {}/10\n\
             - Gestures: {}\n\
             - Movement smoothness: {}/10\n\
             - Eye contact: {}/10\n\
             - Body openness: {}/10\n",
            pose.posture_score,
            pose.gesture_count,
            pose.movement_smoothness,
            pose.eye_contact_score,
            pose.body_openness_score,
        );
        if pose.low_confidence {
            prompt.push_str(
                "- Note: body tracking was unreliable for this video; weigh these lightly\n",
            );
        }
    }

    prompt.push_str(
        "\nRespond with a JSON object with these keys:\n\
         - overall_score (number, 1-10)\n\
         - strengths (array of 2-3 strings)\n\
         - areas_for_improvement (array of 2-3 strings)\n\
         - specific_recommendations (array of 3-5 actionable strings)\n\
         - detailed_feedback (string, 2-3 paragraphs)\n",
    );
    prompt
}

static FENCED_JSON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").expect("valid regex"));

#[derive(Debug, Deserialize)]
struct RawFeedback {
    overall_score: serde_json::Value,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    areas_for_improvement: Vec<String>,
    #[serde(default)]
    specific_recommendations: Vec<String>,
    #[serde(default)]
    detailed_feedback: String,
}

fn score_value(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn candidates(raw: &str) -> Vec<&str> {
    let mut found = Vec::new();
    if let Some(caps) = FENCED_JSON.captures(raw) {
        if let Some(m) = caps.get(1) {
            found.push(m.as_str());
        }
    }
    found.push(raw.trim());
    if let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}')) {
        if start < end {
            found.push(&raw[start..=end]);
        }
    }
    found
}

/// Parse the evaluator's reply
///
/// Accepts a bare JSON object, one inside a fenced code block, or one
/// embedded in prose. Anything else yields [`AIFeedback::fallback`] with the
/// raw reply as the narrative.
pub fn parse_feedback(raw: &str) -> AIFeedback {
    for candidate in candidates(raw) {
        let Ok(parsed) = serde_json::from_str::<RawFeedback>(candidate) else {
            continue;
        };
        let Some(score) = score_value(&parsed.overall_score) else {
            continue;
        };
        return AIFeedback {
            overall_score: clamp_score(score),
            strengths: parsed.strengths,
            areas_for_improvement: parsed.areas_for_improvement,
            specific_recommendations: parsed.specific_recommendations,
            detailed_feedback: parsed.detailed_feedback,
        };
    }

    tracing::warn!(len = raw.len(), "Evaluator reply was not valid feedback JSON");
    AIFeedback::fallback(raw)
}
