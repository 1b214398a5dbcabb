//! Language model adapter
//!
//! Bridges the [`LlmBackend`] trait to the core `LanguageModel` trait,
//! adding prompt construction, retry and feedback parsing.

use std::sync::Arc;

use async_trait::async_trait;

use coach_core::{
    AIFeedback, ConversationMessage, LanguageModel, MetricsSummary, Result, RetryPolicy,
};

use crate::backend::LlmBackend;
use crate::prompt::{evaluation_prompt, parse_feedback, PromptBuilder, EVALUATION_SYSTEM_PROMPT};

/// Transcript budget, in grapheme clusters, for evaluation prompts
pub const DEFAULT_MAX_TRANSCRIPT_CHARS: usize = 12_000;

/// Adapter that wraps an LlmBackend to implement the core LanguageModel trait.
pub struct LanguageModelAdapter {
    backend: Arc<dyn LlmBackend>,
    retry: RetryPolicy,
    max_transcript_chars: usize,
}

impl LanguageModelAdapter {
    pub fn new<B: LlmBackend + 'static>(backend: B) -> Self {
        Self::from_arc(Arc::new(backend))
    }

    pub fn from_arc(backend: Arc<dyn LlmBackend>) -> Self {
        Self {
            backend,
            retry: RetryPolicy::default(),
            max_transcript_chars: DEFAULT_MAX_TRANSCRIPT_CHARS,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_transcript_chars(mut self, max: usize) -> Self {
        self.max_transcript_chars = max;
        self
    }

    async fn complete(&self, operation: &str, messages: &[crate::Message]) -> Result<String> {
        let backend = &self.backend;
        let result = self
            .retry
            .run(operation, move || async move {
                backend
                    .generate(messages)
                    .await
                    .map_err(coach_core::Error::from)
            })
            .await?;

        tracing::debug!(
            provider = backend.provider_name(),
            operation,
            tokens = result.tokens,
            total_time_ms = result.total_time_ms,
            "LLM call completed"
        );
        Ok(result.text.trim().to_string())
    }
}

#[async_trait]
impl LanguageModel for LanguageModelAdapter {
    async fn converse(
        &self,
        history: &[ConversationMessage],
        system_prompt: &str,
        user_input: &str,
    ) -> Result<String> {
        let messages = PromptBuilder::new()
            .system_prompt(system_prompt)
            .with_history(history)
            .user_message(user_input)
            .build();
        self.complete("llm.converse", &messages).await
    }

    async fn evaluate(&self, transcript: &str, metrics: &MetricsSummary) -> Result<AIFeedback> {
        let prompt = evaluation_prompt(transcript, metrics, self.max_transcript_chars);
        let messages = PromptBuilder::new()
            .system_prompt(EVALUATION_SYSTEM_PROMPT)
            .user_message(&prompt)
            .build();
        let reply = self.complete("llm.evaluate", &messages).await?;
        Ok(parse_feedback(&reply))
    }

    fn provider_name(&self) -> &str {
        self.backend.provider_name()
    }

    fn model_name(&self) -> &str {
        self.backend.model_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{FinishReason, GenerationResult};
    use crate::prompt::{Message, Role};
    use crate::LlmError;
    use coach_core::SpeechMetrics;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Scripted backend that records the messages it receives
    struct Recorder {
        replies: Mutex<VecDeque<std::result::Result<String, LlmError>>>,
        seen: Mutex<Vec<Vec<Message>>>,
    }

    impl Recorder {
        fn new(replies: Vec<std::result::Result<String, LlmError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LlmBackend for Recorder {
        async fn generate(
            &self,
            messages: &[Message],
        ) -> std::result::Result<GenerationResult, LlmError> {
            self.seen.lock().unwrap().push(messages.to_vec());
            let next = self.replies.lock().unwrap().pop_front();
            let text = next.unwrap_or_else(|| Err(LlmError::Api("script exhausted".into())))?;
            Ok(GenerationResult {
                text,
                tokens: 1,
                total_time_ms: 1,
                finish_reason: FinishReason::Stop,
            })
        }

        fn model_name(&self) -> &str {
            "scripted"
        }

        fn provider_name(&self) -> &str {
            "mock"
        }
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy::default()
            .with_initial_backoff(Duration::from_millis(1))
            .without_jitter()
    }

    fn metrics() -> MetricsSummary {
        MetricsSummary {
            speech: SpeechMetrics {
                words_per_minute: 130.0,
                total_words: 40,
                speaking_time_seconds: 18.5,
                pause_count: 2,
                average_pause_duration: 0.7,
                filler_words_count: 0,
                filler_words: Default::default(),
                filler_rate: 0.0,
                clarity_score: 9.5,
                volume_variation: 0.4,
                pitch_variation: 0.5,
            },
            pose: None,
        }
    }

    #[tokio::test]
    async fn test_converse_sends_history_in_order() {
        let backend = Arc::new(Recorder::new(vec![Ok("  Great question!  ".into())]));
        let adapter = LanguageModelAdapter::from_arc(backend.clone());

        let history = vec![
            ConversationMessage::user("Hi"),
            ConversationMessage::assistant("Hello"),
        ];
        let reply = adapter
            .converse(&history, "Coach kindly", "How do I open a talk?")
            .await
            .unwrap();
        assert_eq!(reply, "Great question!");

        let seen = backend.seen.lock().unwrap();
        let roles: Vec<Role> = seen[0].iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::User]
        );
    }

    #[tokio::test]
    async fn test_rate_limit_retried_then_succeeds() {
        let backend = Arc::new(Recorder::new(vec![
            Err(LlmError::RateLimited("429".into())),
            Ok("ok".into()),
        ]));
        let adapter = LanguageModelAdapter::from_arc(backend.clone()).with_retry(fast_retry());
        assert_eq!(adapter.converse(&[], "", "hi").await.unwrap(), "ok");
        assert_eq!(backend.seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_auth_failure_not_retried() {
        let backend = Arc::new(Recorder::new(vec![
            Err(LlmError::AuthInvalid("401".into())),
            Ok("never".into()),
        ]));
        let adapter = LanguageModelAdapter::from_arc(backend.clone()).with_retry(fast_retry());
        let err = adapter.converse(&[], "", "hi").await.unwrap_err();
        assert!(matches!(
            err,
            coach_core::Error::Llm {
                kind: coach_core::LlmErrorKind::AuthInvalid,
                ..
            }
        ));
        assert_eq!(backend.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_evaluate_parses_feedback() {
        let backend = Arc::new(Recorder::new(vec![Ok(
            "```json\n{\"overall_score\": 8, \"strengths\": [\"Pace\"]}\n```".into(),
        )]));
        let adapter = LanguageModelAdapter::from_arc(backend.clone());
        let feedback = adapter.evaluate("Hello all", &metrics()).await.unwrap();
        assert_eq!(feedback.overall_score, 8.0);
        assert_eq!(feedback.strengths, vec!["Pace"]);

        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen[0][0].content, EVALUATION_SYSTEM_PROMPT);
        assert!(seen[0][1].content.contains("Hello all"));
    }
}
