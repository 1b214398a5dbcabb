//! Language model trait

use async_trait::async_trait;

use crate::conversation::ConversationMessage;
use crate::evaluation::AIFeedback;
use crate::metrics::MetricsSummary;
use crate::Result;

/// Language model interface
///
/// Fails with `Error::Llm`, classified as rate-limited, auth-invalid,
/// timeout or other.
///
/// # Example
///
/// ```ignore
/// let llm = LlmFactory::create(&settings.providers.llm)?;
/// let reply = llm.converse(&history, CONVERSATION_SYSTEM_PROMPT, "How was my intro?").await?;
/// ```
#[async_trait]
pub trait LanguageModel: Send + Sync + 'static {
    /// Produce the next coaching reply
    ///
    /// `history` holds the prior turns in order; `user_input` is the turn
    /// being answered.
    async fn converse(
        &self,
        history: &[ConversationMessage],
        system_prompt: &str,
        user_input: &str,
    ) -> Result<String>;

    /// Produce structured feedback for an evaluated recording
    async fn evaluate(&self, transcript: &str, metrics: &MetricsSummary) -> Result<AIFeedback>;

    /// Provider name for logging
    fn provider_name(&self) -> &str;

    /// Model name for logging
    fn model_name(&self) -> &str;
}
