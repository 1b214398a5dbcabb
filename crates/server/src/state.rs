//! Application State
//!
//! Shared state across all handlers.

use std::sync::Arc;

use coach_agent::{
    retry_policy, AvatarService, ConversationOrchestrator, EvaluationOrchestrator, ProviderNames,
    Providers,
};
use coach_config::Settings;
use coach_persistence::{FileSessionStore, SessionStore};

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub store: Arc<dyn SessionStore>,
    pub conversations: Arc<ConversationOrchestrator>,
    pub evaluations: Arc<EvaluationOrchestrator>,
    pub avatar: Arc<AvatarService>,
    /// Reported by `/health`
    pub providers: ProviderNames,
}

impl AppState {
    /// Wire orchestrators over an existing store and provider bundle
    pub fn new(config: Settings, store: Arc<dyn SessionStore>, providers: Providers) -> Self {
        let retry = retry_policy(&config.retry);
        let names = providers.names();
        let avatar = AvatarService::new(store.clone(), providers.avatar.clone());

        let conversations = ConversationOrchestrator::new(
            store.clone(),
            providers.clone(),
            &config.conversation,
        )
        .with_retry(retry.clone());

        let evaluations = EvaluationOrchestrator::new(store.clone(), providers, &config.evaluation)
            .with_retry(retry)
            .with_max_upload_bytes(config.server.max_upload_bytes());

        Self {
            config: Arc::new(config),
            store,
            conversations: Arc::new(conversations),
            evaluations: Arc::new(evaluations),
            avatar: Arc::new(avatar),
            providers: names,
        }
    }

    /// Open the file store and build providers from configuration
    pub async fn from_settings(config: Settings) -> coach_core::Result<Self> {
        let store = FileSessionStore::open(
            config.storage.base_dir.clone(),
            config.storage.public_prefix.clone(),
        )
        .await?;
        let providers = Providers::from_settings(&config)?;

        Ok(Self::new(config, Arc::new(store), providers))
    }
}
