use std::sync::Arc;

use leadvox_agent::context::ContextStore;
use leadvox_agent::llm::{ChatBackend, LlmError, OpenAiChatClient};
use leadvox_agent::orchestrator::DialogueOrchestrator;
use leadvox_core::config::{AppConfig, ConfigError, LoadOptions};
use leadvox_core::crm::{CrmError, CrmGateway};
use leadvox_speech::{TranscribeError, TranscriptionChain};
use leadvox_telegram::api::{HttpBotTransport, TransportError};
use leadvox_telegram::handlers::UpdateHandler;
use leadvox_telegram::runner::{BotRunner, PollPolicy};
use thiserror::Error;
use tracing::info;

use crate::crm::RestCrmGateway;

pub struct Application {
    pub config: AppConfig,
    pub context_store: Arc<ContextStore>,
    pub bot_runner: BotRunner,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("crm gateway could not be constructed: {0}")]
    Crm(#[from] CrmError),
    #[error("chat backend could not be constructed: {0}")]
    Llm(#[from] LlmError),
    #[error("transcription chain could not be constructed: {0}")]
    Speech(#[from] TranscribeError),
    #[error("telegram transport could not be constructed: {0}")]
    Telegram(#[from] TransportError),
}

pub fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config)
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let context_store =
        Arc::new(ContextStore::from_ttl_minutes(config.conversation.context_ttl_minutes));

    let crm: Arc<dyn CrmGateway> = Arc::new(RestCrmGateway::from_config(&config.crm)?);

    let chat: Option<Arc<dyn ChatBackend>> = if config.llm.is_configured() {
        Some(Arc::new(OpenAiChatClient::from_config(&config.llm)?))
    } else {
        None
    };
    info!(
        event_name = "system.bootstrap.assistant_mode",
        correlation_id = "bootstrap",
        assistant = if chat.is_some() { "generative" } else { "rules_only" },
        "assistant fallback mode resolved"
    );

    let speech = Arc::new(TranscriptionChain::from_config(&config.speech, &config.llm)?);
    info!(
        event_name = "system.bootstrap.transcription_chain",
        correlation_id = "bootstrap",
        providers = ?speech.provider_names(),
        "transcription providers resolved"
    );

    let orchestrator =
        Arc::new(DialogueOrchestrator::new(Arc::clone(&context_store), crm, chat));
    let transport = Arc::new(HttpBotTransport::from_config(&config.telegram)?);
    let handler = UpdateHandler::new(orchestrator, speech);
    let bot_runner = BotRunner::new(transport, handler, PollPolicy::default());

    info!(
        event_name = "system.bootstrap.complete",
        correlation_id = "bootstrap",
        context_ttl_minutes = config.conversation.context_ttl_minutes,
        "application bootstrap complete"
    );

    Ok(Application { config, context_store, bot_runner })
}

#[cfg(test)]
mod tests {
    use leadvox_core::config::{ConfigOverrides, LoadOptions};

    use crate::bootstrap::bootstrap;

    #[tokio::test]
    async fn bootstrap_fails_fast_without_a_bot_token() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                telegram_bot_token: Some("missing-separator".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        });

        assert!(result.is_err());
        let message = result.err().expect("error").to_string();
        assert!(message.contains("telegram.bot_token"));
    }

    #[tokio::test]
    async fn bootstrap_wires_the_conversational_stack() {
        let app = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                telegram_bot_token: Some("12345:test-token".to_string()),
                context_ttl_minutes: Some(30),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .expect("bootstrap should succeed with valid overrides");

        assert_eq!(app.config.conversation.context_ttl_minutes, 30);
        assert_eq!(app.context_store.active_count(), 0);
    }
}
