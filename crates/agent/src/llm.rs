use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use leadvox_core::config::LlmConfig;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("llm api key is not configured")]
    MissingCredential,
    #[error("chat request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("chat backend returned status {0}")]
    Status(u16),
    #[error("chat response had no completion content")]
    EmptyCompletion,
}

/// Generative collaborator used only as a fallback for utterances the rule
/// table cannot classify.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, LlmError>;
}

/// OpenAI-compatible chat completions client.
pub struct OpenAiChatClient {
    http: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAiChatClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.expose_secret().trim().is_empty())
            .ok_or(LlmError::MissingCredential)?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[async_trait]
impl ChatBackend for OpenAiChatClient {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, LlmError> {
        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&json!({
                "model": self.model,
                "messages": [
                    {"role": "system", "content": system_prompt},
                    {"role": "user", "content": user_prompt},
                ],
                "max_tokens": self.max_tokens,
                "temperature": self.temperature,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(LlmError::Status(status.as_u16()));
        }

        let completion: ChatCompletion = response.json().await?;
        completion
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .map(|content| content.trim().to_owned())
            .filter(|content| !content.is_empty())
            .ok_or(LlmError::EmptyCompletion)
    }
}

#[cfg(test)]
mod tests {
    use leadvox_core::config::AppConfig;

    use super::{LlmError, OpenAiChatClient};

    #[test]
    fn client_requires_a_credential() {
        let config = AppConfig::default().llm;
        assert!(matches!(OpenAiChatClient::from_config(&config), Err(LlmError::MissingCredential)));
    }

    #[test]
    fn client_builds_with_credential_and_normalized_base_url() {
        let mut config = AppConfig::default().llm;
        config.api_key = Some("sk-test".to_string().into());
        config.base_url = "https://api.openai.com/v1/".to_string();

        let client = OpenAiChatClient::from_config(&config).expect("client should build");
        assert_eq!(client.base_url, "https://api.openai.com/v1");
    }
}
