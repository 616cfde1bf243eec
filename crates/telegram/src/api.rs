use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use leadvox_core::config::TelegramConfig;

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Message {
    pub message_id: i64,
    #[serde(default)]
    pub from: Option<User>,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub voice: Option<Voice>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub first_name: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Voice {
    pub file_id: String,
    #[serde(default)]
    pub duration: u32,
}

impl Message {
    /// The acting user; falls back to the chat id for channel-ish messages.
    pub fn sender_id(&self) -> i64 {
        self.from.as_ref().map(|user| user.id).unwrap_or(self.chat.id)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("telegram request failed: {0}")]
    Request(String),
    #[error("telegram returned status {0}")]
    Status(u16),
    #[error("telegram rejected the call: {0}")]
    Api(String),
}

/// Transport seam over the Bot API so the runner and handlers are testable
/// without the network.
#[async_trait]
pub trait BotTransport: Send + Sync {
    /// Next long-poll batch. `None` means the update stream is closed.
    async fn next_updates(&self) -> Result<Option<Vec<Update>>, TransportError>;

    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        quick_replies: Option<&[String]>,
    ) -> Result<(), TransportError>;

    async fn download_voice(&self, file_id: &str) -> Result<Vec<u8>, TransportError>;
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileInfo {
    file_path: Option<String>,
}

/// Long-polling HTTP implementation of the Bot API.
pub struct HttpBotTransport {
    http: reqwest::Client,
    bot_token: SecretString,
    base_url: String,
    poll_timeout_secs: u64,
    offset: AtomicI64,
}

impl HttpBotTransport {
    pub fn from_config(config: &TelegramConfig) -> Result<Self, TransportError> {
        // The request deadline must outlive the server-side long-poll window.
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.poll_timeout_secs + 10))
            .build()
            .map_err(|error| TransportError::Request(error.to_string()))?;

        Ok(Self {
            http,
            bot_token: config.bot_token.clone(),
            base_url: "https://api.telegram.org".to_owned(),
            poll_timeout_secs: config.poll_timeout_secs,
            offset: AtomicI64::new(0),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.base_url, self.bot_token.expose_secret())
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<T, TransportError> {
        let response = self
            .http
            .post(self.method_url(method))
            .json(&body)
            .send()
            .await
            .map_err(|error| TransportError::Request(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        let envelope: ApiEnvelope<T> = response
            .json()
            .await
            .map_err(|error| TransportError::Request(error.to_string()))?;

        if !envelope.ok {
            return Err(TransportError::Api(
                envelope.description.unwrap_or_else(|| "unknown error".to_owned()),
            ));
        }
        envelope
            .result
            .ok_or_else(|| TransportError::Api("missing result payload".to_owned()))
    }
}

#[async_trait]
impl BotTransport for HttpBotTransport {
    async fn next_updates(&self) -> Result<Option<Vec<Update>>, TransportError> {
        let updates: Vec<Update> = self
            .call(
                "getUpdates",
                json!({
                    "offset": self.offset.load(Ordering::SeqCst),
                    "timeout": self.poll_timeout_secs,
                    "allowed_updates": ["message"],
                }),
            )
            .await?;

        if let Some(last) = updates.iter().map(|update| update.update_id).max() {
            self.offset.store(last + 1, Ordering::SeqCst);
        }
        Ok(Some(updates))
    }

    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        quick_replies: Option<&[String]>,
    ) -> Result<(), TransportError> {
        let mut body = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "HTML",
        });

        if let Some(replies) = quick_replies.filter(|replies| !replies.is_empty()) {
            let rows: Vec<Vec<serde_json::Value>> =
                replies.iter().map(|reply| vec![json!({ "text": reply })]).collect();
            body["reply_markup"] = json!({
                "keyboard": rows,
                "resize_keyboard": true,
                "one_time_keyboard": true,
            });
        }

        let _: serde_json::Value = self.call("sendMessage", body).await?;
        Ok(())
    }

    async fn download_voice(&self, file_id: &str) -> Result<Vec<u8>, TransportError> {
        let info: FileInfo = self.call("getFile", json!({ "file_id": file_id })).await?;
        let file_path = info
            .file_path
            .ok_or_else(|| TransportError::Api("file has no downloadable path".to_owned()))?;

        let url = format!(
            "{}/file/bot{}/{file_path}",
            self.base_url,
            self.bot_token.expose_secret()
        );
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|error| TransportError::Request(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|error| TransportError::Request(error.to_string()))?;
        Ok(bytes.to_vec())
    }
}
