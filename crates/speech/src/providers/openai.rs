use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use leadvox_core::config::{LlmConfig, SpeechConfig};

use crate::{TranscribeError, TranscriptionProvider};

const TRANSCRIPTION_MODEL: &str = "whisper-1";

/// OpenAI audio transcription; reuses the chat credential, so it joins the
/// chain whenever the generative backend is configured.
pub struct OpenAiWhisperProvider {
    http: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: String,
}

impl OpenAiWhisperProvider {
    pub fn from_config(
        speech: &SpeechConfig,
        llm: &LlmConfig,
    ) -> Result<Option<Self>, TranscribeError> {
        let Some(api_key) =
            llm.api_key.clone().filter(|key| !key.expose_secret().trim().is_empty())
        else {
            return Ok(None);
        };

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(speech.timeout_secs))
            .build()?;

        Ok(Some(Self {
            http,
            api_key,
            base_url: llm.base_url.trim_end_matches('/').to_owned(),
        }))
    }
}

#[async_trait]
impl TranscriptionProvider for OpenAiWhisperProvider {
    fn name(&self) -> &'static str {
        "openai_whisper"
    }

    async fn transcribe(&self, audio: &[u8]) -> Result<String, TranscribeError> {
        let file = Part::bytes(audio.to_vec())
            .file_name("voice.ogg")
            .mime_str("audio/ogg")?;
        let form = Form::new().part("file", file).text("model", TRANSCRIPTION_MODEL);

        let response = self
            .http
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TranscribeError::Status(status.as_u16()));
        }

        let payload: TranscriptionResponse = response.json().await?;
        Ok(payload.text)
    }
}
