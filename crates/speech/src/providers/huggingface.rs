use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use leadvox_core::config::SpeechConfig;

use crate::{TranscribeError, TranscriptionProvider};

const INFERENCE_URL: &str = "https://api-inference.huggingface.co/models/openai/whisper-base";

/// Hugging Face inference API; joins the chain only when a token is set.
pub struct HuggingFaceProvider {
    http: reqwest::Client,
    token: SecretString,
}

#[derive(Debug, Deserialize)]
struct InferenceResponse {
    #[serde(default)]
    text: String,
}

impl HuggingFaceProvider {
    pub fn from_config(config: &SpeechConfig) -> Result<Option<Self>, TranscribeError> {
        let Some(token) = config
            .hugging_face_token
            .clone()
            .filter(|token| !token.expose_secret().trim().is_empty())
        else {
            return Ok(None);
        };

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Some(Self { http, token }))
    }
}

#[async_trait]
impl TranscriptionProvider for HuggingFaceProvider {
    fn name(&self) -> &'static str {
        "hugging_face"
    }

    async fn transcribe(&self, audio: &[u8]) -> Result<String, TranscribeError> {
        let response = self
            .http
            .post(INFERENCE_URL)
            .bearer_auth(self.token.expose_secret())
            .header(reqwest::header::CONTENT_TYPE, "audio/ogg")
            .body(audio.to_vec())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TranscribeError::Status(status.as_u16()));
        }

        let payload: InferenceResponse = response.json().await?;
        Ok(payload.text)
    }
}
