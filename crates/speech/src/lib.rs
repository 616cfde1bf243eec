//! Voice transcription for the leadvox bot.
//!
//! Providers are capability-typed and tried in a fixed preference order:
//! local whisper binary first (offline, free), then the Hugging Face
//! inference API, then the OpenAI audio API. The first non-empty transcript
//! wins. A provider failure is a warning, not an error; total absence of a
//! transcript is an `Option::None` the caller turns into a user-facing reply.

pub mod providers;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use leadvox_core::config::{LlmConfig, SpeechConfig};

use crate::providers::huggingface::HuggingFaceProvider;
use crate::providers::local::LocalWhisperProvider;
use crate::providers::openai::OpenAiWhisperProvider;

#[derive(Debug, Error)]
pub enum TranscribeError {
    #[error("transcription request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("transcription provider returned status {0}")]
    Status(u16),
    #[error("local transcription failed: {0}")]
    Local(String),
    #[error("audio buffer could not be staged: {0}")]
    Staging(#[from] std::io::Error),
}

/// One way of turning audio bytes into text.
#[async_trait]
pub trait TranscriptionProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn transcribe(&self, audio: &[u8]) -> Result<String, TranscribeError>;
}

/// Ordered provider list; providers can be added or removed without touching
/// the dialogue layer.
pub struct TranscriptionChain {
    providers: Vec<Arc<dyn TranscriptionProvider>>,
}

impl TranscriptionChain {
    pub fn new(providers: Vec<Arc<dyn TranscriptionProvider>>) -> Self {
        Self { providers }
    }

    /// Builds the chain from configuration. Each provider joins only when
    /// its prerequisite (binary on PATH, token, api key) is present.
    pub fn from_config(speech: &SpeechConfig, llm: &LlmConfig) -> Result<Self, TranscribeError> {
        let mut providers: Vec<Arc<dyn TranscriptionProvider>> = Vec::new();

        if let Some(local) = LocalWhisperProvider::discover(speech) {
            providers.push(Arc::new(local));
        }
        if let Some(hugging_face) = HuggingFaceProvider::from_config(speech)? {
            providers.push(Arc::new(hugging_face));
        }
        if let Some(openai) = OpenAiWhisperProvider::from_config(speech, llm)? {
            providers.push(Arc::new(openai));
        }

        Ok(Self { providers })
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|provider| provider.name()).collect()
    }

    /// First non-empty transcript wins; every failure degrades to the next
    /// provider. `None` means no configured provider produced text.
    pub async fn transcribe(&self, audio: &[u8]) -> Option<String> {
        for provider in &self.providers {
            match provider.transcribe(audio).await {
                Ok(text) => {
                    let text = text.trim();
                    if text.is_empty() {
                        debug!(
                            event_name = "speech.provider_empty",
                            provider = provider.name(),
                            "provider returned an empty transcript, trying next"
                        );
                        continue;
                    }
                    info!(
                        event_name = "speech.transcribed",
                        provider = provider.name(),
                        chars = text.chars().count(),
                        "voice message transcribed"
                    );
                    return Some(text.to_owned());
                }
                Err(error) => {
                    warn!(
                        event_name = "speech.provider_failed",
                        provider = provider.name(),
                        error = %error,
                        "transcription provider failed, trying next"
                    );
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::{TranscribeError, TranscriptionChain, TranscriptionProvider};

    struct ScriptedProvider {
        name: &'static str,
        result: Result<String, u16>,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn returning(name: &'static str, text: &str) -> Arc<Self> {
            Arc::new(Self { name, result: Ok(text.to_owned()), calls: AtomicUsize::new(0) })
        }

        fn failing(name: &'static str) -> Arc<Self> {
            Arc::new(Self { name, result: Err(500), calls: AtomicUsize::new(0) })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TranscriptionProvider for ScriptedProvider {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn transcribe(&self, _audio: &[u8]) -> Result<String, TranscribeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone().map_err(TranscribeError::Status)
        }
    }

    #[tokio::test]
    async fn first_non_empty_result_wins() {
        let first = ScriptedProvider::returning("local", "покажи ліди");
        let second = ScriptedProvider::returning("remote", "should not be reached");
        let chain = TranscriptionChain::new(vec![first.clone(), second.clone()]);

        let text = chain.transcribe(b"ogg-bytes").await;

        assert_eq!(text.as_deref(), Some("покажи ліди"));
        assert_eq!(first.calls(), 1);
        assert_eq!(second.calls(), 0);
    }

    #[tokio::test]
    async fn empty_and_failed_providers_are_skipped() {
        let empty = ScriptedProvider::returning("local", "   ");
        let broken = ScriptedProvider::failing("hugging_face");
        let working = ScriptedProvider::returning("openai", "додай нотатку");
        let chain = TranscriptionChain::new(vec![empty.clone(), broken.clone(), working]);

        let text = chain.transcribe(b"ogg-bytes").await;

        assert_eq!(text.as_deref(), Some("додай нотатку"));
        assert_eq!(empty.calls(), 1);
        assert_eq!(broken.calls(), 1);
    }

    #[tokio::test]
    async fn exhausted_chain_yields_none_not_an_error() {
        let chain = TranscriptionChain::new(vec![
            ScriptedProvider::failing("local"),
            ScriptedProvider::failing("openai"),
        ]);
        assert_eq!(chain.transcribe(b"ogg-bytes").await, None);
    }

    #[tokio::test]
    async fn empty_chain_is_absence_of_capability() {
        let chain = TranscriptionChain::new(Vec::new());
        assert!(chain.is_empty());
        assert_eq!(chain.transcribe(b"ogg-bytes").await, None);
    }
}
