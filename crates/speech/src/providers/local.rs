use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::Builder;
use tokio::process::Command;
use tracing::debug;

use leadvox_core::config::SpeechConfig;

use crate::{TranscribeError, TranscriptionProvider};

/// Binaries probed on PATH when none is configured explicitly, in order.
const KNOWN_BINARIES: &[&str] = &["whisper-cli", "whisper"];

/// Offline transcription through a whisper CLI installed on the host.
/// Preferred over the remote providers: free and no audio leaves the box.
pub struct LocalWhisperProvider {
    binary: PathBuf,
    model: String,
    timeout: Duration,
}

impl LocalWhisperProvider {
    /// `None` when no usable binary exists; the chain simply skips local
    /// transcription then.
    pub fn discover(config: &SpeechConfig) -> Option<Self> {
        let binary = match &config.whisper_binary {
            Some(configured) => which::which(configured).ok()?,
            None => KNOWN_BINARIES.iter().find_map(|name| which::which(name).ok())?,
        };

        debug!(
            event_name = "speech.local_binary_found",
            binary = %binary.display(),
            "local whisper binary discovered"
        );

        Some(Self {
            binary,
            model: config.whisper_model.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }
}

#[async_trait]
impl TranscriptionProvider for LocalWhisperProvider {
    fn name(&self) -> &'static str {
        "local_whisper"
    }

    async fn transcribe(&self, audio: &[u8]) -> Result<String, TranscribeError> {
        let staged = Builder::new().prefix("leadvox-voice-").suffix(".ogg").tempfile()?;
        tokio::fs::write(staged.path(), audio).await?;

        let invocation = Command::new(&self.binary)
            .arg(staged.path())
            .arg("--model")
            .arg(&self.model)
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output();

        let output = tokio::time::timeout(self.timeout, invocation)
            .await
            .map_err(|_| TranscribeError::Local("whisper binary timed out".to_owned()))??;

        if !output.status.success() {
            return Err(TranscribeError::Local(format!(
                "whisper binary exited with {}",
                output.status
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_owned())
    }
}
