use std::{sync::Arc, time::Duration};

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::api::{BotTransport, TransportError, Update};
use crate::handlers::{BotReply, UpdateHandler};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl PollPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

/// The long-poll loop. Transport trouble degrades with backoff and never
/// crashes the process; updates inside one batch are handled in order, which
/// keeps one user's turns sequential.
pub struct BotRunner {
    transport: Arc<dyn BotTransport>,
    handler: UpdateHandler,
    poll_policy: PollPolicy,
}

impl BotRunner {
    pub fn new(
        transport: Arc<dyn BotTransport>,
        handler: UpdateHandler,
        poll_policy: PollPolicy,
    ) -> Self {
        Self { transport, handler, poll_policy }
    }

    pub async fn start(&self) -> Result<()> {
        for attempt in 0..=self.poll_policy.max_retries {
            match self.poll_and_dispatch(attempt).await {
                Ok(()) => return Ok(()),
                Err(transport_error) => {
                    warn!(
                        attempt,
                        max_retries = self.poll_policy.max_retries,
                        error = %transport_error,
                        "telegram long-poll transport failed"
                    );

                    if attempt >= self.poll_policy.max_retries {
                        warn!(
                            max_retries = self.poll_policy.max_retries,
                            "long-poll retries exhausted; continuing process without crash"
                        );
                        return Ok(());
                    }

                    let delay = self.poll_policy.backoff(attempt);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Ok(())
    }

    async fn poll_and_dispatch(&self, attempt: u32) -> Result<(), TransportError> {
        info!(attempt, "opening telegram long-poll loop");

        loop {
            let Some(updates) = self.transport.next_updates().await? else {
                info!(attempt, "telegram update stream closed");
                return Ok(());
            };

            for update in updates {
                self.dispatch(update).await;
            }
        }
    }

    async fn dispatch(&self, update: Update) {
        let correlation_id = update.update_id;
        let Some(message) = update.message else {
            debug!(
                event_name = "ingress.telegram.update_ignored",
                correlation_id,
                "update carries no message"
            );
            return;
        };

        let reply: Option<BotReply> = if let Some(text) = message.text.clone() {
            Some(self.handler.handle_text(&message, &text).await)
        } else if let Some(voice) = message.voice.clone() {
            match self.transport.download_voice(&voice.file_id).await {
                Ok(audio) => Some(self.handler.handle_voice(&message, &audio).await),
                Err(error) => {
                    warn!(
                        event_name = "ingress.telegram.voice_download_failed",
                        correlation_id,
                        chat_id = message.chat.id,
                        error = %error,
                        "voice file could not be fetched"
                    );
                    Some(BotReply::transcription_failed(message.chat.id))
                }
            }
        } else {
            debug!(
                event_name = "ingress.telegram.message_ignored",
                correlation_id,
                chat_id = message.chat.id,
                "message has neither text nor voice"
            );
            None
        };

        if let Some(reply) = reply {
            if let Err(error) = self
                .transport
                .send_message(reply.chat_id, &reply.text, reply.quick_replies.as_deref())
                .await
            {
                warn!(
                    event_name = "egress.telegram.send_failed",
                    correlation_id,
                    chat_id = reply.chat_id,
                    error = %error,
                    "reply could not be delivered; continuing poll loop"
                );
            }
        }
    }
}
