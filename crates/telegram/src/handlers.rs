use std::sync::Arc;

use tracing::{debug, info};

use leadvox_agent::orchestrator::DialogueOrchestrator;
use leadvox_agent::quality::{QualityAssessment, QualityAssessor};
use leadvox_agent::responses::{self, TurnOutcome};
use leadvox_speech::TranscriptionChain;

use crate::api::Message;

/// One outgoing bot message.
#[derive(Clone, Debug, PartialEq)]
pub struct BotReply {
    pub chat_id: i64,
    pub text: String,
    pub quick_replies: Option<Vec<String>>,
}

impl BotReply {
    pub fn transcription_failed(chat_id: i64) -> Self {
        Self {
            chat_id,
            text: responses::transcription_failed().to_owned(),
            quick_replies: None,
        }
    }
}

/// Routes one Telegram message through transcription, quality assessment,
/// and the dialogue orchestrator, then renders the structured outcome.
pub struct UpdateHandler {
    orchestrator: Arc<DialogueOrchestrator>,
    speech: Arc<TranscriptionChain>,
    quality: QualityAssessor,
}

impl UpdateHandler {
    pub fn new(orchestrator: Arc<DialogueOrchestrator>, speech: Arc<TranscriptionChain>) -> Self {
        Self { orchestrator, speech, quality: QualityAssessor::new() }
    }

    pub async fn handle_text(&self, message: &Message, text: &str) -> BotReply {
        let user_id = message.sender_id();
        let assessment = self.quality.assess(text);

        debug!(
            event_name = "ingress.telegram.text_received",
            user_id,
            chat_id = message.chat.id,
            quality_score = f64::from(assessment.score),
            "routing text message"
        );

        let outcome = self.orchestrator.process_text(user_id, text).await;
        render_reply(message.chat.id, outcome, &assessment)
    }

    pub async fn handle_voice(&self, message: &Message, audio: &[u8]) -> BotReply {
        let user_id = message.sender_id();

        let Some(transcript) = self.speech.transcribe(audio).await else {
            info!(
                event_name = "ingress.telegram.voice_unrecognized",
                user_id,
                chat_id = message.chat.id,
                "no transcription provider produced text"
            );
            return BotReply::transcription_failed(message.chat.id);
        };

        info!(
            event_name = "ingress.telegram.voice_transcribed",
            user_id,
            chat_id = message.chat.id,
            chars = transcript.chars().count(),
            "voice message transcribed, routing as text"
        );

        self.handle_text(message, &transcript).await
    }
}

/// Renders a `TurnOutcome` into one Telegram HTML message. Quality hints are
/// advisory: they are appended, never block the response.
fn render_reply(chat_id: i64, outcome: TurnOutcome, assessment: &QualityAssessment) -> BotReply {
    let mut text = outcome.response;

    if let Some(hint) = outcome.followup_hint {
        text.push_str("\n\n💡 <i>");
        text.push_str(&hint);
        text.push_str("</i>");
    }

    if assessment.needs_clarification && !assessment.hints.is_empty() {
        text.push_str("\n\n<i>");
        text.push_str(&assessment.hints.join(". "));
        text.push_str(".</i>");
    }

    let quick_replies = outcome.keyboard.or_else(|| {
        (!outcome.suggestions.is_empty()).then_some(outcome.suggestions)
    });

    BotReply { chat_id, text, quick_replies }
}
