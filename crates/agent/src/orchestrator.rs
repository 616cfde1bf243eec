use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use leadvox_core::crm::CrmGateway;
use leadvox_core::domain::action::{Action, ExtractedEntities, Intent};

use crate::context::{ContextStore, ConversationState, ConversationTurn, UserContext};
use crate::intent::{is_affirmative, is_negative, IntentDetector};
use crate::llm::ChatBackend;
use crate::responses::{self, ResponseKind, TurnOutcome};

/// How many lead summaries the generative fallback gets as context.
const ASSISTANT_LEAD_LIMIT: usize = 20;

const ASSISTANT_SYSTEM_PROMPT: &str = "You are a CRM assistant for a lead funnel. \
Answer briefly and concretely. \
Available lead fields: id, full_name, source, stage, business_domain, ai_score.";

/// Back-reference phrases that make the last-referenced lead implicit.
/// Resolution is single-slot: only the most recent lead is ever consulted.
const BACK_REFERENCES: &[&str] = &[
    "того ліда",
    "того",
    "його",
    "йому",
    "нього",
    "неї",
    "останнього",
    "останньому",
    "that lead",
    "that one",
    "the previous",
    "him",
];

/// The per-turn state machine: resolves references against the context
/// store, gates mutating intents behind confirmation, executes or delegates,
/// and always returns a structured outcome - never an error.
pub struct DialogueOrchestrator {
    store: Arc<ContextStore>,
    crm: Arc<dyn CrmGateway>,
    chat: Option<Arc<dyn ChatBackend>>,
    detector: IntentDetector,
}

impl DialogueOrchestrator {
    pub fn new(
        store: Arc<ContextStore>,
        crm: Arc<dyn CrmGateway>,
        chat: Option<Arc<dyn ChatBackend>>,
    ) -> Self {
        Self { store, crm, chat, detector: IntentDetector::new() }
    }

    pub fn context_store(&self) -> &Arc<ContextStore> {
        &self.store
    }

    /// Processes one user turn. Turns of the same user are serialized through
    /// the store's per-user gate; turns of different users run concurrently.
    pub async fn process_text(&self, user_id: i64, text: &str) -> TurnOutcome {
        let _turn_gate = self.store.begin_turn(user_id).await;
        let context = self.store.snapshot(user_id);

        debug!(event_name = "dialogue.turn_started", user_id, state = ?context.state, "processing turn");

        let resolved_reference = resolve_reference(text, &context);

        // A pending confirmation intercepts yes/no replies. Anything else
        // falls through and is evaluated fresh while the pending action
        // stays armed.
        if context.state == ConversationState::AwaitingConfirmation {
            if let Some(pending) = context.pending_confirmation.clone() {
                if is_affirmative(text) {
                    self.store.clear_pending(user_id);
                    info!(
                        event_name = "dialogue.confirmation_accepted",
                        user_id,
                        intent = pending.intent.label(),
                        "executing confirmed action"
                    );
                    return self.execute(user_id, pending, true).await;
                }
                if is_negative(text) {
                    self.store.clear_pending(user_id);
                    info!(
                        event_name = "dialogue.confirmation_declined",
                        user_id,
                        intent = pending.intent.label(),
                        "pending action cancelled"
                    );
                    return TurnOutcome {
                        success: true,
                        input_text: text.to_owned(),
                        action: Some(Action::new(
                            Intent::Cancel,
                            ExtractedEntities::default(),
                            0.95,
                            text,
                        )),
                        response: responses::cancellation_ack().to_owned(),
                        response_kind: ResponseKind::Text,
                        keyboard: None,
                        followup_hint: None,
                        suggestions: Vec::new(),
                        needs_confirmation: false,
                    };
                }
            }
        }

        let mut action = self.detector.detect(text, Some(&context));
        if action.entities.lead_id.is_none() {
            if let Some((lead_id, lead_name)) = resolved_reference {
                action.entities.lead_id = Some(lead_id);
                if action.entities.lead_name.is_none() {
                    action.entities.lead_name = lead_name;
                }
            }
        }

        info!(
            event_name = "dialogue.intent_detected",
            user_id,
            intent = action.intent.label(),
            confidence = f64::from(action.confidence),
            lead_id = action.entities.lead_id,
            "intent classified"
        );

        // Remember the referenced lead immediately so a follow-up naming no
        // id still inherits it, whether or not this action needs confirming.
        if let Some(lead_id) = action.entities.lead_id {
            self.store.note_lead(user_id, lead_id, action.entities.lead_name.clone());
        }

        if action.requires_confirmation {
            self.store.set_pending(user_id, action.clone());
            let prompt = responses::confirmation_prompt(&action);
            info!(
                event_name = "dialogue.confirmation_requested",
                user_id,
                intent = action.intent.label(),
                "confirmation gate armed"
            );
            return TurnOutcome {
                success: true,
                input_text: text.to_owned(),
                action: Some(action),
                response: prompt,
                response_kind: ResponseKind::ConfirmationNeeded,
                keyboard: Some(responses::confirm_keyboard()),
                followup_hint: None,
                suggestions: Vec::new(),
                needs_confirmation: true,
            };
        }

        self.execute(user_id, action, false).await
    }

    async fn execute(&self, user_id: i64, action: Action, confirmed: bool) -> TurnOutcome {
        if action.intent == Intent::Unknown {
            let outcome = self.assistant_fallback(&action).await;
            self.record_turn(user_id, &action, &outcome);
            return outcome;
        }

        // Confirmed mutations are signalled to the data-access collaborator;
        // its failure degrades to a polite reply, never past this boundary.
        if confirmed && action.intent.is_mutating() {
            if let Err(error) = self.crm.apply_action(&action).await {
                warn!(
                    event_name = "dialogue.crm_apply_failed",
                    user_id,
                    intent = action.intent.label(),
                    error = %error,
                    "crm rejected confirmed action"
                );
                let outcome = TurnOutcome {
                    success: true,
                    input_text: action.original_text.clone(),
                    action: Some(action.clone()),
                    response: responses::crm_unavailable().to_owned(),
                    response_kind: ResponseKind::Error,
                    keyboard: None,
                    followup_hint: None,
                    suggestions: Vec::new(),
                    needs_confirmation: false,
                };
                self.record_turn(user_id, &action, &outcome);
                return outcome;
            }
        }

        let context = self.store.snapshot(user_id);
        let reply = responses::action_reply(&action, context.last_lead_id);

        info!(
            event_name = "dialogue.action_executed",
            user_id,
            intent = action.intent.label(),
            response_kind = reply.kind.as_str(),
            confirmed,
            "turn executed"
        );

        let outcome = TurnOutcome {
            success: true,
            input_text: action.original_text.clone(),
            action: Some(action.clone()),
            response: reply.text,
            response_kind: reply.kind,
            keyboard: None,
            followup_hint: reply.followup_hint,
            suggestions: reply.suggestions,
            needs_confirmation: false,
        };
        self.record_turn(user_id, &action, &outcome);
        outcome
    }

    async fn assistant_fallback(&self, action: &Action) -> TurnOutcome {
        let Some(chat) = &self.chat else {
            // No backend configured: fixed clarifying prompt, no network call.
            return TurnOutcome {
                success: true,
                input_text: action.original_text.clone(),
                action: Some(action.clone()),
                response: responses::clarification_prompt().to_owned(),
                response_kind: ResponseKind::Text,
                keyboard: None,
                followup_hint: Some(responses::clarification_examples().to_owned()),
                suggestions: responses::clarification_suggestions(),
                needs_confirmation: false,
            };
        };

        let digest = match self.crm.lead_digest(ASSISTANT_LEAD_LIMIT).await {
            Ok(digest) => digest,
            Err(error) => {
                warn!(
                    event_name = "dialogue.lead_digest_failed",
                    error = %error,
                    "assistant context unavailable, continuing without it"
                );
                "Lead data is unavailable.".to_owned()
            }
        };

        let user_prompt =
            format!("Request: {}\n\nLead data:\n{}", action.original_text, digest);

        let response = match chat.complete(ASSISTANT_SYSTEM_PROMPT, &user_prompt).await {
            Ok(answer) => answer,
            Err(error) => {
                warn!(
                    event_name = "dialogue.assistant_failed",
                    error = %error,
                    "assistant backend failed, degrading to fixed reply"
                );
                responses::ai_unavailable().to_owned()
            }
        };

        TurnOutcome {
            success: true,
            input_text: action.original_text.clone(),
            action: Some(action.clone()),
            response,
            response_kind: ResponseKind::Text,
            keyboard: None,
            followup_hint: None,
            suggestions: Vec::new(),
            needs_confirmation: false,
        }
    }

    fn record_turn(&self, user_id: i64, action: &Action, outcome: &TurnOutcome) {
        let turn = ConversationTurn {
            timestamp: Utc::now(),
            user_input: action.original_text.clone(),
            action: action.clone(),
            bot_response: outcome.response.clone(),
        };
        self.store.record_turn(user_id, turn);
    }
}

fn resolve_reference(text: &str, context: &UserContext) -> Option<(i64, Option<String>)> {
    let lowered = text.to_lowercase();
    let has_back_reference = BACK_REFERENCES.iter().any(|phrase| lowered.contains(phrase));
    if !has_back_reference {
        return None;
    }
    context.last_lead_id.map(|lead_id| (lead_id, context.last_lead_name.clone()))
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use leadvox_core::crm::{CrmError, CrmGateway};
    use leadvox_core::domain::action::{Action, Intent};
    use leadvox_core::domain::lead::{LeadStage, LeadSummary};

    use crate::context::{ContextStore, ConversationState};
    use crate::llm::{ChatBackend, LlmError};
    use crate::responses::ResponseKind;

    use super::DialogueOrchestrator;

    #[derive(Default)]
    struct RecordingCrm {
        applied: Mutex<Vec<Action>>,
        fail_apply: bool,
        leads: Vec<LeadSummary>,
    }

    impl RecordingCrm {
        fn applied(&self) -> Vec<Action> {
            self.applied.lock().expect("applied lock").clone()
        }
    }

    #[async_trait]
    impl CrmGateway for RecordingCrm {
        async fn lead_summaries(&self, limit: usize) -> Result<Vec<LeadSummary>, CrmError> {
            Ok(self.leads.iter().take(limit).cloned().collect())
        }

        async fn apply_action(&self, action: &Action) -> Result<(), CrmError> {
            if self.fail_apply {
                return Err(CrmError::Status(503));
            }
            self.applied.lock().expect("applied lock").push(action.clone());
            Ok(())
        }
    }

    struct ScriptedChat {
        reply: Result<String, ()>,
        prompts: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedChat {
        fn answering(reply: &str) -> Self {
            Self { reply: Ok(reply.to_owned()), prompts: Mutex::new(Vec::new()) }
        }

        fn failing() -> Self {
            Self { reply: Err(()), prompts: Mutex::new(Vec::new()) }
        }

        fn prompts(&self) -> Vec<(String, String)> {
            self.prompts.lock().expect("prompts lock").clone()
        }
    }

    #[async_trait]
    impl ChatBackend for ScriptedChat {
        async fn complete(
            &self,
            system_prompt: &str,
            user_prompt: &str,
        ) -> Result<String, LlmError> {
            self.prompts
                .lock()
                .expect("prompts lock")
                .push((system_prompt.to_owned(), user_prompt.to_owned()));
            self.reply.clone().map_err(|_| LlmError::Status(500))
        }
    }

    fn orchestrator_with(
        crm: Arc<RecordingCrm>,
        chat: Option<Arc<ScriptedChat>>,
    ) -> DialogueOrchestrator {
        let store = Arc::new(ContextStore::from_ttl_minutes(120));
        DialogueOrchestrator::new(
            store,
            crm,
            chat.map(|scripted| scripted as Arc<dyn ChatBackend>),
        )
    }

    #[tokio::test]
    async fn pronoun_resolves_to_last_referenced_lead() {
        let crm = Arc::new(RecordingCrm::default());
        let orchestrator = orchestrator_with(crm, None);
        orchestrator.context_store().note_lead(1, 42, Some("Nikolas".to_owned()));

        let outcome = orchestrator.process_text(1, "add a note to him").await;

        let action = outcome.action.expect("action should be resolved");
        assert_eq!(action.intent, Intent::AddNote);
        assert_eq!(action.entities.lead_id, Some(42));
        assert!(!outcome.needs_confirmation);
    }

    #[tokio::test]
    async fn delete_command_arms_the_confirmation_gate() {
        let crm = Arc::new(RecordingCrm::default());
        let orchestrator = orchestrator_with(crm.clone(), None);

        let outcome = orchestrator.process_text(7, "delete lead #12").await;

        assert!(outcome.needs_confirmation);
        assert_eq!(outcome.response_kind, ResponseKind::ConfirmationNeeded);
        assert!(outcome.response.contains("12"));
        assert!(outcome.keyboard.is_some());
        assert!(crm.applied().is_empty(), "nothing may execute before confirmation");

        let context = orchestrator.context_store().snapshot(7);
        assert_eq!(context.state, ConversationState::AwaitingConfirmation);
        assert_eq!(
            context.pending_confirmation.map(|pending| pending.intent),
            Some(Intent::DeleteLead)
        );
    }

    #[tokio::test]
    async fn affirmative_reply_executes_pending_action_and_returns_to_idle() {
        let crm = Arc::new(RecordingCrm::default());
        let orchestrator = orchestrator_with(crm.clone(), None);

        let gate = orchestrator.process_text(3, "додай ліда Марко Вовчок").await;
        assert!(gate.needs_confirmation);

        let outcome = orchestrator.process_text(3, "yes").await;

        assert!(!outcome.needs_confirmation);
        assert_eq!(outcome.response_kind, ResponseKind::LeadCreated);
        assert_eq!(crm.applied().len(), 1);
        assert_eq!(crm.applied()[0].intent, Intent::CreateLead);

        let context = orchestrator.context_store().snapshot(3);
        assert_eq!(context.state, ConversationState::Idle);
        assert!(context.pending_confirmation.is_none());
    }

    #[tokio::test]
    async fn negative_reply_cancels_without_executing() {
        let crm = Arc::new(RecordingCrm::default());
        let orchestrator = orchestrator_with(crm.clone(), None);

        let _ = orchestrator.process_text(4, "видали ліда #8").await;
        let outcome = orchestrator.process_text(4, "no").await;

        assert!(!outcome.needs_confirmation);
        assert!(outcome.response.contains("Cancelled"));
        assert!(crm.applied().is_empty());
        assert_eq!(
            orchestrator.context_store().snapshot(4).state,
            ConversationState::Idle
        );
    }

    #[tokio::test]
    async fn stale_pending_action_survives_unrelated_turn() {
        let crm = Arc::new(RecordingCrm::default());
        let orchestrator = orchestrator_with(crm.clone(), None);

        let _ = orchestrator.process_text(5, "видали ліда #8").await;

        // Neither yes nor no: the utterance is evaluated fresh while the
        // pending delete stays armed.
        let listing = orchestrator.process_text(5, "покажи ліди").await;
        assert_eq!(listing.response_kind, ResponseKind::LeadsList);
        assert_eq!(
            orchestrator.context_store().snapshot(5).state,
            ConversationState::AwaitingConfirmation
        );

        // A stray later "yes" still confirms the stale delete.
        let confirmed = orchestrator.process_text(5, "так").await;
        assert_eq!(confirmed.response_kind, ResponseKind::LeadDeleted);
        assert_eq!(crm.applied().len(), 1);
        assert_eq!(crm.applied()[0].intent, Intent::DeleteLead);
    }

    #[tokio::test]
    async fn note_without_lead_or_context_is_a_typed_error() {
        let crm = Arc::new(RecordingCrm::default());
        let orchestrator = orchestrator_with(crm.clone(), None);

        let outcome = orchestrator.process_text(6, "додай нотатку").await;

        assert_eq!(outcome.response_kind, ResponseKind::Error);
        assert!(!outcome.needs_confirmation);
        assert!(crm.applied().is_empty(), "no execution may be attempted");
    }

    #[tokio::test]
    async fn follow_up_without_id_inherits_lead_from_previous_turn() {
        let crm = Arc::new(RecordingCrm::default());
        let orchestrator = orchestrator_with(crm, None);

        let _ = orchestrator.process_text(8, "оціни ліда #21").await;
        let outcome = orchestrator.process_text(8, "проаналізуй оцінку ще раз").await;

        let action = outcome.action.expect("action");
        assert_eq!(action.intent, Intent::AnalyzeLead);
        assert_eq!(action.entities.lead_id, Some(21));
    }

    #[tokio::test]
    async fn unknown_without_backend_returns_fixed_clarification() {
        let crm = Arc::new(RecordingCrm::default());
        let orchestrator = orchestrator_with(crm, None);

        let outcome = orchestrator.process_text(9, "скільки буде два плюс два").await;

        assert_eq!(outcome.response_kind, ResponseKind::Text);
        assert!(outcome.followup_hint.is_some());
        assert!(!outcome.suggestions.is_empty());
    }

    #[tokio::test]
    async fn unknown_with_backend_delegates_with_lead_digest() {
        let crm = Arc::new(RecordingCrm {
            leads: vec![LeadSummary {
                id: 42,
                full_name: "Nikolas Verde".to_owned(),
                stage: Some(LeadStage::Qualified),
                source: None,
                business_domain: None,
                ai_score: Some(0.9),
            }],
            ..RecordingCrm::default()
        });
        let chat = Arc::new(ScriptedChat::answering("Lead 42 looks the hottest."));
        let orchestrator = orchestrator_with(crm, Some(chat.clone()));

        let outcome = orchestrator.process_text(10, "хто з лідів найперспективніший зараз").await;

        assert_eq!(outcome.response, "Lead 42 looks the hottest.");
        let prompts = chat.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].0.contains("CRM assistant"));
        assert!(prompts[0].1.contains("ID:42 | Nikolas Verde | QUALIFIED"));
    }

    #[tokio::test]
    async fn assistant_failure_degrades_to_fixed_reply() {
        let crm = Arc::new(RecordingCrm::default());
        let chat = Arc::new(ScriptedChat::failing());
        let orchestrator = orchestrator_with(crm, Some(chat));

        let outcome = orchestrator.process_text(11, "щось дивне і незрозуміле тут").await;

        assert!(outcome.success);
        assert!(outcome.response.contains("try again"));
    }

    #[tokio::test]
    async fn crm_failure_on_confirmed_action_degrades_politely() {
        let crm = Arc::new(RecordingCrm { fail_apply: true, ..RecordingCrm::default() });
        let orchestrator = orchestrator_with(crm, None);

        let _ = orchestrator.process_text(12, "delete lead #2").await;
        let outcome = orchestrator.process_text(12, "yes").await;

        assert!(outcome.success, "collaborator failure must not fail the turn");
        assert_eq!(outcome.response_kind, ResponseKind::Error);
        assert_eq!(
            orchestrator.context_store().snapshot(12).state,
            ConversationState::Idle
        );
    }

    #[tokio::test]
    async fn executed_turns_are_recorded_in_history() {
        let crm = Arc::new(RecordingCrm::default());
        let orchestrator = orchestrator_with(crm, None);

        let _ = orchestrator.process_text(13, "show leads").await;
        let _ = orchestrator.process_text(13, "статистика").await;

        let context = orchestrator.context_store().snapshot(13);
        assert_eq!(context.history.len(), 2);
        assert_eq!(context.last_action, Some("stats"));
    }
}
