use serde::{Deserialize, Serialize};

use leadvox_core::domain::action::{Action, Intent};

/// Tag the bot front-end uses to pick rendering (and, for mutating kinds, to
/// know the CRM was told to act).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    Text,
    ConfirmationNeeded,
    LeadCreated,
    LeadUpdated,
    LeadDeleted,
    LeadsList,
    NotesList,
    NoteAdded,
    Stats,
    Analysis,
    SearchResults,
    SalesPipeline,
    Error,
}

impl ResponseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::ConfirmationNeeded => "confirmation_needed",
            Self::LeadCreated => "lead_created",
            Self::LeadUpdated => "lead_updated",
            Self::LeadDeleted => "lead_deleted",
            Self::LeadsList => "leads_list",
            Self::NotesList => "notes_list",
            Self::NoteAdded => "note_added",
            Self::Stats => "stats",
            Self::Analysis => "analysis",
            Self::SearchResults => "search_results",
            Self::SalesPipeline => "sales_pipeline",
            Self::Error => "error",
        }
    }
}

/// Rendered reply for one executed intent.
#[derive(Clone, Debug, PartialEq)]
pub struct ReplyPayload {
    pub kind: ResponseKind,
    pub text: String,
    pub followup_hint: Option<String>,
    pub suggestions: Vec<String>,
}

impl ReplyPayload {
    fn new(kind: ResponseKind, text: String) -> Self {
        Self { kind, text, followup_hint: None, suggestions: Vec::new() }
    }
}

/// The structured result of one conversational turn.
#[derive(Clone, Debug)]
pub struct TurnOutcome {
    pub success: bool,
    pub input_text: String,
    pub action: Option<Action>,
    pub response: String,
    pub response_kind: ResponseKind,
    pub keyboard: Option<Vec<String>>,
    pub followup_hint: Option<String>,
    pub suggestions: Vec<String>,
    pub needs_confirmation: bool,
}

const MISSING: &str = "—";

pub fn confirm_keyboard() -> Vec<String> {
    vec!["✅ yes".to_owned(), "❌ no".to_owned()]
}

/// Confirmation prompt for a gated action. Incomplete data shows up as
/// placeholders inside the prompt; it never skips the gate.
pub fn confirmation_prompt(action: &Action) -> String {
    let entities = &action.entities;
    match action.intent {
        Intent::CreateLead => format!(
            "📋 <b>CONFIRMATION</b>\n\nCreate this lead?\n\n\
             👤 <b>Name:</b> {}\n\
             📞 <b>Phone:</b> {}\n\
             📧 <b>Email:</b> {}\n\
             📡 <b>Source:</b> {}\n\n\
             <i>Reply 'yes' to confirm or 'no' to cancel.</i>",
            entities.lead_name.as_deref().unwrap_or(MISSING),
            entities.phone.as_deref().unwrap_or(MISSING),
            entities.email.as_deref().unwrap_or(MISSING),
            entities.source.map(|source| source.as_str()).unwrap_or("MANUAL"),
        ),
        Intent::DeleteLead => format!(
            "⚠️ <b>DELETE LEAD #{}</b>\n\nThis cannot be undone!\n\n\
             <i>Reply 'yes' to confirm or 'no' to cancel.</i>",
            entities.lead_id.map(|id| id.to_string()).unwrap_or_else(|| MISSING.to_owned()),
        ),
        Intent::EditLead => format!(
            "✏️ <b>CONFIRM UPDATE</b>\n\nUpdate lead #{}?\n\n\
             <i>Reply 'yes' to confirm or 'no' to cancel.</i>",
            entities.lead_id.map(|id| id.to_string()).unwrap_or_else(|| MISSING.to_owned()),
        ),
        _ => "Confirm the action: yes/no".to_owned(),
    }
}

pub fn cancellation_ack() -> &'static str {
    "❌ Cancelled."
}

pub fn clarification_prompt() -> &'static str {
    "I didn't quite get that. What exactly should I do with your leads?"
}

pub fn clarification_examples() -> &'static str {
    "For example: 'show leads', 'add lead', 'add note to lead #12'."
}

pub fn clarification_suggestions() -> Vec<String> {
    vec!["show leads".to_owned(), "add lead".to_owned(), "stats".to_owned()]
}

pub fn ai_unavailable() -> &'static str {
    "Could not process the request. Please try again."
}

pub fn crm_unavailable() -> &'static str {
    "⚠️ The CRM is temporarily unreachable. The action was not applied - please try again."
}

pub fn transcription_failed() -> &'static str {
    "⚠️ Could not recognize the voice message. Please try again."
}

/// Builds the reply for an executed action. For read-only intents this IS the
/// execution: retrieval is the caller's job, keyed off `ResponseKind`.
pub fn action_reply(action: &Action, last_lead_id: Option<i64>) -> ReplyPayload {
    let entities = &action.entities;
    match action.intent {
        Intent::CreateLead => ReplyPayload::new(
            ResponseKind::LeadCreated,
            format!(
                "✅ <b>Lead created!</b>\n\nName: {}\nPhone: {}",
                entities.lead_name.as_deref().unwrap_or(MISSING),
                entities.phone.as_deref().unwrap_or(MISSING),
            ),
        ),
        Intent::EditLead => ReplyPayload::new(
            ResponseKind::LeadUpdated,
            format!(
                "✏️ <b>Lead #{} updated.</b>",
                entities.lead_id.map(|id| id.to_string()).unwrap_or_else(|| MISSING.to_owned()),
            ),
        ),
        Intent::DeleteLead => ReplyPayload::new(
            ResponseKind::LeadDeleted,
            format!(
                "🗑 <b>Lead #{} deleted.</b>",
                entities.lead_id.map(|id| id.to_string()).unwrap_or_else(|| MISSING.to_owned()),
            ),
        ),
        Intent::ListLeads => ReplyPayload {
            kind: ResponseKind::LeadsList,
            text: "📋 <b>Your leads:</b>\n\nLoading the list...".to_owned(),
            followup_hint: None,
            suggestions: vec![
                "show notes".to_owned(),
                "find hot leads".to_owned(),
                "stats".to_owned(),
            ],
        },
        Intent::Stats => ReplyPayload {
            kind: ResponseKind::Stats,
            text: "📊 <b>Statistics:</b>\n\nLoading...".to_owned(),
            followup_hint: None,
            suggestions: vec![
                "hot leads".to_owned(),
                "sales".to_owned(),
                "find qualified".to_owned(),
            ],
        },
        Intent::AnalyzeLead => match entities.lead_id.or(last_lead_id) {
            Some(lead_id) => ReplyPayload {
                kind: ResponseKind::Analysis,
                text: format!("🤖 <b>Analyzing lead #{lead_id}</b>\n\nLoading..."),
                followup_hint: Some(
                    "After the analysis I can suggest the next step: nurture or transfer."
                        .to_owned(),
                ),
                suggestions: Vec::new(),
            },
            None => ReplyPayload::new(
                ResponseKind::Error,
                "Specify the lead id to analyze.".to_owned(),
            ),
        },
        Intent::Search => ReplyPayload::new(
            ResponseKind::SearchResults,
            format!(
                "🔍 <b>Search results:</b> {}\n\nSearching...",
                entities.search_query.as_deref().unwrap_or_default(),
            ),
        ),
        Intent::ShowNotes => {
            ReplyPayload::new(ResponseKind::NotesList, "📝 <b>Notes:</b>\n\nLoading...".to_owned())
        }
        Intent::AddNote => {
            let lead_id = entities.lead_id.or(last_lead_id);
            match (lead_id, entities.note_content.as_deref()) {
                (Some(lead_id), Some(content)) => ReplyPayload::new(
                    ResponseKind::NoteAdded,
                    format!("📝 Note for lead #{lead_id}:\n{content}"),
                ),
                _ => ReplyPayload::new(
                    ResponseKind::Error,
                    "Specify the lead and the note text.".to_owned(),
                ),
            }
        }
        Intent::Sales => ReplyPayload::new(
            ResponseKind::SalesPipeline,
            "💰 <b>Sales:</b>\n\nLoading the pipeline...".to_owned(),
        ),
        Intent::ShowLead | Intent::Confirm | Intent::Cancel | Intent::Unknown => {
            ReplyPayload::new(
                ResponseKind::Text,
                format!("Action '{}' completed.", action.intent.label()),
            )
        }
    }
}
