use serde::{Deserialize, Serialize};

use crate::domain::lead::{BusinessDomain, LeadSource, LeadStage};

/// Discrete user goals the command-understanding layer can recognize.
///
/// `ShowLead` has no detection rule of its own: single-lead views are reached
/// through the bot's inline keyboards, never through free text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    CreateLead,
    ListLeads,
    ShowLead,
    EditLead,
    DeleteLead,
    AddNote,
    ShowNotes,
    AnalyzeLead,
    Search,
    Stats,
    Sales,
    Confirm,
    Cancel,
    Unknown,
}

impl Intent {
    pub fn label(&self) -> &'static str {
        match self {
            Self::CreateLead => "create_lead",
            Self::ListLeads => "list_leads",
            Self::ShowLead => "show_lead",
            Self::EditLead => "edit_lead",
            Self::DeleteLead => "delete_lead",
            Self::AddNote => "add_note",
            Self::ShowNotes => "show_notes",
            Self::AnalyzeLead => "analyze_lead",
            Self::Search => "search",
            Self::Stats => "stats",
            Self::Sales => "sales",
            Self::Confirm => "confirm",
            Self::Cancel => "cancel",
            Self::Unknown => "unknown",
        }
    }

    /// Mutating intents always pass through the confirmation gate.
    pub fn is_mutating(&self) -> bool {
        matches!(self, Self::CreateLead | Self::EditLead | Self::DeleteLead)
    }
}

/// Structured fields pulled out of raw input. Every field is independently
/// optional; `None` means the pattern was not present in the input.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedEntities {
    pub lead_id: Option<i64>,
    pub lead_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub stage: Option<LeadStage>,
    pub source: Option<LeadSource>,
    pub business_domain: Option<BusinessDomain>,
    pub note_content: Option<String>,
    pub search_query: Option<String>,
}

impl ExtractedEntities {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// A candidate action built from one input. Built fresh per turn; a pending
/// action stored for confirmation is only ever replaced wholesale, never
/// edited field by field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub intent: Intent,
    pub entities: ExtractedEntities,
    pub confidence: f32,
    pub requires_confirmation: bool,
    pub original_text: String,
}

impl Action {
    pub fn new(intent: Intent, entities: ExtractedEntities, confidence: f32, text: &str) -> Self {
        Self {
            intent,
            entities,
            confidence,
            requires_confirmation: intent.is_mutating(),
            original_text: text.to_owned(),
        }
    }
}
