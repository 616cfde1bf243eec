use serde::{Deserialize, Serialize};

/// Where a lead entered the funnel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeadSource {
    Scanner,
    Partner,
    Manual,
}

impl LeadSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scanner => "SCANNER",
            Self::Partner => "PARTNER",
            Self::Manual => "MANUAL",
        }
    }
}

/// Cold-funnel stages a lead moves through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeadStage {
    New,
    Contacted,
    Qualified,
    Transferred,
    Lost,
}

impl LeadStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Contacted => "CONTACTED",
            Self::Qualified => "QUALIFIED",
            Self::Transferred => "TRANSFERRED",
            Self::Lost => "LOST",
        }
    }
}

/// Business line a lead belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BusinessDomain {
    First,
    Second,
    Third,
}

impl BusinessDomain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::First => "FIRST",
            Self::Second => "SECOND",
            Self::Third => "THIRD",
        }
    }
}

/// One lead as the CRM reports it, reduced to the fields the assistant
/// context needs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LeadSummary {
    pub id: i64,
    pub full_name: String,
    #[serde(default)]
    pub stage: Option<LeadStage>,
    #[serde(default)]
    pub source: Option<LeadSource>,
    #[serde(default)]
    pub business_domain: Option<BusinessDomain>,
    #[serde(default)]
    pub ai_score: Option<f32>,
}

impl LeadSummary {
    /// One digest line in the `ID:<id> | <name> | <stage>` shape the
    /// assistant prompt expects.
    pub fn digest_line(&self) -> String {
        let stage = self.stage.map(|stage| stage.as_str()).unwrap_or("UNKNOWN");
        format!("ID:{} | {} | {}", self.id, self.full_name, stage)
    }
}
