use async_trait::async_trait;
use thiserror::Error;

use crate::domain::action::Action;
use crate::domain::lead::LeadSummary;

#[derive(Debug, Error)]
pub enum CrmError {
    #[error("crm request failed: {0}")]
    Request(String),
    #[error("crm returned status {0}")]
    Status(u16),
    #[error("crm response could not be decoded: {0}")]
    Decode(String),
    #[error("action is missing required field `{0}`")]
    Incomplete(&'static str),
    #[error("action `{0}` cannot be applied to the crm")]
    Unsupported(&'static str),
}

/// Data-access collaborator. The orchestrator never touches storage itself:
/// it reads bounded lead summaries for assistant context and signals
/// confirmed mutating actions here.
#[async_trait]
pub trait CrmGateway: Send + Sync {
    /// Up to `limit` lead summaries for assistant context.
    async fn lead_summaries(&self, limit: usize) -> Result<Vec<LeadSummary>, CrmError>;

    /// Execute a confirmed mutating action (create / edit / delete / note).
    async fn apply_action(&self, action: &Action) -> Result<(), CrmError>;

    /// Textual digest handed to the generative backend.
    async fn lead_digest(&self, limit: usize) -> Result<String, CrmError> {
        let leads = self.lead_summaries(limit).await?;
        if leads.is_empty() {
            return Ok("No lead data available.".to_owned());
        }
        Ok(leads.iter().map(LeadSummary::digest_line).collect::<Vec<_>>().join("\n"))
    }
}

/// Gateway that answers with no data and accepts every action. Used in tests
/// and when the bot runs without a CRM backend.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopCrmGateway;

#[async_trait]
impl CrmGateway for NoopCrmGateway {
    async fn lead_summaries(&self, _limit: usize) -> Result<Vec<LeadSummary>, CrmError> {
        Ok(Vec::new())
    }

    async fn apply_action(&self, _action: &Action) -> Result<(), CrmError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{CrmGateway, NoopCrmGateway};

    #[tokio::test]
    async fn noop_gateway_digest_reports_no_data() {
        let digest = NoopCrmGateway.lead_digest(20).await.expect("digest");
        assert_eq!(digest, "No lead data available.");
    }
}
