use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use leadvox_core::config::CrmConfig;
use leadvox_core::crm::{CrmError, CrmGateway};
use leadvox_core::domain::action::{Action, Intent};
use leadvox_core::domain::lead::LeadSummary;

/// REST implementation of the data-access collaborator. The CRM backend owns
/// all persistence; this gateway only translates confirmed actions and
/// context reads into API calls.
pub struct RestCrmGateway {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct LeadsPage {
    #[serde(default)]
    items: Vec<LeadSummary>,
}

impl RestCrmGateway {
    pub fn from_config(config: &CrmConfig) -> Result<Self, CrmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| CrmError::Request(error.to_string()))?;

        Ok(Self { http, base_url: config.base_url.trim_end_matches('/').to_owned() })
    }

    async fn expect_success(response: reqwest::Response) -> Result<reqwest::Response, CrmError> {
        let status = response.status();
        if !status.is_success() {
            return Err(CrmError::Status(status.as_u16()));
        }
        Ok(response)
    }

    fn lead_id(action: &Action) -> Result<i64, CrmError> {
        action.entities.lead_id.ok_or(CrmError::Incomplete("lead_id"))
    }
}

#[async_trait]
impl CrmGateway for RestCrmGateway {
    async fn lead_summaries(&self, limit: usize) -> Result<Vec<LeadSummary>, CrmError> {
        let response = self
            .http
            .get(format!("{}/api/v1/leads", self.base_url))
            .send()
            .await
            .map_err(|error| CrmError::Request(error.to_string()))?;
        let response = Self::expect_success(response).await?;

        let page: LeadsPage = response
            .json()
            .await
            .map_err(|error| CrmError::Decode(error.to_string()))?;
        Ok(page.items.into_iter().take(limit).collect())
    }

    async fn apply_action(&self, action: &Action) -> Result<(), CrmError> {
        let entities = &action.entities;
        let request = match action.intent {
            Intent::CreateLead => self.http.post(format!("{}/api/v1/leads", self.base_url)).json(
                &json!({
                    "full_name": entities.lead_name,
                    "phone": entities.phone,
                    "email": entities.email,
                    "source": entities.source.map(|source| source.as_str()).unwrap_or("MANUAL"),
                    "business_domain": entities.business_domain.map(|domain| domain.as_str()),
                }),
            ),
            Intent::EditLead => {
                let lead_id = Self::lead_id(action)?;
                self.http.patch(format!("{}/api/v1/leads/{lead_id}", self.base_url)).json(&json!({
                    "full_name": entities.lead_name,
                    "phone": entities.phone,
                    "email": entities.email,
                    "stage": entities.stage.map(|stage| stage.as_str()),
                }))
            }
            Intent::DeleteLead => {
                let lead_id = Self::lead_id(action)?;
                self.http.delete(format!("{}/api/v1/leads/{lead_id}", self.base_url))
            }
            Intent::AddNote => {
                let lead_id = Self::lead_id(action)?;
                let text = entities.note_content.as_deref().ok_or(CrmError::Incomplete("note_content"))?;
                self.http
                    .post(format!("{}/api/v1/leads/{lead_id}/notes", self.base_url))
                    .json(&json!({ "text": text }))
            }
            other => return Err(CrmError::Unsupported(other.label())),
        };

        let response =
            request.send().await.map_err(|error| CrmError::Request(error.to_string()))?;
        Self::expect_success(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use leadvox_core::config::AppConfig;
    use leadvox_core::crm::{CrmError, CrmGateway};
    use leadvox_core::domain::action::{Action, ExtractedEntities, Intent};

    use super::RestCrmGateway;

    #[tokio::test]
    async fn unsupported_intents_are_rejected_without_a_network_call() {
        let gateway =
            RestCrmGateway::from_config(&AppConfig::default().crm).expect("gateway should build");
        let action = Action::new(Intent::ListLeads, ExtractedEntities::default(), 0.8, "список");

        let result = gateway.apply_action(&action).await;
        assert!(matches!(result, Err(CrmError::Unsupported("list_leads"))));
    }

    #[tokio::test]
    async fn mutations_without_a_lead_id_are_incomplete() {
        let gateway =
            RestCrmGateway::from_config(&AppConfig::default().crm).expect("gateway should build");
        let action = Action::new(Intent::DeleteLead, ExtractedEntities::default(), 0.8, "видали");

        let result = gateway.apply_action(&action).await;
        assert!(matches!(result, Err(CrmError::Incomplete("lead_id"))));
    }
}
