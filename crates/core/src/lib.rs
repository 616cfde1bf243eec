pub mod config;
pub mod crm;
pub mod domain;

pub use crm::{CrmError, CrmGateway, NoopCrmGateway};
pub use domain::action::{Action, ExtractedEntities, Intent};
pub use domain::lead::{BusinessDomain, LeadSource, LeadStage, LeadSummary};
