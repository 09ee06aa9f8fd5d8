//! Error model, JSON:API envelopes, domain types, and cron validation shared
//! by every other crate in the health-check control plane workspace.

pub mod cron;
pub mod error;
pub mod json_api;
pub mod types;

pub use error::{DomainError, Result};
pub use types::{
    CheckId, CheckTemplate, CheckTemplateAttributes, CheckTemplateId, CheckTemplateMetadata,
    CronExpression, InCheckAttributes, InCheckMetadata, OutCheck, OutCheckAttributes,
    OutCheckMetadata, OutcomeFilter, TelemetryAttributes, UserInfo,
};
