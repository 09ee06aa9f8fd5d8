//! Core entities from spec.md §3: templates, checks, tenant identity.
//!
//! Typed identifiers (`CheckId`, `CheckTemplateId`, `CronExpression`) follow
//! the teacher's preference for newtypes over bare `String` at API
//! boundaries. `template_args` and outcome-filter values stay
//! `serde_json::Value` — the idiomatic untyped JSON value (REDESIGN FLAGS §9,
//! "Cyclic types").

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

macro_rules! string_newtype {
    ($name:ident) => {
        #[derive(
            Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord,
        )]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_newtype!(CheckId);
string_newtype!(CheckTemplateId);
string_newtype!(CronExpression);

/// The spec's `str | int | bool` telemetry-attribute union collapses to
/// `Value` at the Rust edge; structural validation happens where it matters
/// (outcome-filter construction).
pub type TelemetryAttributes = HashMap<String, serde_json::Value>;

/// Tenant identity threaded through every operation: whatever `on_auth`
/// projected the raw security-scheme material into.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserInfo {
    pub user_id: Option<String>,
    pub username: Option<String>,
    #[serde(default)]
    pub tokens: HashMap<String, String>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl UserInfo {
    pub fn username_or(&self, fallback: &str) -> String {
        self.username.clone().unwrap_or_else(|| fallback.to_string())
    }
}

/// Informational + JSON-Schema record a `CronjobTemplate` plugin publishes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckTemplateMetadata {
    pub label: Option<String>,
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckTemplateAttributes {
    pub metadata: CheckTemplateMetadata,
    /// JSON Schema (draft-07) describing `template_args`.
    pub arguments: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckTemplate {
    pub id: CheckTemplateId,
    pub attributes: CheckTemplateAttributes,
}

/// User-supplied input metadata. `template_id`/`template_args` are required
/// on create, per spec.md §3 (no partial/update variant — update is a
/// documented non-goal).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InCheckMetadata {
    pub name: String,
    pub description: String,
    pub template_id: CheckTemplateId,
    #[serde(default = "default_json_object")]
    pub template_args: serde_json::Value,
}

fn default_json_object() -> serde_json::Value {
    serde_json::json!({})
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InCheckAttributes {
    pub metadata: InCheckMetadata,
    pub schedule: CronExpression,
}

/// Attributes as reconstructed from orchestrator state: everything optional,
/// `extra="allow"` in the original becomes a flattened catch-all map.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutCheckMetadata {
    pub name: Option<String>,
    pub description: Option<String>,
    pub template_id: Option<CheckTemplateId>,
    pub template_args: Option<serde_json::Value>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// The sole bridge to telemetry consumers (spec.md §3): equality conditions
/// on resource/scope/span attributes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutcomeFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_attributes: Option<TelemetryAttributes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope_attributes: Option<TelemetryAttributes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span_attributes: Option<TelemetryAttributes>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutCheckAttributes {
    pub metadata: OutCheckMetadata,
    pub schedule: CronExpression,
    pub outcome_filter: OutcomeFilter,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutCheck {
    pub id: CheckId,
    pub attributes: OutCheckAttributes,
}
