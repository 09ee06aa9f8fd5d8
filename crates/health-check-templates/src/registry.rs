//! The `CronjobTemplate` trait, `CronjobMaker` wrapper, and the in-memory
//! registry that holds every template a deployment ships (spec.md §4.4, C4).
//!
//! REDESIGN FLAGS §9 makes compile-time registration the default path: a
//! `TemplateRegistry` is built once from a `Vec<Box<dyn CronjobTemplate>>`
//! at process start, rather than scanning a directory of plugin files the
//! way `load_templates` did in the original. The optional, wasm-gated
//! directory scan (`health_check_plugins::loader`) can still feed additional
//! entries into the same registry when a deployment configures one.

use std::collections::HashMap;

use health_check_core::{
    CheckId, CheckTemplate, CheckTemplateId, DomainError, InCheckMetadata, OutCheck,
    OutCheckAttributes, OutCheckMetadata, OutcomeFilter, UserInfo,
};
use k8s_openapi::api::batch::v1::CronJob;
use serde_json::Value as Json;

use crate::otel::{check_id_of, tag_cronjob};

/// One pluggable check template: turns `template_args` + a cron schedule
/// into the `CronJob` the orchestrator runs. Mirrors `CronjobTemplate`/
/// `CronjobTemplateProtocol`.
pub trait CronjobTemplate: Send + Sync {
    /// Informational record (label, description, JSON-Schema for
    /// `template_args`) published via `GET /check_templates/`.
    fn get_check_template(&self) -> CheckTemplate;

    /// Builds the cronjob. `userinfo` is threaded through so a template can
    /// tailor the job to the caller (e.g. per-user OIDC secrets).
    fn make_cronjob(&self, template_args: &Json, schedule: &str, userinfo: &UserInfo) -> Result<CronJob, DomainError>;
}

/// Wraps a `CronjobTemplate` with the three deterministic post-steps every
/// cronjob goes through regardless of which template produced it
/// (identity tagging, OTel resource attributes, OTLP exporter wiring).
/// Mirrors `CronjobMaker`.
pub struct CronjobMaker {
    template: Box<dyn CronjobTemplate>,
}

impl CronjobMaker {
    pub fn new(template: Box<dyn CronjobTemplate>) -> Self {
        Self { template }
    }

    pub fn get_check_template(&self) -> CheckTemplate {
        self.template.get_check_template()
    }

    pub fn make_cronjob(
        &self,
        metadata: &InCheckMetadata,
        schedule: &str,
        userinfo: &UserInfo,
    ) -> Result<CronJob, DomainError> {
        let cronjob = self
            .template
            .make_cronjob(&metadata.template_args, schedule, userinfo)?;
        Ok(tag_cronjob(cronjob, metadata, userinfo))
    }

    /// Reconstructs an `OutCheck` from a previously tagged cronjob. Mirrors
    /// `_make_check`/`default_make_check` — every template shares this
    /// reconstruction, since the tagging annotations are template-agnostic.
    pub fn make_check(&self, cronjob: &CronJob) -> OutCheck {
        default_make_check(cronjob)
    }
}

/// The annotation-driven reconstruction shared by every template. Mirrors
/// `templates.default_make_check`.
pub fn default_make_check(cronjob: &CronJob) -> OutCheck {
    let annotations = cronjob.metadata.annotations.clone().unwrap_or_default();
    let name = annotations.get("name").cloned();
    let description = annotations.get("description").cloned();
    let template_id = annotations.get("template_id").cloned().map(CheckTemplateId::new);
    let template_args = annotations
        .get("template_args")
        .and_then(|raw| serde_json::from_str(raw).ok())
        .unwrap_or_else(|| serde_json::json!({}));

    let check_id = check_id_of(cronjob);
    let schedule = cronjob
        .spec
        .as_ref()
        .map(|spec| spec.schedule.clone())
        .unwrap_or_default();

    OutCheck {
        id: check_id.clone(),
        attributes: OutCheckAttributes {
            metadata: OutCheckMetadata {
                name,
                description,
                template_id,
                template_args: Some(template_args),
                extra: HashMap::new(),
            },
            schedule: health_check_core::CronExpression::new(schedule),
            outcome_filter: OutcomeFilter {
                resource_attributes: Some(HashMap::from([(
                    "k8s.cronjob.name".to_string(),
                    Json::String(check_id.as_str().to_string()),
                )])),
                scope_attributes: None,
                span_attributes: None,
            },
        },
    }
}

/// Immutable, process-lifetime table of every registered template, keyed by
/// [`CheckTemplateId`]. Mirrors `load_templates`'s return value, minus the
/// filesystem scan: entries are registered once at startup (built-ins plus
/// whatever an optional wasm scan contributed) and never mutate afterward.
pub struct TemplateRegistry {
    makers: HashMap<CheckTemplateId, CronjobMaker>,
}

impl TemplateRegistry {
    pub fn new(templates: Vec<Box<dyn CronjobTemplate>>) -> Self {
        let mut makers = HashMap::new();
        for template in templates {
            let maker = CronjobMaker::new(template);
            let id = maker.get_check_template().id;
            makers.insert(id, maker);
        }
        Self { makers }
    }

    pub fn get(&self, id: &CheckTemplateId) -> Option<&CronjobMaker> {
        self.makers.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CronjobMaker> {
        self.makers.values()
    }

    pub fn list_templates(&self) -> Vec<CheckTemplate> {
        self.makers.values().map(CronjobMaker::get_check_template).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::{ping::SimplePing, script::DefaultK8sTemplate};

    #[test]
    fn registry_indexes_by_template_id() {
        let registry: TemplateRegistry = TemplateRegistry::new(vec![
            Box::new(SimplePing),
            Box::new(DefaultK8sTemplate),
        ]);
        assert!(registry.get(&CheckTemplateId::new("simple_ping")).is_some());
        assert!(registry.get(&CheckTemplateId::new("default_k8s_template")).is_some());
        assert!(registry.get(&CheckTemplateId::new("nonexistent")).is_none());
        assert_eq!(registry.list_templates().len(), 2);
    }
}
