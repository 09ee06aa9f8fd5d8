//! `default_k8s_template`: runs an arbitrary caller-supplied Python script
//! (plus optional pip requirements) inside the runner image. Ported from
//! `template_examples/script_template.py`.

use health_check_core::{
    CheckTemplate, CheckTemplateAttributes, CheckTemplateId, CheckTemplateMetadata, DomainError,
    UserInfo,
};
use k8s_openapi::api::batch::v1::CronJob;
use serde_json::Value as Json;
use std::collections::BTreeMap;

use crate::builder::{default_runner_image, make_base_cronjob};
use crate::registry::CronjobTemplate;

/// Runs a caller-supplied Python script inside the runner image.
pub struct DefaultK8sTemplate;

impl CronjobTemplate for DefaultK8sTemplate {
    fn get_check_template(&self) -> CheckTemplate {
        CheckTemplate {
            id: CheckTemplateId::new("default_k8s_template"),
            attributes: CheckTemplateAttributes {
                metadata: CheckTemplateMetadata {
                    label: Some("Default Kubernetes template".to_string()),
                    description: Some(
                        "Default template for checks in the Kubernetes backend.".to_string(),
                    ),
                    extra: Default::default(),
                },
                arguments: serde_json::json!({
                    "$schema": "http://json-schema.org/draft-07/schema",
                    "type": "object",
                    "properties": {
                        "health_check.name": {"type": "string"},
                        "script": {"type": "string", "format": "textarea"},
                        "requirements": {"type": "string", "format": "textarea"},
                    },
                    "required": ["health_check.name", "script"],
                }),
            },
        }
    }

    fn make_cronjob(
        &self,
        template_args: &Json,
        schedule: &str,
        _userinfo: &UserInfo,
    ) -> Result<CronJob, DomainError> {
        let script = template_args
            .get("script")
            .and_then(Json::as_str)
            .ok_or_else(|| DomainError::JsonValidation {
                pointer: "/data/attributes/metadata/template_args/script".to_string(),
                detail: "required property 'script' is missing or not a string".to_string(),
                meta: serde_json::json!({}),
            })?;
        let requirements = template_args.get("requirements").and_then(Json::as_str);

        let mut env = BTreeMap::new();
        if !script.is_empty() {
            env.insert("RESOURCE_HEALTH_RUNNER_SCRIPT".to_string(), script.to_string());
        }
        if let Some(requirements) = requirements {
            if !requirements.is_empty() {
                env.insert(
                    "RESOURCE_HEALTH_RUNNER_REQUIREMENTS".to_string(),
                    requirements.to_string(),
                );
            }
        }

        let mut cronjob = make_base_cronjob(&health_check_core::CronExpression::new(schedule), None);
        let container = crate::builder::container(
            "healthcheck",
            &default_runner_image(),
            &env,
            &BTreeMap::new(),
            None,
            None,
            &BTreeMap::new(),
        );
        cronjob
            .spec
            .as_mut()
            .expect("make_base_cronjob always sets spec")
            .job_template
            .spec
            .as_mut()
            .expect("make_base_cronjob always sets a job spec")
            .template
            .spec
            .as_mut()
            .expect("make_base_cronjob always sets a pod spec")
            .containers = vec![container];

        Ok(cronjob)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_missing_script() {
        let template = DefaultK8sTemplate;
        let userinfo = UserInfo::default();
        let args = serde_json::json!({"health_check.name": "x"});
        assert!(template.make_cronjob(&args, "* * * * *", &userinfo).is_err());
    }

    #[test]
    fn sets_script_and_requirements_env() {
        let template = DefaultK8sTemplate;
        let userinfo = UserInfo::default();
        let args = serde_json::json!({
            "health_check.name": "x",
            "script": "print('hi')",
            "requirements": "requests",
        });
        let cronjob = template.make_cronjob(&args, "* * * * *", &userinfo).unwrap();
        let env = cronjob.spec.unwrap().job_template.spec.unwrap().template.spec.unwrap().containers[0]
            .env
            .clone()
            .unwrap();
        assert!(env.iter().any(|e| e.name == "RESOURCE_HEALTH_RUNNER_SCRIPT"));
        assert!(env.iter().any(|e| e.name == "RESOURCE_HEALTH_RUNNER_REQUIREMENTS"));
    }
}
