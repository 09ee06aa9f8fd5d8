//! The in-memory `Mock` backend (spec.md §4.5.2): same validation pipeline
//! as the orchestrator backend, minus orchestrator I/O. Partitioned by a
//! `get_mock_username` hook so tenant isolation (spec.md §8 property 4) is
//! enforced the same way a production deployment's username-projection hook
//! would enforce it.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream;
use health_check_core::{
    CheckId, CheckTemplate, CheckTemplateId, CronExpression, DomainError, InCheckAttributes,
    OutCheck, Result, UserInfo,
};
use health_check_templates::registry::TemplateRegistry;
use jsonschema::Draft;
use k8s_openapi::api::batch::v1::CronJob;
use std::sync::Arc;

use crate::hooks::MockHooks;
use crate::interface::{CheckBackend, CheckStream};

/// Validates `template_args` against `schema`, returning
/// `DomainError::JsonValidation` with the pointer and full error context
/// spec.md §7 promises (`source.pointer`, `meta`) on the first violation.
pub(crate) fn validate_template_args(
    schema: &serde_json::Value,
    template_args: &serde_json::Value,
) -> Result<()> {
    let compiled = jsonschema::options()
        .with_draft(Draft::Draft7)
        .build(schema)
        .map_err(|err| DomainError::Internal.tap_log(&err))?;

    if let Some(first) = compiled.iter_errors(template_args).next() {
        // Mirrors `mock_backend.py`'s hardcoded pointer: always the
        // `template_args` container itself, trailing slash included,
        // regardless of which nested property the schema violation is in.
        return Err(DomainError::JsonValidation {
            pointer: "/data/attributes/metadata/template_args/".to_string(),
            detail: first.to_string(),
            meta: serde_json::json!({ "schema": schema }),
        });
    }
    Ok(())
}

/// Small extension so a schema-compile failure (a template author's bug, not
/// a client error) still logs before collapsing to `Internal`.
trait TapLog {
    fn tap_log<E: std::fmt::Display>(self, err: E) -> Self;
}

impl TapLog for DomainError {
    fn tap_log<E: std::fmt::Display>(self, err: E) -> Self {
        tracing::error!(error = %err, "failed to compile template argument schema");
        self
    }
}

/// In-memory check storage, partitioned by the key `get_mock_username`
/// resolves for the caller. Stores the tagged `CronJob` each check was
/// materialised as, so `make_check` reconstruction (and thus round-trip
/// identity, spec.md §8 property 1) goes through the exact same code path
/// the orchestrator backend uses.
pub struct MockBackend {
    registry: Arc<TemplateRegistry>,
    hooks: MockHooks,
    storage: Mutex<HashMap<String, HashMap<CheckId, CronJob>>>,
}

impl MockBackend {
    pub fn new(registry: Arc<TemplateRegistry>, hooks: MockHooks) -> Self {
        Self {
            registry,
            hooks,
            storage: Mutex::new(HashMap::new()),
        }
    }

    async fn resolve_username(&self, auth: &UserInfo) -> Result<String> {
        for hook in &self.hooks.get_username {
            if let Some(username) = hook.call(auth).await? {
                return Ok(username);
            }
        }
        Ok(auth.username_or("anonymous"))
    }
}

#[async_trait]
impl CheckBackend for MockBackend {
    type Auth = UserInfo;

    async fn get_check_templates(
        &self,
        _auth: &UserInfo,
        ids: Option<&[CheckTemplateId]>,
    ) -> CheckStream<'static, CheckTemplate> {
        let templates: Vec<Result<CheckTemplate>> = self
            .registry
            .list_templates()
            .into_iter()
            .filter(|t| ids.is_none_or(|ids| ids.contains(&t.id)))
            .map(Ok)
            .collect();
        Box::pin(stream::iter(templates))
    }

    async fn create_check(&self, auth: &UserInfo, input: InCheckAttributes) -> Result<OutCheck> {
        let username = self.resolve_username(auth).await?;

        let maker = self
            .registry
            .get(&input.metadata.template_id)
            .ok_or_else(|| DomainError::CheckTemplateId(input.metadata.template_id.to_string()))?;

        validate_template_args(
            &maker.get_check_template().attributes.arguments,
            &input.metadata.template_args,
        )?;
        health_check_core::cron::validate_cron(input.schedule.as_str())?;

        let cronjob = maker.make_cronjob(&input.metadata, input.schedule.as_str(), auth)?;
        let out_check = maker.make_check(&cronjob);

        let mut storage = self.storage.lock().expect("mock storage mutex poisoned");
        storage
            .entry(username)
            .or_default()
            .insert(out_check.id.clone(), cronjob);

        Ok(out_check)
    }

    async fn get_checks(
        &self,
        auth: &UserInfo,
        ids: Option<&[CheckId]>,
    ) -> CheckStream<'static, OutCheck> {
        let username = match self.resolve_username(auth).await {
            Ok(username) => username,
            Err(err) => return Box::pin(stream::iter(vec![Err(err)])),
        };

        let storage = self.storage.lock().expect("mock storage mutex poisoned");
        let checks: Vec<Result<OutCheck>> = storage
            .get(&username)
            .into_iter()
            .flat_map(|byid| byid.iter())
            .filter(|(id, _)| ids.is_none_or(|ids| ids.contains(id)))
            .map(|(_, cronjob)| Ok(self.make_check(cronjob)))
            .collect();
        Box::pin(stream::iter(checks))
    }

    async fn remove_check(&self, auth: &UserInfo, id: &CheckId) -> Result<()> {
        let username = self.resolve_username(auth).await?;
        let mut storage = self.storage.lock().expect("mock storage mutex poisoned");
        let removed = storage.get_mut(&username).and_then(|byid| byid.remove(id));
        removed
            .map(|_| ())
            .ok_or_else(|| DomainError::CheckId(id.to_string()))
    }

    async fn run_check(&self, auth: &UserInfo, id: &CheckId) -> Result<()> {
        let username = self.resolve_username(auth).await?;
        let storage = self.storage.lock().expect("mock storage mutex poisoned");
        storage
            .get(&username)
            .and_then(|byid| byid.get(id))
            .map(|_| ())
            .ok_or_else(|| DomainError::CheckId(id.to_string()))
    }
}

impl MockBackend {
    /// Reconstructs an `OutCheck` from a stored cronjob via the template
    /// that produced it, falling back to the registry's default
    /// reconstruction for an absent/unknown `template_id`, per spec.md §4.4.
    fn make_check(&self, cronjob: &CronJob) -> OutCheck {
        let template_id = cronjob
            .metadata
            .annotations
            .as_ref()
            .and_then(|a| a.get("template_id"))
            .map(|id| CheckTemplateId::new(id.clone()));

        match template_id.and_then(|id| self.registry.get(&id)) {
            Some(maker) => maker.make_check(cronjob),
            None => health_check_templates::registry::default_make_check(cronjob),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use health_check_core::InCheckMetadata;
    use health_check_templates::builtin::builtin_templates;

    fn registry() -> Arc<TemplateRegistry> {
        Arc::new(TemplateRegistry::new(builtin_templates()))
    }

    fn backend() -> MockBackend {
        MockBackend::new(registry(), MockHooks::default())
    }

    fn in_check(template_id: &str, args: serde_json::Value) -> InCheckAttributes {
        InCheckAttributes {
            metadata: InCheckMetadata {
                name: "n".to_string(),
                description: "d".to_string(),
                template_id: CheckTemplateId::new(template_id),
                template_args: args,
            },
            schedule: CronExpression::new("* * * * *"),
        }
    }

    #[tokio::test]
    async fn round_trip_identity() {
        let backend = backend();
        let auth = UserInfo {
            username: Some("alice".to_string()),
            ..Default::default()
        };
        let created = backend
            .create_check(
                &auth,
                in_check("default_k8s_template", serde_json::json!({"health_check.name": "x", "script": "print(1)"})),
            )
            .await
            .unwrap();

        use futures::StreamExt;
        let fetched: Vec<_> = backend
            .get_checks(&auth, Some(&[created.id.clone()]))
            .await
            .collect()
            .await;
        assert_eq!(fetched.len(), 1);
        let fetched = fetched.into_iter().next().unwrap().unwrap();
        assert_eq!(fetched.id, created.id);
        assert_eq!(
            fetched.attributes.metadata.template_id,
            Some(CheckTemplateId::new("default_k8s_template"))
        );
    }

    #[tokio::test]
    async fn unknown_template_rejected() {
        let backend = backend();
        let auth = UserInfo::default();
        let err = backend
            .create_check(&auth, in_check("nope", serde_json::json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::CheckTemplateId(_)));
    }

    #[tokio::test]
    async fn schema_violation_has_no_side_effect() {
        let backend = backend();
        let auth = UserInfo::default();
        let err = backend
            .create_check(&auth, in_check("default_k8s_template", serde_json::json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::JsonValidation { .. }));

        use futures::StreamExt;
        let checks: Vec<_> = backend.get_checks(&auth, None).await.collect().await;
        assert!(checks.is_empty());
    }

    #[tokio::test]
    async fn bad_cron_rejected() {
        let backend = backend();
        let auth = UserInfo::default();
        let mut input = in_check(
            "default_k8s_template",
            serde_json::json!({"health_check.name": "x", "script": "print(1)"}),
        );
        input.schedule = CronExpression::new("not a cron");
        let err = backend.create_check(&auth, input).await.unwrap_err();
        assert!(matches!(err, DomainError::CronValidation { .. }));
    }

    #[tokio::test]
    async fn tenant_isolation() {
        let backend = backend();
        let alice = UserInfo {
            username: Some("alice".to_string()),
            ..Default::default()
        };
        let bob = UserInfo {
            username: Some("bob".to_string()),
            ..Default::default()
        };
        backend
            .create_check(
                &alice,
                in_check("default_k8s_template", serde_json::json!({"health_check.name": "x", "script": "print(1)"})),
            )
            .await
            .unwrap();

        use futures::StreamExt;
        let bobs_checks: Vec<_> = backend.get_checks(&bob, None).await.collect().await;
        assert!(bobs_checks.is_empty());
    }

    #[tokio::test]
    async fn remove_unknown_check_is_not_found() {
        let backend = backend();
        let auth = UserInfo::default();
        let err = backend
            .remove_check(&auth, &CheckId::new("does-not-exist"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::CheckId(_)));
    }
}
