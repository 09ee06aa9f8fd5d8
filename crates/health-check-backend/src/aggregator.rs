//! The fan-out `Aggregator` backend (spec.md §4.5.4): wraps a fixed, ordered
//! list of backends and either concatenates (list ops), routes by explicit
//! index (create), or fans out with per-branch exception capture and a
//! reduction rule (remove/run).

use async_trait::async_trait;
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use health_check_core::{
    CheckId, CheckTemplate, CheckTemplateId, DomainError, InCheckAttributes, OutCheck, Result,
    UserInfo,
};

use crate::interface::{CheckBackend, CheckStream};

/// One fan-out member, fully type-erased behind the `CheckBackend` trait
/// object so the aggregator can hold a heterogeneous mix (e.g. a `Mock` and
/// a `Remote` side by side).
pub type DynBackend = Box<dyn CheckBackend<Auth = UserInfo> + Send + Sync>;

/// Wraps a fixed, ordered list of backends. Routing and reduction rules
/// mirror spec.md §4.5.4 exactly; fan-out (remove/run) is disabled for
/// `createCheck` to avoid duplicate creates, matching the original's
/// commented-out fan-out path.
pub struct AggregatorBackend {
    backends: Vec<DynBackend>,
}

impl AggregatorBackend {
    pub fn new(backends: Vec<DynBackend>) -> Self {
        Self { backends }
    }

    /// Pulls the integer `service_index` out of `template_args`, stripping
    /// it from the stored args in the same step so it never leaks into a
    /// persisted check (testable property 6).
    fn extract_service_index(template_args: &mut serde_json::Value) -> Result<usize> {
        let object = template_args.as_object_mut().ok_or_else(|| DomainError::UserInput {
            title: "Invalid template_args".to_string(),
            detail: "template_args must be a JSON object when using the aggregator backend".to_string(),
        })?;

        let index = object
            .remove("service_index")
            .ok_or_else(|| DomainError::UserInput {
                title: "Missing service_index".to_string(),
                detail: "template_args.service_index is required when using the aggregator backend"
                    .to_string(),
            })?
            .as_u64()
            .ok_or_else(|| DomainError::UserInput {
                title: "Invalid service_index".to_string(),
                detail: "template_args.service_index must be a non-negative integer".to_string(),
            })?;

        Ok(index as usize)
    }

    /// Reduces fan-out results per spec.md §4.5.4's remove/run rule: one
    /// success wins; two or more is ambiguous; zero successes re-raises the
    /// most informative failure, preferring a non-`CheckIdError` one.
    fn reduce(results: Vec<Result<()>>) -> Result<()> {
        let successes = results.iter().filter(|r| r.is_ok()).count();
        if successes == 1 {
            return Ok(());
        }
        if successes >= 2 {
            return Err(DomainError::CheckIdNonUnique {
                detail: format!("check id found on {successes} backends"),
            });
        }

        let mut first_check_id_failure = None;
        for result in results {
            match result {
                Err(DomainError::CheckId(id)) => {
                    first_check_id_failure.get_or_insert(DomainError::CheckId(id));
                }
                Err(other) => return Err(other),
                Ok(()) => unreachable!("successes == 0 branch"),
            }
        }
        Err(first_check_id_failure.unwrap_or(DomainError::Internal))
    }
}

#[async_trait]
impl CheckBackend for AggregatorBackend {
    type Auth = UserInfo;

    #[tracing::instrument(skip(self, auth))]
    async fn get_check_templates(
        &self,
        auth: &UserInfo,
        ids: Option<&[CheckTemplateId]>,
    ) -> CheckStream<'static, CheckTemplate> {
        let mut concatenated = Vec::new();
        for backend in &self.backends {
            let mut items: Vec<Result<CheckTemplate>> =
                backend.get_check_templates(auth, ids).await.collect().await;
            concatenated.append(&mut items);
        }
        Box::pin(stream::iter(concatenated))
    }

    #[tracing::instrument(skip(self, auth, input))]
    async fn create_check(&self, auth: &UserInfo, mut input: InCheckAttributes) -> Result<OutCheck> {
        let index = Self::extract_service_index(&mut input.metadata.template_args)?;
        let backend = self.backends.get(index).ok_or_else(|| DomainError::UserInput {
            title: "Invalid service_index".to_string(),
            detail: format!("service_index {index} does not name a configured backend"),
        })?;
        backend.create_check(auth, input).await
    }

    #[tracing::instrument(skip(self, auth))]
    async fn get_checks(
        &self,
        auth: &UserInfo,
        ids: Option<&[CheckId]>,
    ) -> CheckStream<'static, OutCheck> {
        let mut concatenated = Vec::new();
        for backend in &self.backends {
            let mut items: Vec<Result<OutCheck>> = backend.get_checks(auth, ids).await.collect().await;
            concatenated.append(&mut items);
        }
        Box::pin(stream::iter(concatenated))
    }

    #[tracing::instrument(skip(self, auth))]
    async fn remove_check(&self, auth: &UserInfo, id: &CheckId) -> Result<()> {
        let results = join_all(self.backends.iter().map(|backend| backend.remove_check(auth, id))).await;
        Self::reduce(results)
    }

    #[tracing::instrument(skip(self, auth))]
    async fn run_check(&self, auth: &UserInfo, id: &CheckId) -> Result<()> {
        let results = join_all(self.backends.iter().map(|backend| backend.run_check(auth, id))).await;
        Self::reduce(results)
    }

    async fn aclose(&self) -> Result<()> {
        let results = join_all(self.backends.iter().map(|backend| backend.aclose())).await;
        for result in results {
            if let Err(err) = result {
                tracing::error!(error = %err, "backend failed to close during aggregator shutdown");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockBackend;
    use health_check_templates::builtin::builtin_templates;
    use health_check_templates::registry::TemplateRegistry;
    use std::sync::Arc;

    fn aggregator_of_two_mocks() -> AggregatorBackend {
        let backend_a = MockBackend::new(
            Arc::new(TemplateRegistry::new(builtin_templates())),
            crate::hooks::MockHooks::default(),
        );
        let backend_b = MockBackend::new(
            Arc::new(TemplateRegistry::new(builtin_templates())),
            crate::hooks::MockHooks::default(),
        );
        AggregatorBackend::new(vec![Box::new(backend_a), Box::new(backend_b)])
    }

    fn in_check(args: serde_json::Value) -> InCheckAttributes {
        use health_check_core::{CronExpression, InCheckMetadata};
        InCheckAttributes {
            metadata: InCheckMetadata {
                name: "n".to_string(),
                description: "d".to_string(),
                template_id: CheckTemplateId::new("default_k8s_template"),
                template_args: args,
            },
            schedule: CronExpression::new("* * * * *"),
        }
    }

    #[tokio::test]
    async fn routes_create_by_service_index_and_strips_field() {
        let aggregator = aggregator_of_two_mocks();
        let auth = UserInfo::default();
        let args = serde_json::json!({"health_check.name": "x", "script": "print(1)", "service_index": 1});
        let created = aggregator.create_check(&auth, in_check(args)).await.unwrap();
        assert!(created
            .attributes
            .metadata
            .template_args
            .as_ref()
            .and_then(|v| v.get("service_index"))
            .is_none());

        use futures::StreamExt;
        let from_aggregate: Vec<_> = aggregator.get_checks(&auth, None).await.collect().await;
        assert_eq!(from_aggregate.len(), 1);
    }

    #[tokio::test]
    async fn missing_service_index_is_user_input_error() {
        let aggregator = aggregator_of_two_mocks();
        let auth = UserInfo::default();
        let args = serde_json::json!({"health_check.name": "x", "script": "print(1)"});
        let err = aggregator.create_check(&auth, in_check(args)).await.unwrap_err();
        assert!(matches!(err, DomainError::UserInput { .. }));
    }

    #[tokio::test]
    async fn remove_missing_everywhere_is_check_id_error() {
        let aggregator = aggregator_of_two_mocks();
        let auth = UserInfo::default();
        let err = aggregator
            .remove_check(&auth, &CheckId::new("nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::CheckId(_)));
    }
}
