//! The Kubernetes-backed `Orchestrator` backend (spec.md §4.5.1): the
//! `CronJob` objects this backend creates/lists/removes/runs in the target
//! cluster ARE the store of record (spec.md Non-goals: no shadow resource).
//!
//! `get_k8s_config`/`get_k8s_namespace` resolve per-request via hooks rather
//! than once at construction, mirroring the original's per-call
//! `get_k8s_config()`/`get_k8s_namespace()` so a deployment can route
//! different tenants at different clusters/namespaces.

use async_trait::async_trait;
use futures::stream;
use health_check_core::{
    CheckId, CheckTemplate, CheckTemplateId, DomainError, InCheckAttributes, OutCheck, Result,
    UserInfo,
};
use health_check_templates::registry::{default_make_check, TemplateRegistry};
use k8s_openapi::api::batch::v1::{CronJob, Job};
use kube::api::{Api, ListParams, PostParams};
use kube::{Client, Config};
use std::sync::Arc;

use crate::hooks::{K8sConfigSource, K8sHooks};
use crate::interface::{CheckBackend, CheckStream};

fn map_kube_err(err: kube::Error) -> DomainError {
    if let kube::Error::Api(ref response) = err {
        if response.code == 422 {
            tracing::error!(error = %response.message, "orchestrator rejected object as unprocessable");
            return DomainError::Internal;
        }
    }
    DomainError::CheckConnection(err.to_string())
}

/// Scopes a resolved `kube::Client` to one request. The original's
/// per-operation `async with get_k8s_client(...) as client:` context manager
/// becomes this RAII guard: the client handle is released (dropped) on every
/// exit path, including early-return error paths, with no explicit cleanup
/// call required at each call site.
struct OrchestratorSession {
    client: Client,
    namespace: String,
}

impl Drop for OrchestratorSession {
    fn drop(&mut self) {
        tracing::debug!(namespace = %self.namespace, "releasing orchestrator session");
    }
}

/// Hooked Kubernetes backend. Holds no per-tenant client state itself —
/// every operation resolves its own [`OrchestratorSession`] from the hook
/// chain, since different requests may resolve to different clusters.
pub struct OrchestratorBackend {
    registry: Arc<TemplateRegistry>,
    hooks: K8sHooks,
}

impl OrchestratorBackend {
    pub fn new(registry: Arc<TemplateRegistry>, hooks: K8sHooks) -> Self {
        Self { registry, hooks }
    }

    async fn resolve_config(&self, auth: &UserInfo) -> Result<K8sConfigSource> {
        for hook in &self.hooks.get_config {
            if let Some(source) = hook.call(auth).await? {
                return Ok(source);
            }
        }
        Err(DomainError::from_opaque("no get_k8s_config hook resolved a config source"))
    }

    async fn resolve_namespace(&self, auth: &UserInfo) -> Result<String> {
        for hook in &self.hooks.get_namespace {
            if let Some(namespace) = hook.call(auth).await? {
                return Ok(namespace);
            }
        }
        Ok("default".to_string())
    }

    async fn session(&self, auth: &UserInfo) -> Result<OrchestratorSession> {
        let namespace = self.resolve_namespace(auth).await?;
        let client = match self.resolve_config(auth).await? {
            K8sConfigSource::InCluster => Client::try_default().await.map_err(map_kube_err)?,
            K8sConfigSource::Kubeconfig(path) => {
                let kubeconfig = kube::config::Kubeconfig::read_from(&path)
                    .map_err(|e| DomainError::CheckConnection(e.to_string()))?;
                let config = Config::from_custom_kubeconfig(kubeconfig, &Default::default())
                    .await
                    .map_err(|e| DomainError::CheckConnection(e.to_string()))?;
                Client::try_from(config).map_err(map_kube_err)?
            }
        };
        Ok(OrchestratorSession { client, namespace })
    }

    async fn check_access(&self, auth: &UserInfo, cronjob: &CronJob) -> Result<()> {
        for hook in &self.hooks.on_access {
            hook.call(auth, cronjob).await?;
        }
        Ok(())
    }

    fn make_check(&self, cronjob: &CronJob) -> OutCheck {
        let template_id = cronjob
            .metadata
            .annotations
            .as_ref()
            .and_then(|a| a.get("template_id"))
            .map(|id| CheckTemplateId::new(id.clone()));

        match template_id.and_then(|id| self.registry.get(&id)) {
            Some(maker) => maker.make_check(cronjob),
            None => default_make_check(cronjob),
        }
    }
}

#[async_trait]
impl CheckBackend for OrchestratorBackend {
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

    #[tracing::instrument(skip(self, auth, input))]
    async fn create_check(&self, auth: &UserInfo, input: InCheckAttributes) -> Result<OutCheck> {
        let maker = self
            .registry
            .get(&input.metadata.template_id)
            .ok_or_else(|| DomainError::CheckTemplateId(input.metadata.template_id.to_string()))?;

        crate::mock::validate_template_args(
            &maker.get_check_template().attributes.arguments,
            &input.metadata.template_args,
        )?;
        health_check_core::cron::validate_cron(input.schedule.as_str())?;

        let mut cronjob = maker.make_cronjob(&input.metadata, input.schedule.as_str(), auth)?;

        for hook in &self.hooks.on_create {
            hook.call(auth, &mut cronjob).await?;
        }

        let session = self.session(auth).await?;
        let api: Api<CronJob> = Api::namespaced(session.client.clone(), &session.namespace);
        let created = api
            .create(&PostParams::default(), &cronjob)
            .await
            .map_err(map_kube_err)?;

        Ok(self.make_check(&created))
    }

    #[tracing::instrument(skip(self, auth))]
    async fn get_checks(
        &self,
        auth: &UserInfo,
        ids: Option<&[CheckId]>,
    ) -> CheckStream<'static, OutCheck> {
        let session = match self.session(auth).await {
            Ok(session) => session,
            Err(err) => return Box::pin(stream::iter(vec![Err(err)])),
        };
        let api: Api<CronJob> = Api::namespaced(session.client.clone(), &session.namespace);
        let cronjobs = match api.list(&ListParams::default()).await {
            Ok(list) => list.items,
            Err(err) => return Box::pin(stream::iter(vec![Err(map_kube_err(err))])),
        };

        let mut out = Vec::new();
        for cronjob in cronjobs {
            let id = CheckId::new(cronjob.metadata.name.clone().unwrap_or_default());
            if let Some(ids) = ids {
                if !ids.contains(&id) {
                    continue;
                }
            }
            match self.check_access(auth, &cronjob).await {
                Ok(()) => out.push(Ok(self.make_check(&cronjob))),
                // check-if-allow (spec.md §4.5.1): only a denial drops the
                // item; any other error (e.g. a connection failure) must
                // propagate instead of being silently swallowed.
                Err(err) if err.is_access_denial() => continue,
                Err(err) => return Box::pin(stream::iter(vec![Err(err)])),
            }
        }
        Box::pin(stream::iter(out))
    }

    #[tracing::instrument(skip(self, auth))]
    async fn remove_check(&self, auth: &UserInfo, id: &CheckId) -> Result<()> {
        let session = self.session(auth).await?;
        let api: Api<CronJob> = Api::namespaced(session.client.clone(), &session.namespace);
        let cronjob = api
            .get(id.as_str())
            .await
            .map_err(|_| DomainError::CheckId(id.to_string()))?;

        self.check_access(auth, &cronjob).await?;
        for hook in &self.hooks.on_remove {
            hook.call(auth, &cronjob).await?;
        }

        api.delete(id.as_str(), &Default::default())
            .await
            .map_err(map_kube_err)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, auth))]
    async fn run_check(&self, auth: &UserInfo, id: &CheckId) -> Result<()> {
        let session = self.session(auth).await?;
        let cronjob_api: Api<CronJob> = Api::namespaced(session.client.clone(), &session.namespace);
        let cronjob = cronjob_api
            .get(id.as_str())
            .await
            .map_err(|_| DomainError::CheckId(id.to_string()))?;

        self.check_access(auth, &cronjob).await?;
        for hook in &self.hooks.on_run {
            hook.call(auth, &cronjob).await?;
        }

        let job_template = cronjob
            .spec
            .as_ref()
            .ok_or_else(|| DomainError::from_opaque("cronjob has no spec"))?
            .job_template
            .clone();

        let owner_reference = k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference {
            api_version: "batch/v1".to_string(),
            kind: "CronJob".to_string(),
            name: cronjob.metadata.name.clone().unwrap_or_default(),
            uid: cronjob.metadata.uid.clone().unwrap_or_default(),
            controller: Some(true),
            block_owner_deletion: Some(true),
        };

        let job = Job {
            metadata: k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta {
                name: Some(uuid::Uuid::new_v4().to_string()),
                labels: job_template.metadata.labels.clone(),
                annotations: job_template.metadata.annotations.clone(),
                owner_references: Some(vec![owner_reference]),
                ..Default::default()
            },
            spec: job_template.spec,
            status: None,
        };

        let job_api: Api<Job> = Api::namespaced(session.client.clone(), &session.namespace);
        job_api
            .create(&PostParams::default(), &job)
            .await
            .map_err(map_kube_err)?;
        Ok(())
    }
}
