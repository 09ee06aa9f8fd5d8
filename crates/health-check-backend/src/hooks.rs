//! Backend-facing hook stages (spec.md §6.4): `get_k8s_config`,
//! `get_k8s_namespace`, `on_k8s_cronjob_{access,create,remove,run}`,
//! `get_mock_username`.
//!
//! Per REDESIGN FLAGS §9 ("hook chain polymorphism"), each stage is its own
//! narrow trait rather than one heterogeneous callable map — the signature a
//! stage is invoked with is part of its contract. Each trait's `call` is
//! `async` via `async_trait`, matching the rest of this workspace's trait
//! objects (`health-check-templates::CronjobTemplate`).

use async_trait::async_trait;
use health_check_core::{DomainError, UserInfo};
use health_check_plugins::order::{ordered, Sourced};
use k8s_openapi::api::batch::v1::CronJob;

/// Where the per-request Kubernetes client config comes from. Mirrors the
/// original's `get_k8s_config` hook, which returns either a kubeconfig-file
/// path or signals in-cluster config.
#[derive(Debug, Clone)]
pub enum K8sConfigSource {
    /// Load `kube::Config` from a kubeconfig file at this path.
    Kubeconfig(std::path::PathBuf),
    /// Use the in-cluster service-account config.
    InCluster,
}

/// `get_k8s_config`: until-not-null. Required — `OrchestratorBackend`
/// operations fail with `DomainError::Internal` if every hook returns `None`.
#[async_trait]
pub trait GetK8sConfigHook: Send + Sync {
    async fn call(&self, auth: &UserInfo) -> Result<Option<K8sConfigSource>, DomainError>;
}

/// `get_k8s_namespace`: until-not-null. Falls back to `"default"` if every
/// hook returns `None` (an Open Question the original leaves unspecified;
/// see DESIGN.md).
#[async_trait]
pub trait GetK8sNamespaceHook: Send + Sync {
    async fn call(&self, auth: &UserInfo) -> Result<Option<String>, DomainError>;
}

/// `on_k8s_cronjob_access`: run in `check-if-allow` mode for list
/// operations, `ignore-results` mode (raising on denial) for get-by-id,
/// remove, and run.
#[async_trait]
pub trait OnCronjobAccessHook: Send + Sync {
    async fn call(&self, auth: &UserInfo, cronjob: &CronJob) -> Result<(), DomainError>;
}

/// `on_k8s_cronjob_create`: ignore-results, invoked with mutable access to
/// the cronjob so a hook can stamp additional annotations (e.g. `owner`)
/// before it is submitted.
#[async_trait]
pub trait OnCronjobCreateHook: Send + Sync {
    async fn call(&self, auth: &UserInfo, cronjob: &mut CronJob) -> Result<(), DomainError>;
}

/// `on_k8s_cronjob_remove`: ignore-results, fired after the access check and
/// before the DELETE call.
#[async_trait]
pub trait OnCronjobRemoveHook: Send + Sync {
    async fn call(&self, auth: &UserInfo, cronjob: &CronJob) -> Result<(), DomainError>;
}

/// `on_k8s_cronjob_run`: ignore-results, fired after the access check and
/// before the one-off `Job` is created.
#[async_trait]
pub trait OnCronjobRunHook: Send + Sync {
    async fn call(&self, auth: &UserInfo, cronjob: &CronJob) -> Result<(), DomainError>;
}

/// `get_mock_username`: until-not-null, maps the auth object to the
/// partitioning key `MockBackend` stores checks under.
#[async_trait]
pub trait GetMockUsernameHook: Send + Sync {
    async fn call(&self, auth: &UserInfo) -> Result<Option<String>, DomainError>;
}

/// The ordered hook table an `OrchestratorBackend` is constructed with.
/// Built once at process start from per-file-sourced hook lists and never
/// mutated afterward.
#[derive(Default)]
pub struct K8sHooks {
    pub get_config: Vec<Box<dyn GetK8sConfigHook>>,
    pub get_namespace: Vec<Box<dyn GetK8sNamespaceHook>>,
    pub on_access: Vec<Box<dyn OnCronjobAccessHook>>,
    pub on_create: Vec<Box<dyn OnCronjobCreateHook>>,
    pub on_remove: Vec<Box<dyn OnCronjobRemoveHook>>,
    pub on_run: Vec<Box<dyn OnCronjobRunHook>>,
}

impl K8sHooks {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        get_config: Vec<Sourced<Box<dyn GetK8sConfigHook>>>,
        get_namespace: Vec<Sourced<Box<dyn GetK8sNamespaceHook>>>,
        on_access: Vec<Sourced<Box<dyn OnCronjobAccessHook>>>,
        on_create: Vec<Sourced<Box<dyn OnCronjobCreateHook>>>,
        on_remove: Vec<Sourced<Box<dyn OnCronjobRemoveHook>>>,
        on_run: Vec<Sourced<Box<dyn OnCronjobRunHook>>>,
    ) -> Self {
        Self {
            get_config: ordered(get_config),
            get_namespace: ordered(get_namespace),
            on_access: ordered(on_access),
            on_create: ordered(on_create),
            on_remove: ordered(on_remove),
            on_run: ordered(on_run),
        }
    }
}

/// The ordered hook table a `MockBackend` is constructed with.
#[derive(Default)]
pub struct MockHooks {
    pub get_username: Vec<Box<dyn GetMockUsernameHook>>,
}

impl MockHooks {
    pub fn new(get_username: Vec<Sourced<Box<dyn GetMockUsernameHook>>>) -> Self {
        Self {
            get_username: ordered(get_username),
        }
    }
}

/// Default `get_k8s_config` hook: always in-cluster. Deployments that need
/// per-tenant kubeconfig selection register a hook ahead of this one (hook
/// files sort alphabetically; name this one last, e.g. `zz_default.rs`, to
/// keep it a fallback).
pub struct InClusterConfigHook;

#[async_trait]
impl GetK8sConfigHook for InClusterConfigHook {
    async fn call(&self, _auth: &UserInfo) -> Result<Option<K8sConfigSource>, DomainError> {
        Ok(Some(K8sConfigSource::InCluster))
    }
}

/// Default `get_k8s_namespace` hook: reads `RH_CHECK_K8S_NAMESPACE`, falling
/// through to `None` (the backend then defaults to `"default"`).
pub struct EnvNamespaceHook;

#[async_trait]
impl GetK8sNamespaceHook for EnvNamespaceHook {
    async fn call(&self, _auth: &UserInfo) -> Result<Option<String>, DomainError> {
        Ok(std::env::var("RH_CHECK_K8S_NAMESPACE").ok())
    }
}
