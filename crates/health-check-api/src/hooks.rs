//! Request-pipeline hook stages (spec.md §4.6, §6.4): `get_fastapi_security`,
//! `on_auth`, `on_template_access`, `on_check_access`, `on_check_create`,
//! `on_check_remove`, `on_check_run`.
//!
//! As with `health-check-backend::hooks`, each stage gets its own narrow
//! trait rather than a shared closure map (REDESIGN FLAGS §9). The simpler
//! list/filter stages (template/check access) reuse the generic
//! `health_check_plugins::hooks` composition functions directly, since those
//! stages really are homogeneous zero-arg-closure hooks once the per-item
//! arguments are captured at the call site.

use std::sync::Arc;

use async_trait::async_trait;
use health_check_core::{CheckTemplate, DomainError, InCheckAttributes, OutCheck, UserInfo};
use health_check_plugins::hooks::{check_if_allow, ignore_results, is_access_denial, BoxFuture, SideEffectHook};
use health_check_plugins::order::{ordered, Sourced};

/// Raw, scheme-specific authentication material extracted from the request
/// before it is projected into a [`UserInfo`]. The built-in scheme is a
/// bearer token; deployments needing mTLS client certs or signed cookies
/// provide their own hook ahead of the default.
#[derive(Debug, Clone)]
pub struct RawAuth {
    pub bearer_token: String,
}

/// `get_fastapi_security`: until-not-null. Resolves raw auth material from
/// the incoming request headers.
#[async_trait]
pub trait GetSecurityHook: Send + Sync {
    async fn call(&self, headers: &http::HeaderMap) -> Result<Option<RawAuth>, DomainError>;
}

/// `on_auth`: until-not-null. Projects raw material into a [`UserInfo`].
#[async_trait]
pub trait OnAuthHook: Send + Sync {
    async fn call(&self, raw: Option<&RawAuth>) -> Result<Option<UserInfo>, DomainError>;
}

/// `on_template_access`: ignore-results for the create path, check-if-allow
/// for list filtering — the composition mode is the caller's choice, so this
/// trait only exposes the side-effecting call.
#[async_trait]
pub trait OnTemplateAccessHook: Send + Sync {
    async fn call(&self, auth: &UserInfo, template: &CheckTemplate) -> Result<(), DomainError>;
}

/// `on_check_access`: same shape as `on_template_access`, over an `OutCheck`.
#[async_trait]
pub trait OnCheckAccessHook: Send + Sync {
    async fn call(&self, auth: &UserInfo, check: &OutCheck) -> Result<(), DomainError>;
}

/// `on_check_create`: ignore-results, fired after template access and before
/// the backend's `create_check` call.
#[async_trait]
pub trait OnCheckCreateHook: Send + Sync {
    async fn call(&self, auth: &UserInfo, input: &InCheckAttributes) -> Result<(), DomainError>;
}

/// `on_check_remove`: ignore-results, fired after `on_check_access` and
/// before the backend's `remove_check` call.
#[async_trait]
pub trait OnCheckRemoveHook: Send + Sync {
    async fn call(&self, auth: &UserInfo, check: &OutCheck) -> Result<(), DomainError>;
}

/// `on_check_run`: ignore-results, fired after `on_check_access` and before
/// the backend's `run_check` call.
#[async_trait]
pub trait OnCheckRunHook: Send + Sync {
    async fn call(&self, auth: &UserInfo, check: &OutCheck) -> Result<(), DomainError>;
}

/// The ordered hook table the router is built with. Built once at process
/// start from per-file-sourced hook lists and never mutated afterward.
#[derive(Default)]
pub struct ApiHooks {
    pub get_security: Vec<Box<dyn GetSecurityHook>>,
    pub on_auth: Vec<Box<dyn OnAuthHook>>,
    pub on_template_access: Vec<Box<dyn OnTemplateAccessHook>>,
    pub on_check_access: Vec<Box<dyn OnCheckAccessHook>>,
    pub on_check_create: Vec<Box<dyn OnCheckCreateHook>>,
    pub on_check_remove: Vec<Box<dyn OnCheckRemoveHook>>,
    pub on_check_run: Vec<Box<dyn OnCheckRunHook>>,
}

impl ApiHooks {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        get_security: Vec<Sourced<Box<dyn GetSecurityHook>>>,
        on_auth: Vec<Sourced<Box<dyn OnAuthHook>>>,
        on_template_access: Vec<Sourced<Box<dyn OnTemplateAccessHook>>>,
        on_check_access: Vec<Sourced<Box<dyn OnCheckAccessHook>>>,
        on_check_create: Vec<Sourced<Box<dyn OnCheckCreateHook>>>,
        on_check_remove: Vec<Sourced<Box<dyn OnCheckRemoveHook>>>,
        on_check_run: Vec<Sourced<Box<dyn OnCheckRunHook>>>,
    ) -> Self {
        Self {
            get_security: ordered(get_security),
            on_auth: ordered(on_auth),
            on_template_access: ordered(on_template_access),
            on_check_access: ordered(on_check_access),
            on_check_create: ordered(on_check_create),
            on_check_remove: ordered(on_check_remove),
            on_check_run: ordered(on_check_run),
        }
    }

    /// Runs `get_fastapi_security` then `on_auth` in sequence. `Ok(None)`
    /// means the request is anonymous; callers on a route that requires auth
    /// turn that into `DomainError::Forbidden` themselves (spec.md §4.6 step
    /// 2), since whether a given route tolerates anonymous access is a
    /// per-route decision, not this function's.
    pub async fn authenticate(&self, headers: &http::HeaderMap) -> Result<Option<UserInfo>, DomainError> {
        let mut raw = None;
        for hook in &self.get_security {
            if let Some(material) = hook.call(headers).await? {
                raw = Some(material);
                break;
            }
        }

        for hook in &self.on_auth {
            if let Some(userinfo) = hook.call(raw.as_ref()).await? {
                return Ok(Some(userinfo));
            }
        }
        Ok(None)
    }

    /// Check-if-allow over `on_template_access` (spec.md §4.6 step 3): used by
    /// the list route, where a denied item silently disappears rather than
    /// failing the whole response.
    pub async fn template_visible(self: &Arc<Self>, auth: &UserInfo, template: &CheckTemplate) -> Result<bool, DomainError> {
        check_if_allow(&self.template_access_funcs(auth.clone(), template.clone()), is_access_denial).await
    }

    /// Ignore-results over `on_template_access` (spec.md §4.6 step 4): used on
    /// the create path, where a denial does raise to the caller.
    pub async fn require_template_access(self: &Arc<Self>, auth: &UserInfo, template: &CheckTemplate) -> Result<(), DomainError> {
        ignore_results(&self.template_access_funcs(auth.clone(), template.clone())).await
    }

    /// Check-if-allow over `on_check_access`, for list filtering.
    pub async fn check_visible(self: &Arc<Self>, auth: &UserInfo, check: &OutCheck) -> Result<bool, DomainError> {
        check_if_allow(&self.check_access_funcs(auth.clone(), check.clone()), is_access_denial).await
    }

    /// Ignore-results over `on_check_access`, for get-by-id/remove/run.
    pub async fn require_check_access(self: &Arc<Self>, auth: &UserInfo, check: &OutCheck) -> Result<(), DomainError> {
        ignore_results(&self.check_access_funcs(auth.clone(), check.clone())).await
    }

    pub async fn on_check_create(self: &Arc<Self>, auth: &UserInfo, input: &InCheckAttributes) -> Result<(), DomainError> {
        let auth = auth.clone();
        let input = input.clone();
        let funcs: Vec<SideEffectHook> = (0..self.on_check_create.len())
            .map(|i| {
                let hooks = self.clone();
                let auth = auth.clone();
                let input = input.clone();
                Box::new(move || {
                    let hooks = hooks.clone();
                    let auth = auth.clone();
                    let input = input.clone();
                    Box::pin(async move { hooks.on_check_create[i].call(&auth, &input).await })
                        as BoxFuture<'static, Result<(), DomainError>>
                }) as SideEffectHook
            })
            .collect();
        ignore_results(&funcs).await
    }

    pub async fn on_check_remove(self: &Arc<Self>, auth: &UserInfo, check: &OutCheck) -> Result<(), DomainError> {
        let auth = auth.clone();
        let check = check.clone();
        let funcs: Vec<SideEffectHook> = (0..self.on_check_remove.len())
            .map(|i| {
                let hooks = self.clone();
                let auth = auth.clone();
                let check = check.clone();
                Box::new(move || {
                    let hooks = hooks.clone();
                    let auth = auth.clone();
                    let check = check.clone();
                    Box::pin(async move { hooks.on_check_remove[i].call(&auth, &check).await })
                        as BoxFuture<'static, Result<(), DomainError>>
                }) as SideEffectHook
            })
            .collect();
        ignore_results(&funcs).await
    }

    pub async fn on_check_run(self: &Arc<Self>, auth: &UserInfo, check: &OutCheck) -> Result<(), DomainError> {
        let auth = auth.clone();
        let check = check.clone();
        let funcs: Vec<SideEffectHook> = (0..self.on_check_run.len())
            .map(|i| {
                let hooks = self.clone();
                let auth = auth.clone();
                let check = check.clone();
                Box::new(move || {
                    let hooks = hooks.clone();
                    let auth = auth.clone();
                    let check = check.clone();
                    Box::pin(async move { hooks.on_check_run[i].call(&auth, &check).await })
                        as BoxFuture<'static, Result<(), DomainError>>
                }) as SideEffectHook
            })
            .collect();
        ignore_results(&funcs).await
    }

    fn template_access_funcs(self: &Arc<Self>, auth: UserInfo, template: CheckTemplate) -> Vec<SideEffectHook> {
        (0..self.on_template_access.len())
            .map(|i| {
                let hooks = self.clone();
                let auth = auth.clone();
                let template = template.clone();
                Box::new(move || {
                    let hooks = hooks.clone();
                    let auth = auth.clone();
                    let template = template.clone();
                    Box::pin(async move { hooks.on_template_access[i].call(&auth, &template).await })
                        as BoxFuture<'static, Result<(), DomainError>>
                }) as SideEffectHook
            })
            .collect()
    }

    fn check_access_funcs(self: &Arc<Self>, auth: UserInfo, check: OutCheck) -> Vec<SideEffectHook> {
        (0..self.on_check_access.len())
            .map(|i| {
                let hooks = self.clone();
                let auth = auth.clone();
                let check = check.clone();
                Box::new(move || {
                    let hooks = hooks.clone();
                    let auth = auth.clone();
                    let check = check.clone();
                    Box::pin(async move { hooks.on_check_access[i].call(&auth, &check).await })
                        as BoxFuture<'static, Result<(), DomainError>>
                }) as SideEffectHook
            })
            .collect()
    }
}

/// Default `get_fastapi_security` hook: reads a bearer token from the
/// `Authorization` header.
pub struct BearerHeaderSecurityHook;

#[async_trait]
impl GetSecurityHook for BearerHeaderSecurityHook {
    async fn call(&self, headers: &http::HeaderMap) -> Result<Option<RawAuth>, DomainError> {
        let token = headers
            .get(http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(|token| RawAuth {
                bearer_token: token.to_string(),
            });
        Ok(token)
    }
}

/// Default `on_auth` hook: treats the bearer token itself as both user id
/// and username, and forwards it as the `Authorization` header on any
/// outbound `Remote` backend call. Deployments with a real identity provider
/// register a hook ahead of this one that verifies and decodes the token
/// (see `OPEN_ID_CONNECT_URL`/`OPEN_ID_CONNECT_AUDIENCE`, spec.md §6.2).
pub struct PassthroughTokenAuthHook;

#[async_trait]
impl OnAuthHook for PassthroughTokenAuthHook {
    async fn call(&self, raw: Option<&RawAuth>) -> Result<Option<UserInfo>, DomainError> {
        Ok(raw.map(|raw| UserInfo {
            user_id: Some(raw.bearer_token.clone()),
            username: Some(raw.bearer_token.clone()),
            tokens: std::collections::HashMap::from([(
                "Authorization".to_string(),
                format!("Bearer {}", raw.bearer_token),
            )]),
            extra: std::collections::HashMap::new(),
        }))
    }
}
