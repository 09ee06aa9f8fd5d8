//! The shared, immutable state every handler closes over: the backend
//! handle, the ordered hook table, and the base URL used to render
//! JSON:API `links` objects.

use std::sync::Arc;

use health_check_backend::interface::CheckBackend;
use health_check_core::UserInfo;

use crate::hooks::ApiHooks;

/// The concrete backend type the router is built over, type-erased so the
/// same router code works whether it's wired to `Mock`, `Orchestrator`,
/// `Remote`, or `Aggregator`.
pub type DynCheckBackend = dyn CheckBackend<Auth = UserInfo> + Send + Sync;

#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<DynCheckBackend>,
    pub hooks: Arc<ApiHooks>,
    pub base_url: String,
}

impl AppState {
    pub fn new(backend: Arc<DynCheckBackend>, hooks: Arc<ApiHooks>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            backend,
            hooks,
            base_url,
        }
    }

    pub fn check_template_url(&self, id: &str) -> String {
        format!("{}/v1/check_templates/{id}", self.base_url)
    }

    pub fn check_url(&self, id: &str) -> String {
        format!("{}/v1/checks/{id}", self.base_url)
    }
}
