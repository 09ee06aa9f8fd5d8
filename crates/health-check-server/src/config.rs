//! Environment-driven configuration (spec.md §6.2), centralised the way
//! `mockforge-core::config` gathers a deployment's settings into one typed
//! struct instead of scattering `std::env::var` calls across the binary.

use std::env;

/// Which [`health_check_backend`] implementation `main` wires the router to.
/// Not named in spec.md §6.2 (the spec assumes a single deployed backend per
/// instance); exposed as `RH_CHECK_BACKEND` so the same binary can run
/// against a real cluster or fully in-memory for local development and CI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// The in-memory `Mock` backend — no cluster required.
    Mock,
    /// The Kubernetes-backed `Orchestrator` backend.
    Orchestrator,
}

impl BackendKind {
    fn from_env() -> Self {
        match env::var("RH_CHECK_BACKEND").ok().as_deref() {
            Some("k8s") | Some("orchestrator") => BackendKind::Orchestrator,
            _ => BackendKind::Mock,
        }
    }
}

/// Everything `main` needs to build the router: required base URL, the
/// backend to wire, and the optional plugin-directory paths (spec.md §6.2).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `RH_CHECK_API_BASE_URL` — required, used to render every JSON:API
    /// `self`/`root` link.
    pub api_base_url: String,
    /// `RH_CHECK_HOOK_DIR_PATH` — optional directory of hook plugins.
    pub hook_dir_path: Option<std::path::PathBuf>,
    /// `RH_CHECK_K8S_TEMPLATE_PATH` — optional directory of cronjob-template
    /// plugins, in addition to the compiled-in built-ins.
    pub template_dir_path: Option<std::path::PathBuf>,
    /// Which backend implementation to serve.
    pub backend: BackendKind,
    /// The TCP address `axum::serve` binds to.
    pub bind_addr: std::net::SocketAddr,
}

impl ServerConfig {
    /// Reads configuration from the process environment. Fails fast (the
    /// original's FastAPI app fails the same way at import time) if
    /// `RH_CHECK_API_BASE_URL` is absent — every response link depends on it.
    pub fn from_env() -> anyhow::Result<Self> {
        let api_base_url = env::var("RH_CHECK_API_BASE_URL")
            .map_err(|_| anyhow::anyhow!("RH_CHECK_API_BASE_URL must be set"))?;

        let bind_addr = env::var("RH_CHECK_BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()
            .map_err(|err| anyhow::anyhow!("RH_CHECK_BIND_ADDR is not a valid socket address: {err}"))?;

        Ok(Self {
            api_base_url,
            hook_dir_path: env::var("RH_CHECK_HOOK_DIR_PATH").ok().map(Into::into),
            template_dir_path: env::var("RH_CHECK_K8S_TEMPLATE_PATH").ok().map(Into::into),
            backend: BackendKind::from_env(),
            bind_addr,
        })
    }
}

#[cfg(test)]
#[allow(unsafe_code)]
mod tests {
    use super::*;

    #[test]
    fn backend_kind_defaults_to_mock() {
        // SAFETY: test-only env mutation, single-threaded within this test.
        unsafe {
            env::remove_var("RH_CHECK_BACKEND");
        }
        assert_eq!(BackendKind::from_env(), BackendKind::Mock);
    }

    #[test]
    fn backend_kind_recognises_k8s() {
        // SAFETY: test-only env mutation, single-threaded within this test.
        unsafe {
            env::set_var("RH_CHECK_BACKEND", "k8s");
        }
        assert_eq!(BackendKind::from_env(), BackendKind::Orchestrator);
        unsafe {
            env::remove_var("RH_CHECK_BACKEND");
        }
    }
}
