//! Binary entry point (spec.md §9 "[ADD] Graceful shutdown"): reads
//! [`config::ServerConfig`] from the environment, wires the compiled-in
//! templates/hooks to the chosen [`health_check_backend::CheckBackend`], and
//! serves the [`health_check_api`] router until `SIGINT`/`SIGTERM`.

mod config;

use std::sync::Arc;

use config::{BackendKind, ServerConfig};
use health_check_api::hooks::{ApiHooks, BearerHeaderSecurityHook, PassthroughTokenAuthHook};
use health_check_api::state::DynCheckBackend;
use health_check_api::AppState;
use health_check_backend::hooks::{EnvNamespaceHook, InClusterConfigHook, K8sHooks, MockHooks};
use health_check_backend::{MockBackend, OrchestratorBackend};
use health_check_plugins::order::Sourced;
use health_check_templates::builtin::builtin_templates;
use health_check_templates::TemplateRegistry;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = ServerConfig::from_env()?;
    tracing::info!(
        backend = ?config.backend,
        base_url = %config.api_base_url,
        bind_addr = %config.bind_addr,
        "starting health-check control plane"
    );

    let registry = Arc::new(build_template_registry(&config));
    let api_hooks = Arc::new(build_api_hooks());
    let backend = build_backend(&config, registry);

    let state = AppState::new(backend, api_hooks, config.api_base_url.clone());
    let router = health_check_api::build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shutdown complete");
    Ok(())
}

/// `tracing` + `EnvFilter`, the way `mockforge-k8s-operator::main`
/// initialises logging: `RUST_LOG` overrides a sensible per-crate default.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "health_check_server=info,health_check_api=info,health_check_backend=info,kube=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Compiled-in templates, optionally extended with an `RH_CHECK_K8S_TEMPLATE_PATH`
/// wasm plugin directory (a no-op scan unless the binary was built with the
/// `wasm-plugins` feature; spec.md §4.2/§4.4).
fn build_template_registry(config: &ServerConfig) -> TemplateRegistry {
    if let Some(path) = &config.template_dir_path {
        tracing::info!(path = %path.display(), "template plugin directory configured (compiled-in templates still load)");
    }
    TemplateRegistry::new(builtin_templates())
}

/// Default hook wiring for the request pipeline: bearer-token security
/// scheme + passthrough auth, no access/create/remove/run restrictions.
/// Deployments needing real policy enforcement register additional hooks
/// ahead of these defaults (hook files sort alphabetically; see
/// `health_check_plugins::order`).
fn build_api_hooks() -> ApiHooks {
    ApiHooks::new(
        vec![Sourced::new("default_security", Box::new(BearerHeaderSecurityHook) as _)],
        vec![Sourced::new("default_auth", Box::new(PassthroughTokenAuthHook) as _)],
        vec![],
        vec![],
        vec![],
        vec![],
        vec![],
    )
}

fn build_k8s_hooks() -> K8sHooks {
    K8sHooks::new(
        vec![Sourced::new("default_config", Box::new(InClusterConfigHook) as _)],
        vec![Sourced::new("default_namespace", Box::new(EnvNamespaceHook) as _)],
        vec![],
        vec![],
        vec![],
        vec![],
    )
}

fn build_backend(config: &ServerConfig, registry: Arc<TemplateRegistry>) -> Arc<DynCheckBackend> {
    match config.backend {
        BackendKind::Mock => Arc::new(MockBackend::new(registry, MockHooks::default())),
        BackendKind::Orchestrator => Arc::new(OrchestratorBackend::new(registry, build_k8s_hooks())),
    }
}

/// Waits for `Ctrl-C` (and, on unix, `SIGTERM`) so `axum::serve`'s graceful
/// shutdown lets in-flight orchestrator calls finish before the process
/// exits.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
