//! The HTTP surface (spec.md §6.1), mounted under `/v1`.

pub mod check_templates;
pub mod checks;
pub mod root;

use axum::http::header;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn envelope_headers() -> [(header::HeaderName, &'static str); 1] {
    [(header::CONTENT_TYPE, crate::error::JSON_API_CONTENT_TYPE)]
}

/// `Allow` header echoing the method set registered for the route (spec.md
/// §4.6 step 6), not just the method the caller happened to use.
pub fn allow_header(methods: &'static str) -> [(header::HeaderName, &'static str); 1] {
    [(header::ALLOW, methods)]
}

/// Mounts every route under `/v1` (spec.md §6.1) plus the unprefixed
/// hypermedia root, with a `TraceLayer` giving every request a structured
/// `tracing` span the way `mockforge-http`'s router layers its requests.
pub fn build_router(state: AppState) -> Router {
    let v1 = Router::new()
        .route("/", get(root::index))
        .route("/check_templates/", get(check_templates::list))
        .route("/check_templates/:check_template_id", get(check_templates::get))
        .route("/checks/", get(checks::list).post(checks::create))
        .route("/checks/:check_id", get(checks::get).delete(checks::remove))
        .route("/checks/:check_id/run/", post(checks::run));

    Router::new()
        .route("/", get(root::index))
        .nest("/v1", v1)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
