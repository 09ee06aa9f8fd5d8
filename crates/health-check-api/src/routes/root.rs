//! `GET /` (spec.md §4.6): a hypermedia index of the collections this
//! instance exposes, plus a pointer to the OpenAPI document axum/utoipa-free
//! deployments can still describe by hand.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use health_check_core::json_api::Link;
use serde::Serialize;
use std::collections::HashMap;

use crate::routes::{allow_header, envelope_headers};
use crate::state::AppState;

#[derive(Serialize)]
pub struct RootIndex {
    links: HashMap<String, Link>,
}

pub async fn index(State(state): State<AppState>) -> Response {
    let links = HashMap::from([
        ("self".to_string(), Link::Plain(state.base_url.clone())),
        (
            "check_templates".to_string(),
            Link::Plain(format!("{}/v1/check_templates/", state.base_url)),
        ),
        (
            "checks".to_string(),
            Link::Plain(format!("{}/v1/checks/", state.base_url)),
        ),
        (
            "describedby".to_string(),
            Link::Plain(format!("{}/openapi.json", state.base_url)),
        ),
    ]);
    (axum::http::StatusCode::OK, envelope_headers(), allow_header("GET"), Json(RootIndex { links })).into_response()
}
