//! `GET /check_templates/`, `GET /check_templates/{id}` (spec.md §6.1).

use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::StreamExt;
use health_check_core::json_api::{ApiOkResponse, ApiOkResponseList, Link, Links, Resource};
use health_check_core::{CheckTemplate, CheckTemplateAttributes, CheckTemplateId, DomainError};

use crate::error::{ApiError, ValidatedQuery};
use crate::extract::Auth;
use crate::routes::{allow_header, envelope_headers};
use crate::state::AppState;

#[derive(serde::Deserialize, Default)]
pub struct ListQuery {
    #[serde(default)]
    pub ids: Vec<String>,
}

fn to_resource(state: &AppState, template: CheckTemplate) -> Resource<CheckTemplateAttributes> {
    let self_link = state.check_template_url(template.id.as_str());
    Resource {
        id: template.id.0,
        r#type: "check_template".to_string(),
        attributes: template.attributes,
        links: Some(HashMap::from([("self".to_string(), Link::Plain(self_link))])),
    }
}

pub async fn list(
    State(state): State<AppState>,
    auth: Auth,
    ValidatedQuery(query): ValidatedQuery<ListQuery>,
) -> Result<Response, ApiError> {
    let auth = auth.require()?;
    let ids: Option<Vec<CheckTemplateId>> = if query.ids.is_empty() {
        None
    } else {
        Some(query.ids.into_iter().map(CheckTemplateId::new).collect())
    };

    let mut data = Vec::new();
    let mut stream = state.backend.get_check_templates(&auth, ids.as_deref()).await;
    while let Some(result) = stream.next().await {
        let template = result?;
        if state.hooks.template_visible(&auth, &template).await? {
            data.push(to_resource(&state, template));
        }
    }

    let body = ApiOkResponseList::<CheckTemplateAttributes, ()> {
        data,
        meta: None,
        links: Some(Links {
            r#self: Some(Link::Plain(format!("{}/v1/check_templates/", state.base_url))),
            root: Some(Link::Plain(state.base_url.clone())),
            ..Default::default()
        }),
    };
    Ok((axum::http::StatusCode::OK, envelope_headers(), allow_header("GET"), Json(body)).into_response())
}

pub async fn get(
    State(state): State<AppState>,
    auth: Auth,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let auth = auth.require()?;
    let id = CheckTemplateId::new(id);
    let ids = [id.clone()];
    let mut stream = state.backend.get_check_templates(&auth, Some(&ids)).await;
    let template = match stream.next().await {
        Some(result) => result?,
        None => return Err(DomainError::CheckTemplateId(id.0).into()),
    };
    state.hooks.require_template_access(&auth, &template).await?;

    let body = ApiOkResponse {
        data: to_resource(&state, template),
        links: Some(Links {
            r#self: Some(Link::Plain(state.check_template_url(id.as_str()))),
            root: Some(Link::Plain(state.base_url.clone())),
            ..Default::default()
        }),
    };
    Ok((axum::http::StatusCode::OK, envelope_headers(), allow_header("GET"), Json(body)).into_response())
}
