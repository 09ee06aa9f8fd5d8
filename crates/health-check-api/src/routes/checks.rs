//! `POST /checks/`, `GET /checks/`, `GET /checks/{id}`, `DELETE /checks/{id}`,
//! `POST /checks/{id}/run/` (spec.md §6.1).

use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::StreamExt;
use health_check_core::json_api::{ApiOkResponse, ApiOkResponseList, Link, Links, Resource};
use health_check_core::{CheckId, DomainError, InCheckAttributes, OutCheck, OutCheckAttributes};
use serde::Deserialize;

use crate::error::{ApiError, ValidatedJson, ValidatedQuery};
use crate::extract::Auth;
use crate::routes::{allow_header, envelope_headers};
use crate::state::AppState;

#[derive(Deserialize, Default)]
pub struct ListQuery {
    #[serde(default)]
    pub ids: Vec<String>,
}

#[derive(Deserialize)]
pub struct CreateCheckDocument {
    pub data: CreateCheckData,
}

#[derive(Deserialize)]
pub struct CreateCheckData {
    pub r#type: String,
    #[serde(default)]
    pub id: Option<String>,
    pub attributes: InCheckAttributes,
}

fn to_resource(state: &AppState, check: OutCheck) -> Resource<OutCheckAttributes> {
    let mut links = HashMap::from([("self".to_string(), Link::Plain(state.check_url(check.id.as_str())))]);
    if let Some(template_id) = &check.attributes.metadata.template_id {
        links.insert(
            "check_template".to_string(),
            Link::Plain(state.check_template_url(template_id.as_str())),
        );
    }
    Resource {
        id: check.id.0.clone(),
        r#type: "check".to_string(),
        attributes: check.attributes,
        links: Some(links),
    }
}

pub async fn list(
    State(state): State<AppState>,
    auth: Auth,
    ValidatedQuery(query): ValidatedQuery<ListQuery>,
) -> Result<Response, ApiError> {
    let auth = auth.require()?;
    let ids: Option<Vec<CheckId>> = if query.ids.is_empty() {
        None
    } else {
        Some(query.ids.into_iter().map(CheckId::new).collect())
    };

    let mut data = Vec::new();
    let mut stream = state.backend.get_checks(&auth, ids.as_deref()).await;
    while let Some(result) = stream.next().await {
        let check = result?;
        if state.hooks.check_visible(&auth, &check).await? {
            data.push(to_resource(&state, check));
        }
    }

    let body = ApiOkResponseList::<OutCheckAttributes, ()> {
        data,
        meta: None,
        links: Some(Links {
            r#self: Some(Link::Plain(format!("{}/v1/checks/", state.base_url))),
            root: Some(Link::Plain(state.base_url.clone())),
            ..Default::default()
        }),
    };
    Ok((StatusCode::OK, envelope_headers(), allow_header("GET, POST"), Json(body)).into_response())
}

pub async fn create(
    State(state): State<AppState>,
    auth: Auth,
    ValidatedJson(document): ValidatedJson<CreateCheckDocument>,
) -> Result<Response, ApiError> {
    let auth = auth.require()?;
    if document.data.id.is_some() {
        return Err(DomainError::NewCheckClientSpecifiedId.into());
    }
    let input = document.data.attributes;

    let template_id = input.metadata.template_id.clone();
    let template_ids = [template_id.clone()];
    let mut templates = state.backend.get_check_templates(&auth, Some(&template_ids)).await;
    let template = match templates.next().await {
        Some(result) => result?,
        None => return Err(DomainError::CheckTemplateId(template_id.0).into()),
    };
    state.hooks.require_template_access(&auth, &template).await?;
    state.hooks.on_check_create(&auth, &input).await?;

    let created = state.backend.create_check(&auth, input).await?;
    state.hooks.require_check_access(&auth, &created).await?;

    let location = state.check_url(created.id.as_str());
    let body = ApiOkResponse {
        data: to_resource(&state, created),
        links: Some(Links {
            r#self: Some(Link::Plain(location.clone())),
            root: Some(Link::Plain(state.base_url.clone())),
            ..Default::default()
        }),
    };
    let mut response = (
        StatusCode::CREATED,
        envelope_headers(),
        allow_header("GET, POST"),
        Json(body),
    )
        .into_response();
    response.headers_mut().insert(
        header::LOCATION,
        HeaderValue::from_str(&location).map_err(DomainError::from_opaque)?,
    );
    Ok(response)
}

pub async fn get(State(state): State<AppState>, auth: Auth, Path(id): Path<String>) -> Result<Response, ApiError> {
    let auth = auth.require()?;
    let check = fetch_one(&state, &auth, &id).await?;
    state.hooks.require_check_access(&auth, &check).await?;

    let body = ApiOkResponse {
        data: to_resource(&state, check),
        links: Some(Links {
            r#self: Some(Link::Plain(state.check_url(&id))),
            root: Some(Link::Plain(state.base_url.clone())),
            ..Default::default()
        }),
    };
    Ok((StatusCode::OK, envelope_headers(), allow_header("GET, DELETE"), Json(body)).into_response())
}

pub async fn remove(State(state): State<AppState>, auth: Auth, Path(id): Path<String>) -> Result<Response, ApiError> {
    let auth = auth.require()?;
    let check = fetch_one(&state, &auth, &id).await?;
    state.hooks.require_check_access(&auth, &check).await?;
    state.hooks.on_check_remove(&auth, &check).await?;
    state.backend.remove_check(&auth, &check.id).await?;
    Ok((StatusCode::NO_CONTENT, allow_header("GET, DELETE")).into_response())
}

pub async fn run(State(state): State<AppState>, auth: Auth, Path(id): Path<String>) -> Result<Response, ApiError> {
    let auth = auth.require()?;
    let check = fetch_one(&state, &auth, &id).await?;
    state.hooks.require_check_access(&auth, &check).await?;
    state.hooks.on_check_run(&auth, &check).await?;
    state.backend.run_check(&auth, &check.id).await?;
    Ok((StatusCode::NO_CONTENT, allow_header("POST")).into_response())
}

async fn fetch_one(state: &AppState, auth: &health_check_core::UserInfo, id: &str) -> Result<OutCheck, ApiError> {
    let check_id = CheckId::new(id);
    let ids = [check_id.clone()];
    let mut stream = state.backend.get_checks(auth, Some(&ids)).await;
    match stream.next().await {
        Some(result) => Ok(result?),
        None => Err(DomainError::CheckId(check_id.0).into()),
    }
}
