//! The single exception translator (spec.md §4.1, §4.6): wraps
//! [`DomainError`] in a local type so it can implement axum's
//! [`IntoResponse`] (the orphan rule forbids implementing a foreign trait
//! for a foreign type directly on `DomainError` from this crate).

use axum::async_trait;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_extra::extract::{Query, QueryRejection};
use health_check_core::json_api::{ApiErrorResponse, Error as ApiErrorObject, ErrorSource};
use health_check_core::DomainError;
use serde::de::DeserializeOwned;

pub const JSON_API_CONTENT_TYPE: &str = "application/vnd.api+json";

/// Wraps any `DomainError` surfacing from a handler. Every route returns
/// `Result<T, ApiError>`, so a bare `?` on a `health_check_core::Result<T>`
/// converts automatically via `From<DomainError>`.
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.0.to_http();
        json_api_response(status, body)
    }
}

fn json_api_response(status: StatusCode, body: ApiErrorResponse) -> Response {
    let mut response = (status, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, JSON_API_CONTENT_TYPE.parse().expect("valid mime"));
    response
}

/// A `Json<T>` extractor that translates a malformed/unknown-field body
/// into a `422` with a `source.pointer`, mirroring
/// `api_utils.api_utils._validation_exception_handler`, instead of axum's
/// default bare `400`.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ValidatedJson(value)),
            Err(rejection) => Err(json_rejection_response(rejection)),
        }
    }
}

fn json_rejection_response(rejection: JsonRejection) -> Response {
    validation_error_response(rejection.body_text(), "/data/attributes")
}

/// A `Query<T>` extractor with the same `422`-with-pointer translation,
/// pointed at the offending query parameter rather than the body.
///
/// Built on `axum_extra::extract::Query` (`serde_html_form`-backed) rather
/// than `axum::extract::Query` (`serde_urlencoded`-backed): the latter
/// cannot deserialize a repeated key (`?ids=a&ids=b`) into a `Vec`, which
/// spec.md §6.1 requires for both `ids` list-query parameters.
pub struct ValidatedQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(ValidatedQuery(value)),
            Err(rejection) => Err(query_rejection_response(rejection)),
        }
    }
}

fn query_rejection_response(rejection: QueryRejection) -> Response {
    validation_error_response(rejection.to_string(), "ids")
}

fn validation_error_response(detail: String, pointer: &str) -> Response {
    let error = ApiErrorObject {
        status: StatusCode::UNPROCESSABLE_ENTITY.as_u16().to_string(),
        code: "RequestValidationError".to_string(),
        title: "Request failed validation".to_string(),
        detail: Some(detail),
        source: Some(ErrorSource::Pointer {
            pointer: pointer.to_string(),
        }),
        meta: None,
    };
    json_api_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        ApiErrorResponse { errors: vec![error] },
    )
}
