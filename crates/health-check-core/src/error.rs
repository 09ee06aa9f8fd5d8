//! The domain error taxonomy (spec.md §7) and its translation to JSON:API errors.
//!
//! One enum replaces the original's dataclass-plus-exception-subclass hierarchy
//! (`api_utils.exceptions.APIException` and friends): each variant carries
//! exactly what it needs to build its `Error` payload, and `DomainError::code`
//! returns the same string the original's `type(self).__name__` produced, so
//! the Remote backend can still match on it byte-for-byte (see
//! `health-check-backend::remote`).

use crate::json_api::{ApiErrorResponse, Error as ApiError, ErrorSource};
use http::StatusCode;

/// Result alias used throughout the control plane.
pub type Result<T> = std::result::Result<T, DomainError>;

/// The full taxonomy from spec.md §7, one variant per row.
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    /// Never reveals internal detail to the client.
    #[error("internal server error")]
    Internal,

    #[error("forbidden: {detail}")]
    Forbidden { title: String, detail: String },

    #[error("unauthorized: {detail}")]
    Unauthorized { title: String, detail: String },

    #[error("invalid input: {detail}")]
    UserInput { title: String, detail: String },

    #[error("schema validation failed at {pointer}: {detail}")]
    JsonValidation {
        pointer: String,
        detail: String,
        meta: serde_json::Value,
    },

    #[error("invalid cron expression: {detail}")]
    CronValidation { detail: String },

    #[error("check template id not found: {0}")]
    CheckTemplateId(String),

    #[error("check id not found: {0}")]
    CheckId(String),

    #[error("check id is not unique: {detail}")]
    CheckIdNonUnique { detail: String },

    #[error("connection error: {0}")]
    CheckConnection(String),

    #[error("client must not specify new check id")]
    NewCheckClientSpecifiedId,
}

impl DomainError {
    /// The machine-readable `error.code`, matching the original exception
    /// class names (`CheckTemplateIdError`, `JsonValidationError`, ...) so
    /// `health-check-backend::remote::reconstruct_error` can pattern-match it
    /// back into a `DomainError` on the calling side.
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::Internal => "InternalError",
            DomainError::Forbidden { .. } => "Forbidden",
            DomainError::Unauthorized { .. } => "Unauthorized",
            DomainError::UserInput { .. } => "UserInputError",
            DomainError::JsonValidation { .. } => "JsonValidationError",
            DomainError::CronValidation { .. } => "CronExpressionValidationError",
            DomainError::CheckTemplateId(_) => "CheckTemplateIdError",
            DomainError::CheckId(_) => "CheckIdError",
            DomainError::CheckIdNonUnique { .. } => "CheckIdNonUniqueError",
            DomainError::CheckConnection(_) => "CheckConnectionError",
            DomainError::NewCheckClientSpecifiedId => "NewCheckClientSpecifiedId",
        }
    }

    /// HTTP status code this error is reported under.
    pub fn status(&self) -> StatusCode {
        match self {
            DomainError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            DomainError::Forbidden { .. } => StatusCode::FORBIDDEN,
            DomainError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            DomainError::UserInput { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            DomainError::JsonValidation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            DomainError::CronValidation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            DomainError::CheckTemplateId(_) => StatusCode::NOT_FOUND,
            DomainError::CheckId(_) => StatusCode::NOT_FOUND,
            DomainError::CheckIdNonUnique { .. } => StatusCode::BAD_REQUEST,
            DomainError::CheckConnection(_) => StatusCode::INTERNAL_SERVER_ERROR,
            DomainError::NewCheckClientSpecifiedId => StatusCode::FORBIDDEN,
        }
    }

    /// `true` for the variants a `check-if-allow` hook stage treats as "deny"
    /// (spec.md §4.3): Forbidden, CheckId, CheckTemplateId.
    pub fn is_access_denial(&self) -> bool {
        matches!(
            self,
            DomainError::Forbidden { .. }
                | DomainError::CheckId(_)
                | DomainError::CheckTemplateId(_)
        )
    }

    /// Build the JSON:API `Error` payload for this variant.
    pub fn to_api_error(&self) -> ApiError {
        let status = self.status().as_u16().to_string();
        let code = self.code().to_string();
        match self {
            DomainError::Internal => ApiError {
                status,
                code,
                title: "Internal server error".to_string(),
                detail: None,
                source: None,
                meta: None,
            },
            DomainError::Forbidden { title, detail } => ApiError {
                status,
                code,
                title: title.clone(),
                detail: Some(detail.clone()),
                source: None,
                meta: None,
            },
            DomainError::Unauthorized { title, detail } => ApiError {
                status,
                code,
                title: title.clone(),
                detail: Some(detail.clone()),
                source: None,
                meta: None,
            },
            DomainError::UserInput { title, detail } => ApiError {
                status,
                code,
                title: title.clone(),
                detail: Some(detail.clone()),
                source: None,
                meta: None,
            },
            DomainError::JsonValidation {
                pointer,
                detail,
                meta,
            } => ApiError {
                status,
                code,
                title: "Json is not valid for this schema".to_string(),
                detail: Some(detail.clone()),
                source: Some(ErrorSource::Pointer {
                    pointer: pointer.clone(),
                }),
                meta: Some(meta.clone()),
            },
            DomainError::CronValidation { detail } => ApiError {
                status,
                code,
                title: "Invalid cron expression for use with Kubernetes".to_string(),
                detail: Some(detail.clone()),
                source: None,
                meta: None,
            },
            DomainError::CheckTemplateId(id) => ApiError {
                status,
                code,
                title: "Template Id not found".to_string(),
                detail: Some(format!("Check template id {id} not found")),
                source: None,
                meta: None,
            },
            DomainError::CheckId(id) => ApiError {
                status,
                code,
                title: "Check Id not found".to_string(),
                detail: Some(format!("Check id {id} not found")),
                source: None,
                meta: None,
            },
            DomainError::CheckIdNonUnique { detail } => ApiError {
                status,
                code,
                title: "Check Id is not unique".to_string(),
                detail: Some(detail.clone()),
                source: None,
                meta: None,
            },
            DomainError::CheckConnection(detail) => ApiError {
                status,
                code,
                title: "HTTP request failed".to_string(),
                detail: Some(detail.clone()),
                source: None,
                meta: None,
            },
            DomainError::NewCheckClientSpecifiedId => ApiError {
                status,
                code,
                title: "Client must not specify new check id".to_string(),
                detail: Some("Client must not specify new check id".to_string()),
                source: None,
                meta: None,
            },
        }
    }

    /// Single translator from any `DomainError` to `(status, body)`, the Rust
    /// analogue of `api_utils.exceptions.get_status_code_and_errors`.
    pub fn to_http(&self) -> (StatusCode, ApiErrorResponse) {
        (
            self.status(),
            ApiErrorResponse {
                errors: vec![self.to_api_error()],
            },
        )
    }

    /// Collapse any non-domain failure (panics, plumbing errors) into
    /// `Internal` with no detail leakage — the wildcard arm of the original's
    /// `get_status_code_and_errors` match.
    pub fn from_opaque<E: std::fmt::Display>(err: E) -> Self {
        tracing::error!(error = %err, "unhandled error collapsed to Internal");
        DomainError::Internal
    }

    /// The inverse of [`DomainError::code`]: reconstructs a typed error from
    /// a peer instance's JSON:API error payload, used by
    /// `health-check-backend::remote` so a failure on the far side of a
    /// `Remote` backend surfaces as the same variant it would locally.
    /// Unrecognised codes collapse to `Internal` rather than panicking —
    /// a peer running a newer error taxonomy must not crash this one.
    pub fn from_code(error: &ApiError) -> Self {
        let detail = error.detail.clone().unwrap_or_default();
        match error.code.as_str() {
            "Forbidden" => DomainError::Forbidden {
                title: error.title.clone(),
                detail,
            },
            "Unauthorized" => DomainError::Unauthorized {
                title: error.title.clone(),
                detail,
            },
            "UserInputError" => DomainError::UserInput {
                title: error.title.clone(),
                detail,
            },
            "JsonValidationError" => DomainError::JsonValidation {
                pointer: match &error.source {
                    Some(ErrorSource::Pointer { pointer }) => pointer.clone(),
                    None => String::new(),
                },
                detail,
                meta: error.meta.clone().unwrap_or(serde_json::Value::Null),
            },
            "CronExpressionValidationError" => DomainError::CronValidation { detail },
            "CheckTemplateIdError" => DomainError::CheckTemplateId(
                error.detail.clone().unwrap_or_default(),
            ),
            "CheckIdError" => DomainError::CheckId(error.detail.clone().unwrap_or_default()),
            "CheckIdNonUniqueError" => DomainError::CheckIdNonUnique { detail },
            "CheckConnectionError" => DomainError::CheckConnection(detail),
            "NewCheckClientSpecifiedId" => DomainError::NewCheckClientSpecifiedId,
            _ => {
                tracing::error!(code = %error.code, "unrecognised error code from remote peer");
                DomainError::Internal
            }
        }
    }
}
