//! JSON:API envelope types shared by every resource the control plane exposes.
//!
//! Mirrors `api_utils/json_api_types.py` from the original implementation:
//! a generic `Resource<T>`, link objects, and the error envelope.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A plain URL or a link object with a title, per the JSON:API link spec.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Link {
    /// A bare URL string.
    Plain(String),
    /// A link carrying extra metadata.
    Object(LinkObject),
}

impl From<String> for Link {
    fn from(value: String) -> Self {
        Link::Plain(value)
    }
}

impl From<&str> for Link {
    fn from(value: &str) -> Self {
        Link::Plain(value.to_string())
    }
}

/// A link with an href and optional title.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LinkObject {
    pub href: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// The `links` member attached to a top-level document or resource.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Links {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#self: Option<Link>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub describedby: Option<Link>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first: Option<Link>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<Link>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<Link>,
}

/// A single JSON:API resource object: `{id, type, attributes, links}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource<T> {
    pub id: String,
    pub r#type: String,
    pub attributes: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<HashMap<String, Link>>,
}

/// Where in the request document an error originated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ErrorSource {
    Pointer { pointer: String },
    Parameter { parameter: String },
    Header { header: String },
}

/// A single JSON:API error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Error {
    pub status: String,
    pub code: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ErrorSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

/// `{errors: [Error]}` — the body of every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ApiErrorResponse {
    pub errors: Vec<Error>,
}

/// A single-resource success envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiOkResponse<T> {
    pub data: Resource<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<Links>,
}

/// A resource-collection success envelope, carrying a generic `meta`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiOkResponseList<T, M> {
    pub data: Vec<Resource<T>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<M>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<Links>,
}
