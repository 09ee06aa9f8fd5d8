//! The outbound JSON:API client (C8) and the `Remote` backend built on it
//! (spec.md §4.5.3, §4.8): delegates every `CheckBackend` operation to
//! another instance of this service over HTTP.

use async_trait::async_trait;
use futures::stream;
use health_check_core::json_api::{ApiErrorResponse, ApiOkResponse, ApiOkResponseList, Resource};
use health_check_core::{
    CheckId, CheckTemplate, CheckTemplateAttributes, CheckTemplateId, DomainError, InCheckAttributes,
    OutCheck, OutCheckAttributes, Result, UserInfo,
};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::interface::{CheckBackend, CheckStream};

/// Composes `base_url/path` with percent-encoded path parameters and an
/// optional query string. Ported 1:1 from the original's `get_url_str`.
/// Trailing slashes on `base_url` are stripped so a caller can configure
/// either form.
fn get_url_str(base_url: &str, path: &str, query: &[(&str, &str)]) -> String {
    let base = base_url.trim_end_matches('/');
    let mut url = format!("{base}{path}");
    if !query.is_empty() {
        let encoded: Vec<String> = query
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect();
        url.push('?');
        url.push_str(&encoded.join("&"));
    }
    url
}

/// Thin wrapper around a shared `reqwest::Client`, scoped to one peer
/// instance's base URL. `RemoteBackend` holds one per construction; the
/// connection pool is released when the last clone of `Client` drops.
pub struct RemoteClient {
    http: Client,
    base_url: String,
}

impl RemoteClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
        }
    }

    fn request(&self, method: Method, path: &str, query: &[(&str, &str)]) -> reqwest::RequestBuilder {
        self.http.request(method, get_url_str(&self.base_url, path, query))
    }

    fn with_auth(mut builder: reqwest::RequestBuilder, auth: &UserInfo) -> reqwest::RequestBuilder {
        for (header, token) in &auth.tokens {
            builder = builder.header(header, token);
        }
        builder
    }

    async fn send_json<T: DeserializeOwned>(builder: reqwest::RequestBuilder) -> Result<T> {
        let response = builder.send().await.map_err(map_transport_err)?;
        let status = response.status();
        if status.is_success() {
            response.json::<T>().await.map_err(map_transport_err)
        } else {
            let body: ApiErrorResponse = response.json().await.unwrap_or_default();
            Err(body
                .errors
                .first()
                .map(DomainError::from_code)
                .unwrap_or(DomainError::Internal))
        }
    }

    async fn send_no_body(builder: reqwest::RequestBuilder, expect: StatusCode) -> Result<()> {
        let response = builder.send().await.map_err(map_transport_err)?;
        if response.status() == expect {
            Ok(())
        } else {
            let body: ApiErrorResponse = response.json().await.unwrap_or_default();
            Err(body
                .errors
                .first()
                .map(DomainError::from_code)
                .unwrap_or(DomainError::Internal))
        }
    }
}

/// Any transport-level failure — connection refused, TLS handshake,
/// DNS resolution — becomes `CheckConnectionError`, never a raw transport
/// error type leaking to the caller.
fn map_transport_err(err: reqwest::Error) -> DomainError {
    DomainError::CheckConnection(err.to_string())
}

/// Delegates every operation to a peer instance of this service over HTTP.
pub struct RemoteBackend {
    client: RemoteClient,
}

impl RemoteBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: RemoteClient::new(base_url),
        }
    }
}

#[async_trait]
impl CheckBackend for RemoteBackend {
    type Auth = UserInfo;

    #[tracing::instrument(skip(self, auth))]
    async fn get_check_templates(
        &self,
        auth: &UserInfo,
        ids: Option<&[CheckTemplateId]>,
    ) -> CheckStream<'static, CheckTemplate> {
        let owned_ids: Vec<String> = ids
            .map(|ids| ids.iter().map(|id| id.as_str().to_string()).collect())
            .unwrap_or_default();
        let query: Vec<(&str, &str)> = owned_ids.iter().map(|id| ("ids", id.as_str())).collect();

        let builder = RemoteClient::with_auth(
            self.client.request(Method::GET, "/check_templates/", &query),
            auth,
        );
        let result = RemoteClient::send_json::<ApiOkResponseList<CheckTemplateAttributes, serde_json::Value>>(
            builder,
        )
        .await;

        match result {
            Ok(body) => Box::pin(stream::iter(
                body.data
                    .into_iter()
                    .map(|resource| Ok(resource_to_template(resource)))
                    .collect::<Vec<_>>(),
            )),
            Err(err) => Box::pin(stream::iter(vec![Err(err)])),
        }
    }

    #[tracing::instrument(skip(self, auth, input))]
    async fn create_check(&self, auth: &UserInfo, input: InCheckAttributes) -> Result<OutCheck> {
        let body = json!({
            "data": {
                "type": "check",
                "attributes": input,
            }
        });
        let builder = RemoteClient::with_auth(
            self.client.request(Method::POST, "/checks/", &[]).json(&body),
            auth,
        );
        let response: ApiOkResponse<OutCheckAttributes> = RemoteClient::send_json(builder).await?;
        Ok(resource_to_check(response.data))
    }

    #[tracing::instrument(skip(self, auth))]
    async fn get_checks(
        &self,
        auth: &UserInfo,
        ids: Option<&[CheckId]>,
    ) -> CheckStream<'static, OutCheck> {
        let owned_ids: Vec<String> = ids
            .map(|ids| ids.iter().map(|id| id.as_str().to_string()).collect())
            .unwrap_or_default();
        let query: Vec<(&str, &str)> = owned_ids.iter().map(|id| ("ids", id.as_str())).collect();

        let builder = RemoteClient::with_auth(self.client.request(Method::GET, "/checks/", &query), auth);
        let result =
            RemoteClient::send_json::<ApiOkResponseList<OutCheckAttributes, serde_json::Value>>(builder)
                .await;

        match result {
            Ok(body) => Box::pin(stream::iter(
                body.data.into_iter().map(|resource| Ok(resource_to_check(resource))).collect::<Vec<_>>(),
            )),
            Err(err) => Box::pin(stream::iter(vec![Err(err)])),
        }
    }

    #[tracing::instrument(skip(self, auth))]
    async fn remove_check(&self, auth: &UserInfo, id: &CheckId) -> Result<()> {
        let path = format!("/checks/{}", urlencoding::encode(id.as_str()));
        let builder = RemoteClient::with_auth(self.client.request(Method::DELETE, &path, &[]), auth);
        RemoteClient::send_no_body(builder, StatusCode::NO_CONTENT).await
    }

    #[tracing::instrument(skip(self, auth))]
    async fn run_check(&self, auth: &UserInfo, id: &CheckId) -> Result<()> {
        let path = format!("/checks/{}/run/", urlencoding::encode(id.as_str()));
        let builder = RemoteClient::with_auth(self.client.request(Method::POST, &path, &[]), auth);
        RemoteClient::send_no_body(builder, StatusCode::NO_CONTENT).await
    }

    async fn aclose(&self) -> Result<()> {
        Ok(())
    }
}

fn resource_to_template(resource: Resource<CheckTemplateAttributes>) -> CheckTemplate {
    CheckTemplate {
        id: CheckTemplateId::new(resource.id),
        attributes: resource.attributes,
    }
}

fn resource_to_check(resource: Resource<OutCheckAttributes>) -> OutCheck {
    OutCheck {
        id: CheckId::new(resource.id),
        attributes: resource.attributes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_composition_strips_trailing_slash_and_encodes_query() {
        let url = get_url_str("http://peer:8080/", "/checks/", &[("ids", "a b")]);
        assert_eq!(url, "http://peer:8080/checks/?ids=a%20b");
    }

    #[test]
    fn url_composition_without_query() {
        let url = get_url_str("http://peer:8080", "/checks/abc", &[]);
        assert_eq!(url, "http://peer:8080/checks/abc");
    }

    #[tokio::test]
    async fn connection_refused_becomes_check_connection_error() {
        let backend = RemoteBackend::new("http://127.0.0.1:1");
        let err = backend
            .remove_check(&UserInfo::default(), &CheckId::new("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::CheckConnection(_)));
    }
}
