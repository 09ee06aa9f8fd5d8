//! `RemoteBackend` against a real (mocked) HTTP peer, the way the pack's
//! examples use `wiremock` to exercise an outbound HTTP client without a
//! live network dependency.

use health_check_backend::{CheckBackend, RemoteBackend};
use health_check_core::{CheckId, DomainError, UserInfo};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn auth() -> UserInfo {
    let mut user = UserInfo::default();
    user.tokens.insert("authorization".to_string(), "Bearer peer-token".to_string());
    user
}

#[tokio::test]
async fn create_check_decodes_peer_success_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/checks/"))
        .and(header("authorization", "Bearer peer-token"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "data": {
                "id": "abc-123",
                "type": "check",
                "attributes": {
                    "metadata": {
                        "name": "n",
                        "description": "d",
                        "template_id": "simple_ping",
                        "template_args": {},
                    },
                    "schedule": "* * * * *",
                    "outcome_filter": {
                        "resource_attributes": {"k8s.cronjob.name": "n-abc"},
                        "metric_name": "up",
                    },
                },
            }
        })))
        .mount(&server)
        .await;

    let backend = RemoteBackend::new(server.uri());
    let created = backend
        .create_check(
            &auth(),
            health_check_core::InCheckAttributes {
                metadata: health_check_core::InCheckMetadata {
                    name: "n".to_string(),
                    description: "d".to_string(),
                    template_id: health_check_core::CheckTemplateId::new("simple_ping"),
                    template_args: json!({}),
                },
                schedule: health_check_core::CronExpression::new("* * * * *"),
            },
        )
        .await
        .unwrap();

    assert_eq!(created.id.as_str(), "abc-123");
}

#[tokio::test]
async fn remove_check_translates_peer_error_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/checks/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "errors": [{
                "status": "404",
                "code": "CheckIdError",
                "title": "Check not found",
                "detail": "no such check",
            }]
        })))
        .mount(&server)
        .await;

    let backend = RemoteBackend::new(server.uri());
    let err = backend
        .remove_check(&auth(), &CheckId::new("missing"))
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::CheckId(_)));
}

#[tokio::test]
async fn run_check_succeeds_on_no_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/checks/abc/run/"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let backend = RemoteBackend::new(server.uri());
    backend.run_check(&auth(), &CheckId::new("abc")).await.unwrap();
}
