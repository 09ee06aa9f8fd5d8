//! End-to-end scenarios S1–S7 (spec.md §8) driven against the `Mock`
//! backend through the real axum router, the way `mockforge-http`'s route
//! tests drive a router with `tower::ServiceExt::oneshot` rather than
//! spinning up a TCP listener.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use health_check_api::hooks::{ApiHooks, BearerHeaderSecurityHook, PassthroughTokenAuthHook};
use health_check_api::state::DynCheckBackend;
use health_check_api::{build_router, AppState};
use health_check_backend::hooks::MockHooks;
use health_check_backend::MockBackend;
use health_check_plugins::order::Sourced;
use health_check_templates::builtin::builtin_templates;
use health_check_templates::TemplateRegistry;
use serde_json::{json, Value};
use tower::ServiceExt;

const BASE_URL: &str = "http://control-plane.example";

fn test_app() -> axum::Router {
    let registry = Arc::new(TemplateRegistry::new(builtin_templates()));
    let backend: Arc<DynCheckBackend> = Arc::new(MockBackend::new(registry, MockHooks::default()));
    let hooks = Arc::new(ApiHooks::new(
        vec![Sourced::new("default_security", Box::new(BearerHeaderSecurityHook) as _)],
        vec![Sourced::new("default_auth", Box::new(PassthroughTokenAuthHook) as _)],
        vec![],
        vec![],
        vec![],
        vec![],
        vec![],
    ));
    let state = AppState::new(backend, hooks, BASE_URL);
    build_router(state)
}

fn authed_request(method: &str, path: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(path)
        .header(header::AUTHORIZATION, "Bearer alice-token");
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn create_body(template_id: &str, template_args: Value, schedule: &str) -> Value {
    json!({
        "data": {
            "type": "check",
            "attributes": {
                "metadata": {
                    "name": "n",
                    "description": "d",
                    "template_id": template_id,
                    "template_args": template_args,
                },
                "schedule": schedule,
            }
        }
    })
}

/// S1: create happy path against the mock backend.
#[tokio::test]
async fn s1_create_happy_path() {
    let app = test_app();
    let body = create_body(
        "default_k8s_template",
        json!({"health_check.name": "n", "script": "print(1)"}),
        "* * * * *",
    );
    let response = app
        .oneshot(authed_request("POST", "/v1/checks/", Some(body)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let location = response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(location.starts_with(&format!("{BASE_URL}/v1/checks/")));

    let body = body_json(response).await;
    let resource_name = body["data"]["attributes"]["outcome_filter"]["resource_attributes"]["k8s.cronjob.name"]
        .as_str()
        .unwrap();
    assert!(!resource_name.is_empty());
}

/// S2: unknown template id is a 404 `CheckTemplateIdError`.
#[tokio::test]
async fn s2_unknown_template() {
    let app = test_app();
    let body = create_body("nope", json!({}), "* * * * *");
    let response = app
        .oneshot(authed_request("POST", "/v1/checks/", Some(body)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["errors"][0]["code"], "CheckTemplateIdError");
}

/// S3: schema violation is a 422 `JsonValidationError` with a `source.pointer`.
#[tokio::test]
async fn s3_schema_violation() {
    let app = test_app();
    let body = create_body("default_k8s_template", json!({}), "* * * * *");
    let response = app
        .oneshot(authed_request("POST", "/v1/checks/", Some(body)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["errors"][0]["code"], "JsonValidationError");
    assert_eq!(
        body["errors"][0]["source"]["pointer"],
        "/data/attributes/metadata/template_args/"
    );
}

/// S4: malformed cron expression is a 422 `CronExpressionValidationError`.
#[tokio::test]
async fn s4_bad_cron() {
    let app = test_app();
    let body = create_body(
        "default_k8s_template",
        json!({"health_check.name": "n", "script": "print(1)"}),
        "not a cron",
    );
    let response = app
        .oneshot(authed_request("POST", "/v1/checks/", Some(body)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["errors"][0]["code"], "CronExpressionValidationError");
}

/// S5: client-specified id is a 403 `NewCheckClientSpecifiedId`.
#[tokio::test]
async fn s5_client_specified_id() {
    let app = test_app();
    let mut body = create_body(
        "default_k8s_template",
        json!({"health_check.name": "n", "script": "print(1)"}),
        "* * * * *",
    );
    body["data"]["id"] = json!("x");
    let response = app
        .oneshot(authed_request("POST", "/v1/checks/", Some(body)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["errors"][0]["code"], "NewCheckClientSpecifiedId");
}

/// S6: deleting an unknown check is a 404 `CheckIdError`.
#[tokio::test]
async fn s6_delete_unknown() {
    let app = test_app();
    let response = app
        .oneshot(authed_request("DELETE", "/v1/checks/does-not-exist", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["errors"][0]["code"], "CheckIdError");
}

/// Create then list then remove round-trips through the real router,
/// exercising the `self`/`check_template` links and `204` no-content shape.
#[tokio::test]
async fn create_list_remove_round_trip() {
    let app = test_app();
    let create_response = app
        .clone()
        .oneshot(authed_request(
            "POST",
            "/v1/checks/",
            Some(create_body(
                "simple_ping",
                json!({"endpoint": "https://example.com"}),
                "* * * * *",
            )),
        ))
        .await
        .unwrap();
    assert_eq!(create_response.status(), StatusCode::CREATED);
    let created = body_json(create_response).await;
    let id = created["data"]["id"].as_str().unwrap().to_string();
    assert!(created["data"]["links"]["check_template"]
        .as_str()
        .unwrap()
        .ends_with("/check_templates/simple_ping"));

    let list_response = app
        .clone()
        .oneshot(authed_request("GET", "/v1/checks/", None))
        .await
        .unwrap();
    assert_eq!(list_response.status(), StatusCode::OK);
    let listed = body_json(list_response).await;
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);

    let remove_response = app
        .clone()
        .oneshot(authed_request("DELETE", &format!("/v1/checks/{id}"), None))
        .await
        .unwrap();
    assert_eq!(remove_response.status(), StatusCode::NO_CONTENT);

    let get_response = app
        .oneshot(authed_request("GET", &format!("/v1/checks/{id}"), None))
        .await
        .unwrap();
    assert_eq!(get_response.status(), StatusCode::NOT_FOUND);
}

/// Anonymous requests (no `Authorization` header) are rejected with a 403.
#[tokio::test]
async fn anonymous_request_is_forbidden() {
    let app = test_app();
    let request = Request::builder()
        .method("GET")
        .uri("/v1/checks/")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

/// `GET /` returns the hypermedia index without requiring authentication.
#[tokio::test]
async fn root_index_is_public() {
    let app = test_app();
    let request = Request::builder().method("GET").uri("/").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["links"]["check_templates"].is_string());
}
