// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP tests driving the router in-process.

#![cfg(feature = "server")]

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use config_registry::domain::{Configuration, ConfigurationGroup, RegistryService};
use config_registry::server::{router, AdmissionLimiter};
use config_registry::service::DefaultRegistry;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn app() -> Router {
    app_with_limiter(AdmissionLimiter::new(10_000, 10_000.0))
}

fn app_with_limiter(limiter: AdmissionLimiter) -> Router {
    let registry: Arc<dyn RegistryService> = Arc::new(DefaultRegistry::in_memory());
    router(registry, Arc::new(limiter))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(body) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(body.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn send_raw(app: &Router, method: Method, uri: &str, body: &'static str) -> StatusCode {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap();
    app.clone().oneshot(request).await.unwrap().status()
}

#[tokio::test]
async fn test_end_to_end_configuration_lifecycle() {
    let app = app();

    let (status, created) = send(
        &app,
        Method::POST,
        "/configs",
        Some(json!({
            "id": "",
            "version": "v1",
            "labels": {"env": "prod"},
            "parameters": [{"key": "timeout", "value": "30"}]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap().to_string();
    assert!(!id.is_empty());

    let (status, fetched) = send(&app, Method::GET, &format!("/configs/{}/v1", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["parameters"], json!([{"key": "timeout", "value": "30"}]));

    let (status, found) = send(&app, Method::GET, "/configs/search?env=prod", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found.as_array().unwrap().len(), 1);
    assert_eq!(found[0]["id"], json!(id));

    let (status, found) = send(&app, Method::GET, "/configs/search?env=dev", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found, json!([]));

    let (status, body) = send(&app, Method::DELETE, &format!("/configs/{}/v1", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, body) = send(&app, Method::GET, &format!("/configs/{}/v1", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains(&id));
}

#[tokio::test]
async fn test_status_mapping() {
    let app = app();
    let record = serde_json::to_value(Configuration::new("svc", "v1")).unwrap();

    // 201 then 409 for the same identity
    let (status, _) = send(&app, Method::POST, "/configs", Some(record.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = send(&app, Method::POST, "/configs", Some(record.clone())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].is_string());

    // 400 for malformed JSON
    assert_eq!(
        send_raw(&app, Method::POST, "/configs", "{not json").await,
        StatusCode::BAD_REQUEST
    );

    // 400 for a path/body identity mismatch
    let (status, _) = send(&app, Method::PUT, "/configs/other/v1", Some(record.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // 200 for an update, 404 for an update of a missing record
    let updated = json!({"id": "svc", "version": "v1", "labels": {"env": "prod"}, "parameters": []});
    let (status, body) = send(&app, Method::PUT, "/configs/svc/v1", Some(updated.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["labels"], json!({"env": "prod"}));

    let missing = json!({"id": "nobody", "version": "v1"});
    let (status, _) = send(&app, Method::PUT, "/configs/nobody/v1", Some(missing)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // 404 for a delete of a missing record
    let (status, _) = send(&app, Method::DELETE, "/configs/nobody/v1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // 400 for a search without labels, in both namespaces
    let (status, body) = send(&app, Method::GET, "/configs/search", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
    let (status, _) = send(&app, Method::GET, "/groups/search", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_search_repeated_key_keeps_first_value() {
    let app = app();

    for (id, env) in [("a", "prod"), ("b", "dev")] {
        let record = serde_json::to_value(Configuration::new(id, "v1").with_label("env", env))
            .unwrap();
        let (status, _) = send(&app, Method::POST, "/configs", Some(record)).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, found) = send(&app, Method::GET, "/configs/search?env=prod&env=dev", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found.as_array().unwrap().len(), 1);
    assert_eq!(found[0]["id"], json!("a"));
}

#[tokio::test]
async fn test_group_routes() {
    let app = app();
    let group = ConfigurationGroup::new("edge", "v2")
        .with_label("team", "net")
        .with_configuration(Configuration::new("proxy", "v1").with_parameter("port", "443"));
    let body = serde_json::to_value(&group).unwrap();

    let (status, created) = send(&app, Method::POST, "/groups", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["configurations"][0]["id"], json!("proxy"));

    let (status, found) = send(&app, Method::GET, "/groups/search?team=net", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found.as_array().unwrap().len(), 1);

    // The configuration namespace does not see groups.
    let (status, _) = send(&app, Method::GET, "/configs/edge/v2", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::DELETE, "/groups/edge/v2", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, Method::GET, "/groups/edge/v2", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_limiter_rejects_excess_requests() {
    let app = app_with_limiter(AdmissionLimiter::new(3, 0.001));

    for _ in 0..3 {
        let (status, _) = send(&app, Method::GET, "/configs/missing/v1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    let request = Request::builder()
        .method(Method::GET)
        .uri("/configs/missing/v1")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));
}

#[tokio::test]
async fn test_throttled_create_never_reaches_registry() {
    let registry = Arc::new(DefaultRegistry::in_memory());
    let app = router(
        registry.clone() as Arc<dyn RegistryService>,
        Arc::new(AdmissionLimiter::new(1, 0.001)),
    );

    let first = serde_json::to_value(Configuration::new("first", "v1")).unwrap();
    let (status, _) = send(&app, Method::POST, "/configs", Some(first)).await;
    assert_eq!(status, StatusCode::CREATED);

    let second = serde_json::to_value(Configuration::new("second", "v1")).unwrap();
    let (status, body) = send(&app, Method::POST, "/configs", Some(second)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(body["error"].is_string());

    assert!(registry.get_configuration("second", "v1").is_err());
}

#[tokio::test]
async fn test_tiny_refill_rate_still_answers_429() {
    let app = app_with_limiter(AdmissionLimiter::new(1, 1e-20));

    let (status, _) = send(&app, Method::GET, "/configs/missing/v1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let request = Request::builder()
        .method(Method::GET)
        .uri("/configs/missing/v1")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = response.headers()[header::RETRY_AFTER]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_after >= 1);
}
