/// Full router exercised through `tower::ServiceExt::oneshot`

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use gateway_core::dispatch::{DispatchMode, DispatchResult, Dispatcher, OutboundRequest};
use gateway_core::error::Result;
use gateway_core::observability::MetricsCollector;
use gateway_core::server::{build_router, AppState};
use gateway_core::storage::{MemoryResponseStore, MemorySourceStore};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

/// Reflects each descriptor back as the upstream response body.
struct ReflectingDispatcher;

#[async_trait]
impl Dispatcher for ReflectingDispatcher {
    async fn dispatch(
        &self,
        requests: Vec<OutboundRequest>,
        _mode: DispatchMode,
    ) -> Result<Vec<DispatchResult>> {
        Ok(requests
            .into_iter()
            .map(|r| DispatchResult::response(200, serde_json::to_value(r).unwrap()))
            .collect())
    }
}

fn app() -> Router {
    let state = AppState::new(
        Arc::new(MemorySourceStore::new()),
        Arc::new(MemoryResponseStore::new()),
        Arc::new(ReflectingDispatcher),
        MetricsCollector::new().unwrap(),
    );
    build_router(state)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(body) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(body.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).expect("request"))
        .await
        .expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("read body");
    (status, bytes.to_vec())
}

async fn send_json(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let (status, bytes) = send(app, method, uri, body).await;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}

async fn create(app: &Router, collection: &str, body: Value) -> String {
    let (status, created) = send_json(app, Method::POST, collection, Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {}", created);
    created["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health() {
    let (status, body) = send_json(&app(), Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_mapper_route_delivers_envelope() {
    let app = app();
    let id = create(
        &app,
        "/sources",
        json!({
            "name": "orders",
            "mapping": {
                "method": "GET",
                "url": "https://up.test/{{ params.sourceId }}/{{ params.item }}",
                "headers": { "x-caller": "{{ headers['x-caller'] }}" },
            },
        }),
    )
    .await;

    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("/mappers/{}?item=42", id))
        .header("x-caller", "tests")
        .body(Body::from("not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value =
        serde_json::from_slice(&to_bytes(response.into_body(), usize::MAX).await.unwrap()).unwrap();

    assert_eq!(body["sourceId"], id);
    assert_eq!(body["context"]["method"], "POST");
    assert_eq!(body["context"]["params"]["item"], "42");
    assert_eq!(body["context"]["body"], "not json");
    assert_eq!(body["context"]["headers"]["x-caller"], "tests");

    let delivered = body["delivered"].as_array().unwrap();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0]["body"]["url"], format!("https://up.test/{}/42", id));
    assert_eq!(delivered[0]["body"]["headers"]["x-caller"], "tests");
    assert!(body.get("responseId").is_none());
}

#[tokio::test]
async fn test_query_overrides_path_param() {
    let app = app();
    let id = create(
        &app,
        "/sources",
        json!({ "name": "echo", "mapping": { "url": "https://up.test/{{ params.sourceId }}" } }),
    )
    .await;

    let (status, body) = send_json(
        &app,
        Method::GET,
        &format!("/mappers/{}?sourceId=override", id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sourceId"], id);
    assert_eq!(body["context"]["params"]["sourceId"], "override");
    assert_eq!(body["delivered"][0]["body"]["url"], "https://up.test/override");
}

#[tokio::test]
async fn test_transformed_reply_is_verbatim() {
    let app = app();
    let response_id = create(
        &app,
        "/responses",
        json!({ "name": "ok", "template": { "status": 201, "body": { "ok": true } } }),
    )
    .await;
    let id = create(
        &app,
        "/sources",
        json!({
            "name": "creator",
            "responseId": response_id,
            "mapping": { "url": "https://up.test/create" },
        }),
    )
    .await;

    let (status, bytes) = send(&app, Method::PUT, &format!("/mappers/{}", id), Some(json!({}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(bytes, br#"{"ok":true}"#.to_vec());
}

#[tokio::test]
async fn test_transformed_text_reply_with_headers() {
    let app = app();
    let response_id = create(
        &app,
        "/responses",
        json!({
            "name": "text",
            "template": {
                "status": "{{ responses[0].status }}",
                "headers": { "x-upstream-url": "{{ responses[0].body.url }}" },
                "body": "fetched {{ responses | length }}",
            },
        }),
    )
    .await;
    let id = create(
        &app,
        "/sources",
        json!({
            "name": "texty",
            "responseId": response_id,
            "mapping": { "url": "https://up.test/text" },
        }),
    )
    .await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/mappers/{}", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-upstream-url"], "https://up.test/text");
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"fetched 1");
}

#[tokio::test]
async fn test_transformer_cannot_set_framing_headers() {
    let app = app();
    let response_id = create(
        &app,
        "/responses",
        json!({
            "name": "framing",
            "template": {
                "headers": {
                    "content-length": "999",
                    "transfer-encoding": "chunked",
                    "connection": "close",
                    "x-source": "gateway",
                },
                "body": { "ok": true },
            },
        }),
    )
    .await;
    let id = create(
        &app,
        "/sources",
        json!({
            "name": "framed",
            "responseId": response_id,
            "mapping": { "url": "https://up.test/a" },
        }),
    )
    .await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/mappers/{}", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-source"], "gateway");
    assert!(response.headers().get(header::TRANSFER_ENCODING).is_none());
    assert!(response.headers().get(header::CONNECTION).is_none());
    assert_ne!(
        response.headers().get(header::CONTENT_LENGTH).map(|v| v.as_bytes()),
        Some(&b"999"[..])
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], br#"{"ok":true}"#);
}

#[tokio::test]
async fn test_uppercase_ids_resolve_to_the_same_records() {
    let app = app();
    let response_id = create(
        &app,
        "/responses",
        json!({ "name": "upper", "template": { "status": 202 } }),
    )
    .await;
    let id = create(
        &app,
        "/sources",
        json!({
            "name": "upper",
            "responseId": response_id.to_uppercase(),
            "mapping": { "url": "https://up.test/a" },
        }),
    )
    .await;

    let (status, fetched) =
        send_json(&app, Method::GET, &format!("/sources/{}", id.to_uppercase()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["responseId"], response_id);

    let (status, _) = send(&app, Method::GET, &format!("/mappers/{}", id.to_uppercase()), None).await;
    assert_eq!(status, StatusCode::ACCEPTED);
}

#[tokio::test]
async fn test_transform_failure_degrades_to_envelope() {
    let app = app();
    let response_id = create(
        &app,
        "/responses",
        json!({ "name": "broken", "template": { "status": "{{ 'teapot' }}" } }),
    )
    .await;
    let id = create(
        &app,
        "/sources",
        json!({
            "name": "degraded",
            "responseId": response_id,
            "mapping": { "url": "https://up.test/a" },
        }),
    )
    .await;

    let (status, body) = send_json(&app, Method::DELETE, &format!("/mappers/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["responseId"], response_id);
    assert_eq!(body["delivered"].as_array().unwrap().len(), 1);
    assert!(body["TRANSFORM_RESPONSE_ERROR"].is_string());
}

#[tokio::test]
async fn test_invalid_and_unknown_source_ids() {
    let app = app();

    let (status, body) = send_json(&app, Method::GET, "/mappers/not-an-id", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_SOURCE_ID");
    assert!(body.get("context").is_none());

    let (status, body) =
        send_json(&app, Method::PATCH, "/mappers/0123456789abcdef01234567", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "DATABASE_ERROR");
    assert_eq!(body["sourceId"], "0123456789abcdef01234567");
    assert_eq!(body["context"]["method"], "PATCH");
}

#[tokio::test]
async fn test_source_admin_lifecycle() {
    let app = app();
    let id = create(&app, "/sources", json!({ "name": "crud", "mapping": [] })).await;

    let (status, listed) = send_json(&app, Method::GET, "/sources", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, fetched) = send_json(&app, Method::GET, &format!("/sources/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["name"], "crud");
    assert_eq!(fetched["serial"], false);

    let (status, body) = send_json(
        &app,
        Method::POST,
        "/sources",
        Some(json!({ "name": "crud", "mapping": {} })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    let (status, _) = send_json(&app, Method::DELETE, &format!("/sources/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send_json(&app, Method::GET, &format!("/sources/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_source_with_malformed_response_id_is_rejected() {
    let (status, body) = send_json(
        &app(),
        Method::POST,
        "/sources",
        Some(json!({ "name": "x", "responseId": "nope", "mapping": {} })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_response_admin_lifecycle() {
    let app = app();
    let id = create(&app, "/responses", json!({ "name": "r", "template": {} })).await;

    let (status, fetched) = send_json(&app, Method::GET, &format!("/responses/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["template"], json!({}));

    let (status, _) = send_json(&app, Method::DELETE, &format!("/responses/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send_json(&app, Method::GET, &format!("/responses/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, listed) = send_json(&app, Method::GET, "/responses", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = app();
    send(&app, Method::GET, "/mappers/bad", None).await;

    let (status, bytes) = send(&app, Method::GET, "/metrics", None).await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(bytes).unwrap();
    assert!(text.contains("gateway_requests_total{outcome=\"INVALID_SOURCE_ID\"} 1"));
}
