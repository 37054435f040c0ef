use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use agentbox_core::config::RelayConfig;
use agentbox_core::mocks::MockCallRouter;
use agentbox_core::Error;
use agentbox_relay::RelayServer;

fn call_request(capability: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/call/{}", capability))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let router = Arc::new(MockCallRouter::new());
    let server = RelayServer::new(RelayConfig { base_port: 8700, probe_range: 10 }, router);
    let app = server.build_router();

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn successful_call_returns_result_body() {
    let router = Arc::new(MockCallRouter::new());
    router.script("files", "read-file", Ok(json!({ "text": "hello" })));

    let server = RelayServer::new(
        RelayConfig { base_port: 8700, probe_range: 10 },
        router.clone(),
    );
    let app = server.build_router();

    let response = app
        .oneshot(call_request(
            "files",
            json!({ "toolName": "read-file", "arguments": { "path": "a.txt" } }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["result"]["text"], "hello");

    let calls = router.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1, "read-file");
    assert_eq!(calls[0].2["path"], "a.txt");
}

#[tokio::test]
async fn unknown_capability_is_not_found() {
    let router = Arc::new(MockCallRouter::new());
    let server = RelayServer::new(RelayConfig { base_port: 8700, probe_range: 10 }, router);
    let app = server.build_router();

    let response = app
        .oneshot(call_request("ghost", json!({ "toolName": "ping" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert!(json["error"].as_str().unwrap().contains("ghost"));
}

#[tokio::test]
async fn rejected_call_maps_to_conflict() {
    let router = Arc::new(MockCallRouter::new());
    router.script(
        "files",
        "read-file",
        Err(Error::call_rejected("capability 'files' is error")),
    );

    let server = RelayServer::new(RelayConfig { base_port: 8700, probe_range: 10 }, router);
    let app = server.build_router();

    let response = app
        .oneshot(call_request("files", json!({ "toolName": "read-file" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn timed_out_call_maps_to_gateway_timeout() {
    let router = Arc::new(MockCallRouter::new());
    router.script(
        "files",
        "slow-tool",
        Err(Error::call_timeout("tool 'slow-tool' exceeded 500ms")),
    );

    let server = RelayServer::new(RelayConfig { base_port: 8700, probe_range: 10 }, router);
    let app = server.build_router();

    let response = app
        .oneshot(call_request("files", json!({ "toolName": "slow-tool" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
}

#[tokio::test]
async fn sequential_instances_get_distinct_ports() {
    let config = RelayConfig { base_port: 18790, probe_range: 10 };

    let first = RelayServer::new(config.clone(), Arc::new(MockCallRouter::new()));
    let (first_listener, first_port) = first.bind().await.unwrap();

    let second = RelayServer::new(config.clone(), Arc::new(MockCallRouter::new()));
    let (_second_listener, second_port) = second.bind().await.unwrap();

    assert_ne!(first_port, second_port);
    drop(first_listener);
}

#[tokio::test]
async fn exhausted_probe_range_is_reported() {
    let config = RelayConfig { base_port: 18820, probe_range: 2 };

    let a = RelayServer::new(config.clone(), Arc::new(MockCallRouter::new()));
    let (_la, _) = a.bind().await.unwrap();
    let b = RelayServer::new(config.clone(), Arc::new(MockCallRouter::new()));
    let (_lb, _) = b.bind().await.unwrap();

    let c = RelayServer::new(config.clone(), Arc::new(MockCallRouter::new()));
    let err = c.bind().await.unwrap_err();
    assert!(matches!(err, Error::PortExhausted { .. }));
}
