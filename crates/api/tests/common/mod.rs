#![allow(dead_code)]

use std::path::Path;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use lpa_api::config::ServerConfig;
use lpa_api::router::build_app_router;
use lpa_api::state::AppState;

/// Build a test `ServerConfig` rooted at `data_dir`.
///
/// Label Studio is configured only when `label_studio_url` is given.
pub fn test_config(data_dir: &Path, label_studio_url: Option<&str>) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:7501".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        data_dir: data_dir.to_path_buf(),
        label_studio_url: label_studio_url.unwrap_or("http://localhost:8080").to_string(),
        label_studio_api_key: label_studio_url.map(|_| "test-token".to_string()),
    }
}

/// Build the app with the same middleware stack production uses, returning
/// the state as well so tests can inspect jobs and the shutdown token.
pub fn build_test_app(data_dir: &Path) -> (Router, AppState) {
    build_test_app_with(test_config(data_dir, None))
}

pub fn build_test_app_with(config: ServerConfig) -> (Router, AppState) {
    let state = AppState::new(config);
    (build_app_router(state.clone()), state)
}

pub async fn send(app: Router, request: Request<Body>) -> Response {
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_json(app: Router, uri: &str, json: serde_json::Value) -> Response {
    json_request(app, Method::POST, uri, json).await
}

pub async fn put_json(app: Router, uri: &str, json: serde_json::Value) -> Response {
    json_request(app, Method::PUT, uri, json).await
}

async fn json_request(app: Router, method: Method, uri: &str, json: serde_json::Value) -> Response {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&json).unwrap()))
        .unwrap();
    send(app, request).await
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Create a project through the API and assert it succeeded.
pub async fn create_project(app: Router, name: &str, keypoints: &[&str]) {
    let response = post_json(
        app,
        "/api/v1/projects",
        serde_json::json!({ "name": name, "keypoints": keypoints }),
    )
    .await;
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);
}
