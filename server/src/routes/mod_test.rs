use std::sync::Arc;

use super::*;
use crate::state::test_helpers::{MockIssuer, test_app_state};

/// Bind the router on an ephemeral port and return its base URL.
async fn spawn_app(state: AppState) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app(state)).await.unwrap();
    });
    format!("http://{addr}")
}

fn asset_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("preview-assets-{name}-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("app.js"), "console.log('preview');").unwrap();
    dir
}

#[tokio::test]
async fn healthz_is_ok() {
    let base = spawn_app(test_app_state(Arc::new(MockIssuer::ok()), &[])).await;
    let response = reqwest::get(format!("{base}/healthz")).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
}

#[tokio::test]
async fn serves_script_bundle_under_js() {
    let dir = asset_dir("bundle");
    let dir_str = dir.to_string_lossy().into_owned();
    let state = test_app_state(Arc::new(MockIssuer::ok()), &[("PREVIEW_ASSET_DIR", dir_str.as_str())]);
    let base = spawn_app(state).await;

    let response = reqwest::get(format!("{base}/js/app.js")).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "console.log('preview');");

    let missing = reqwest::get(format!("{base}/js/nope.js")).await.unwrap();
    assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn session_route_reads_authorization_header() {
    let issuer = Arc::new(MockIssuer::ok());
    let base = spawn_app(test_app_state(issuer.clone(), &[])).await;

    let response = reqwest::Client::new()
        .get(format!("{base}/api/session?editionId=e9&userId=u2"))
        .header("Authorization", "apikey hdr-key")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["editionId"], "e9");
    assert_eq!(issuer.recorded(), vec![("hdr-key".to_owned(), "u2".to_owned(), "e9".to_owned())]);
}

#[tokio::test]
async fn preview_route_is_html() {
    let base = spawn_app(test_app_state(Arc::new(MockIssuer::ok()), &[])).await;
    let response = reqwest::get(format!("{base}/?editionId=e1&userId=u1&apikey=k")).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap().to_owned();
    assert!(content_type.starts_with("text/html"));
    assert!(response.text().await.unwrap().contains("window.previewSession"));
}

#[tokio::test]
async fn preview_route_loads_bundle_only_when_installed() {
    let dir = asset_dir("installed");
    let dir_str = dir.to_string_lossy().into_owned();
    let with_bundle = test_app_state(Arc::new(MockIssuer::ok()), &[("PREVIEW_ASSET_DIR", dir_str.as_str())]);
    let base = spawn_app(with_bundle).await;
    let html = reqwest::get(format!("{base}/?editionId=e1&userId=u1&apikey=k")).await.unwrap().text().await.unwrap();
    assert!(html.contains("<script src=\"/js/app.js\"></script>"));

    let empty = std::env::temp_dir().join(format!("preview-assets-empty-{}", std::process::id()));
    std::fs::create_dir_all(&empty).unwrap();
    let empty_str = empty.to_string_lossy().into_owned();
    let without_bundle = test_app_state(Arc::new(MockIssuer::ok()), &[("PREVIEW_ASSET_DIR", empty_str.as_str())]);
    let base = spawn_app(without_bundle).await;
    let html = reqwest::get(format!("{base}/?editionId=e1&userId=u1&apikey=k")).await.unwrap().text().await.unwrap();
    assert!(!html.contains("<script src="));
    assert!(html.contains("preview-cli watch"));
}
