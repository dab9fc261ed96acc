//! The strategy endpoint against a stand-in generative text API.

use axum::{
    extract::Path,
    http::{HeaderMap, StatusCode as AxumStatus},
    routing::post,
    Json, Router,
};
use reqwest::StatusCode;
use serde_json::{json, Value};
use tokio::task::JoinHandle;

use lib_site::strategy::StrategyClient;
use project_tests::{serve_router, spawn_site, spawn_site_with};

const KEY: &str = "test-model-key";

/// Answers like the real API when the key matches; echoes the prompt back.
async fn fake_generate(
    Path(action): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (AxumStatus, Json<Value>) {
    if headers.get("x-goog-api-key").and_then(|v| v.to_str().ok()) != Some(KEY) {
        return (AxumStatus::FORBIDDEN, Json(json!({ "error": "bad key" })));
    }
    if action != "test-model:generateContent" {
        return (AxumStatus::NOT_FOUND, Json(json!({ "error": action })));
    }
    let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap_or("").to_string();
    let industry_line = prompt.lines().find(|l| l.starts_with("Industry:")).unwrap_or("").to_string();
    (
        AxumStatus::OK,
        Json(json!({
            "candidates": [{ "content": { "parts": [
                { "text": "1. Local SEO. " },
                { "text": industry_line }
            ] } }]
        })),
    )
}

async fn fake_api() -> (String, JoinHandle<()>) {
    let router = Router::new().route("/v1beta/models/{action}", post(fake_generate));
    serve_router(router).await
}

#[tokio::test]
async fn returns_the_model_text() {
    let (base, _fake) = fake_api().await;
    let client = StrategyClient::new(&base, KEY, "test-model").unwrap();
    let site = spawn_site_with(Some(client), |_| {}).await;

    let resp = reqwest::Client::new()
        .post(site.url("/api/strategy"))
        .json(&json!({ "businessName": "Lumen Dental", "industry": "Dental", "goals": "More bookings" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["strategy"], json!("1. Local SEO. Industry: Dental"));
}

#[tokio::test]
async fn blank_goals_are_a_400() {
    let (base, _fake) = fake_api().await;
    let client = StrategyClient::new(&base, KEY, "test-model").unwrap();
    let site = spawn_site_with(Some(client), |_| {}).await;

    let resp = reqwest::Client::new()
        .post(site.url("/api/strategy"))
        .json(&json!({ "industry": "Dental", "goals": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn upstream_rejection_is_a_502() {
    let (base, _fake) = fake_api().await;
    let client = StrategyClient::new(&base, "wrong-key", "test-model").unwrap();
    let site = spawn_site_with(Some(client), |_| {}).await;

    let resp = reqwest::Client::new()
        .post(site.url("/api/strategy"))
        .json(&json!({ "industry": "Retail", "goals": "Sales" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error_type"], json!("StrategyUpstreamError"));
}

#[tokio::test]
async fn disabled_without_a_key() {
    let site = spawn_site().await;
    let resp = reqwest::Client::new()
        .post(site.url("/api/strategy"))
        .json(&json!({ "industry": "Retail", "goals": "Sales" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}
