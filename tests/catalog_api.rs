//! Integration tests for the catalog surfaces: chatbots, leaderboard,
//! toolkit, benchmark proposals, and the operational endpoints.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use promptgrid::{
    config::Config,
    handlers::{self, AppState},
    models::{BenchmarkProposal, LeaderboardEntry, ProposalStatus, ToolkitEntry},
    store::Database,
};
use serde_json::json;
use std::str::FromStr;
use tower::ServiceExt;

fn create_test_app() -> Router {
    let toml = r#"
[server]
host = "127.0.0.1"
port = 3000
request_timeout_seconds = 30

[providers.openai]
api_key = "sk-test"

[providers.anthropic]
api_key = "sk-ant-test"

[[chatbots]]
id = "gpt-4o"
name = "GPT-4o"
provider = "openai"
model = "gpt-4o"

[[chatbots]]
id = "sonnet"
name = "Claude Sonnet"
provider = "anthropic"
model = "claude-sonnet-4-5"
"#;
    let config = Config::from_str(toml).expect("should parse test config");
    let store = Database::open_in_memory().expect("should open in-memory store");
    let state = AppState::new(config, store).expect("should create AppState");
    handlers::router(state)
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).expect("response should be valid JSON")
}

#[tokio::test]
async fn test_chatbots_endpoint_serves_catalog() {
    let app = create_test_app();

    let response = app.oneshot(get_request("/api/chatbots")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let chatbots = body["chatbots"].as_array().expect("chatbots array");
    assert_eq!(chatbots.len(), 2);
    assert_eq!(chatbots[0]["id"], "gpt-4o");
    assert_eq!(chatbots[0]["provider"], "openai");
    assert_eq!(chatbots[1]["provider"], "anthropic");
}

#[tokio::test]
async fn test_health_endpoint_reports_counts() {
    let app = create_test_app();

    let response = app.oneshot(get_request("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "OK");
    assert_eq!(body["chatbots"], 2);
    assert_eq!(body["providers"], 2);
}

#[tokio::test]
async fn test_leaderboard_upsert_list_delete_cycle() {
    let app = create_test_app();

    // Upsert two entries
    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/api/leaderboard/gpt-4o",
            json!({"score": 1310.5, "wins": 20, "losses": 4}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/api/leaderboard/sonnet",
            json!({"score": 1405.0, "wins": 25, "losses": 2}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Highest score first
    let response = app.clone().oneshot(get_request("/api/leaderboard")).await.unwrap();
    let entries: Vec<LeaderboardEntry> =
        serde_json::from_value(body_json(response).await).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].chatbot_id, "sonnet");
    assert_eq!(entries[1].chatbot_id, "gpt-4o");

    // Overwrite rather than duplicate
    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/api/leaderboard/gpt-4o",
            json!({"score": 1500.0}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.clone().oneshot(get_request("/api/leaderboard")).await.unwrap();
    let entries: Vec<LeaderboardEntry> =
        serde_json::from_value(body_json(response).await).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].chatbot_id, "gpt-4o");
    assert_eq!(entries[0].score, 1500.0);
    assert_eq!(entries[0].wins, 0, "omitted wins default to zero");

    // Delete
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/leaderboard/gpt-4o")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.oneshot(get_request("/api/leaderboard")).await.unwrap();
    let entries: Vec<LeaderboardEntry> =
        serde_json::from_value(body_json(response).await).unwrap();
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn test_leaderboard_rejects_unknown_chatbot_and_bad_score() {
    let app = create_test_app();

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/api/leaderboard/unknown-bot",
            json!({"score": 1000.0}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // NaN is not representable in JSON; null fails deserialization
    let response = app
        .oneshot(json_request(
            "PUT",
            "/api/leaderboard/gpt-4o",
            json!({"score": null}),
        ))
        .await
        .unwrap();
    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_toolkit_create_list_delete_cycle() {
    let app = create_test_app();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/toolkit",
            json!({
                "name": "Tokenizer playground",
                "category": "debugging",
                "url": "https://example.com/tokenizer",
                "description": "Compare tokenizations across providers"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: ToolkitEntry = serde_json::from_value(body_json(response).await).unwrap();

    let response = app.clone().oneshot(get_request("/api/toolkit")).await.unwrap();
    let entries: Vec<ToolkitEntry> = serde_json::from_value(body_json(response).await).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "Tokenizer playground");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/toolkit/{}", created.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.oneshot(get_request("/api/toolkit")).await.unwrap();
    let entries: Vec<ToolkitEntry> = serde_json::from_value(body_json(response).await).unwrap();
    assert!(entries.is_empty());
}

#[tokio::test]
async fn test_proposal_lifecycle_open_to_accepted() {
    let app = create_test_app();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/benchmarks/proposals",
            json!({
                "title": "Long-context recall",
                "description": "Needle in a haystack at 200k tokens",
                "category": "reasoning"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: BenchmarkProposal = serde_json::from_value(body_json(response).await).unwrap();
    assert_eq!(created.status, ProposalStatus::Open);

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/benchmarks/proposals/{}/status", created.id),
            json!({"status": "accepted"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get_request("/api/benchmarks/proposals"))
        .await
        .unwrap();
    let proposals: Vec<BenchmarkProposal> =
        serde_json::from_value(body_json(response).await).unwrap();
    assert_eq!(proposals.len(), 1);
    assert_eq!(proposals[0].status, ProposalStatus::Accepted);

    // Status transition on a missing proposal is a 404
    let response = app
        .oneshot(json_request(
            "PUT",
            "/api/benchmarks/proposals/missing/status",
            json!({"status": "rejected"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_metrics_endpoint_serves_prometheus_text() {
    let app = create_test_app();

    let response = app.oneshot(get_request("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/plain"));
}
