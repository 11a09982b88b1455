//! Integration tests for run creation and dispatch
//!
//! Provider traffic is served by wiremock doubles; the dispatcher runs for
//! real against an in-memory store and the tests poll GET /api/runs/{id}
//! the way a client would.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use promptgrid::{
    config::Config,
    handlers::{self, AppState},
    models::{Run, RunStatus, Session},
    store::Database,
};
use serde_json::json;
use std::str::FromStr;
use std::time::Duration;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_test_app(openai_base: &str, xai_base: &str) -> Router {
    let toml = format!(
        r#"
[server]
host = "127.0.0.1"
port = 3000
request_timeout_seconds = 5

[dispatch]
max_concurrent_chatbots = 4

[providers.openai]
api_key = "sk-test"
base_url = "{openai_base}"

[providers.xai]
api_key = "xai-test"
base_url = "{xai_base}"

[[chatbots]]
id = "gpt-4o"
name = "GPT-4o"
provider = "openai"
model = "gpt-4o"

[[chatbots]]
id = "grok"
name = "Grok"
provider = "xai"
model = "grok-4"
"#
    );
    let config = Config::from_str(&toml).expect("should parse test config");
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

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).expect("response should be valid JSON")
}

async fn create_session(app: &Router, prompts: &[&str]) -> Session {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/sessions",
            json!({"name": "test session", "prompts": prompts}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    serde_json::from_value(body_json(response).await).unwrap()
}

async fn create_run(app: &Router, session_id: &str, chatbot_ids: &[&str]) -> Run {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/runs",
            json!({"session_id": session_id, "chatbot_ids": chatbot_ids}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    serde_json::from_value(body_json(response).await).unwrap()
}

/// Poll the run until it reaches a terminal status, like a client would
async fn poll_until_terminal(app: &Router, run_id: &str) -> Run {
    for _ in 0..200 {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/api/runs/{run_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let run: Run = serde_json::from_value(body_json(response).await).unwrap();
        if run.status.is_terminal() {
            return run;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("run {run_id} did not reach a terminal status in time");
}

fn openai_reply(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "id": "chatcmpl-test",
        "choices": [
            {"index": 0, "message": {"role": "assistant", "content": content}, "finish_reason": "stop"}
        ]
    }))
}

#[tokio::test]
async fn test_run_collects_responses_from_all_chatbots() {
    let openai_mock = MockServer::start().await;
    let xai_mock = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(openai_reply("Paris."))
        .mount(&openai_mock)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(openai_reply("It is Paris."))
        .mount(&xai_mock)
        .await;

    let app = create_test_app(&openai_mock.uri(), &xai_mock.uri());
    let session = create_session(&app, &["What is the capital of France?"]).await;
    let run = create_run(&app, &session.id, &["gpt-4o", "grok"]).await;
    assert_eq!(run.status, RunStatus::Pending);
    assert!(run.responses.is_empty());

    let finished = poll_until_terminal(&app, &run.id).await;
    assert_eq!(finished.status, RunStatus::Completed);
    assert!(finished.completed_at.is_some());
    assert_eq!(finished.responses.len(), 2);

    let by_bot = |id: &str| {
        finished
            .responses
            .iter()
            .find(|r| r.chatbot_id == id)
            .unwrap_or_else(|| panic!("missing response for {id}"))
    };
    assert_eq!(by_bot("gpt-4o").content.as_deref(), Some("Paris."));
    assert_eq!(by_bot("grok").content.as_deref(), Some("It is Paris."));
    assert!(by_bot("gpt-4o").error.is_none());
}

#[tokio::test]
async fn test_multi_step_run_keeps_step_order_per_chatbot() {
    let openai_mock = MockServer::start().await;
    let xai_mock = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(openai_reply("answer"))
        .mount(&openai_mock)
        .await;

    let app = create_test_app(&openai_mock.uri(), &xai_mock.uri());
    let session = create_session(&app, &["first question", "second question", "third"]).await;
    let run = create_run(&app, &session.id, &["gpt-4o"]).await;

    let finished = poll_until_terminal(&app, &run.id).await;
    assert_eq!(finished.status, RunStatus::Completed);

    let steps: Vec<u32> = finished
        .responses
        .iter()
        .filter(|r| r.chatbot_id == "gpt-4o")
        .map(|r| r.step_order)
        .collect();
    assert_eq!(steps, vec![0, 1, 2], "steps must run strictly in order");
}

#[tokio::test]
async fn test_failing_provider_records_error_and_run_completes_partially() {
    let openai_mock = MockServer::start().await;
    let xai_mock = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(openai_reply("fine"))
        .mount(&openai_mock)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {"message": "Rate limit reached", "type": "rate_limit_error"}
        })))
        .mount(&xai_mock)
        .await;

    let app = create_test_app(&openai_mock.uri(), &xai_mock.uri());
    let session = create_session(&app, &["q1", "q2"]).await;
    let run = create_run(&app, &session.id, &["gpt-4o", "grok"]).await;

    let finished = poll_until_terminal(&app, &run.id).await;

    // One chatbot answered, so the run completes; the other carries errors
    assert_eq!(finished.status, RunStatus::Completed);

    let grok_rows: Vec<_> = finished
        .responses
        .iter()
        .filter(|r| r.chatbot_id == "grok")
        .collect();
    // A failed step ends that chatbot's conversation: step 1 is never sent
    assert_eq!(grok_rows.len(), 1);
    assert_eq!(grok_rows[0].step_order, 0);
    assert!(grok_rows[0].content.is_none());
    let error = grok_rows[0].error.as_deref().expect("error string recorded");
    assert!(error.contains("Rate limit reached"), "got: {error}");

    let gpt_rows: Vec<_> = finished
        .responses
        .iter()
        .filter(|r| r.chatbot_id == "gpt-4o")
        .collect();
    assert_eq!(gpt_rows.len(), 2);
    assert!(gpt_rows.iter().all(|r| r.content.is_some()));
}

#[tokio::test]
async fn test_run_fails_when_every_call_errors() {
    let openai_mock = MockServer::start().await;
    let xai_mock = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&openai_mock)
        .await;

    let app = create_test_app(&openai_mock.uri(), &xai_mock.uri());
    let session = create_session(&app, &["q1"]).await;
    let run = create_run(&app, &session.id, &["gpt-4o"]).await;

    let finished = poll_until_terminal(&app, &run.id).await;
    assert_eq!(finished.status, RunStatus::Failed);
    assert_eq!(finished.responses.len(), 1);
    let error = finished.responses[0].error.as_deref().expect("error string");
    assert!(error.contains("500"), "got: {error}");
}

#[tokio::test]
async fn test_create_run_validates_session_and_chatbots() {
    let openai_mock = MockServer::start().await;
    let xai_mock = MockServer::start().await;
    let app = create_test_app(&openai_mock.uri(), &xai_mock.uri());

    // Unknown session
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/runs",
            json!({"session_id": "missing", "chatbot_ids": ["gpt-4o"]}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Unknown chatbot id
    let session = create_session(&app, &["q"]).await;
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/runs",
            json!({"session_id": session.id, "chatbot_ids": ["nonexistent-bot"]}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("nonexistent-bot"));
}

#[tokio::test]
async fn test_list_runs_filters_by_session() {
    let openai_mock = MockServer::start().await;
    let xai_mock = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(openai_reply("ok"))
        .mount(&openai_mock)
        .await;

    let app = create_test_app(&openai_mock.uri(), &xai_mock.uri());
    let session_one = create_session(&app, &["q"]).await;
    let session_two = create_session(&app, &["q"]).await;
    let run_one = create_run(&app, &session_one.id, &["gpt-4o"]).await;
    let _run_two = create_run(&app, &session_two.id, &["gpt-4o"]).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/runs?session_id={}", session_one.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let runs: Vec<Run> = serde_json::from_value(body_json(response).await).unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].id, run_one.id);

    // Wait out the dispatched runs so their tasks don't outlive the store
    poll_until_terminal(&app, &run_one.id).await;
}

#[tokio::test]
async fn test_metrics_reflect_provider_traffic() {
    let openai_mock = MockServer::start().await;
    let xai_mock = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(openai_reply("ok"))
        .mount(&openai_mock)
        .await;

    let app = create_test_app(&openai_mock.uri(), &xai_mock.uri());
    let session = create_session(&app, &["q"]).await;
    let run = create_run(&app, &session.id, &["gpt-4o"]).await;
    poll_until_terminal(&app, &run.id).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("promptgrid_provider_requests_total"));
    assert!(text.contains("provider=\"openai\""));
    assert!(text.contains("promptgrid_runs_total"));
    assert!(text.contains("status=\"completed\""));
}
