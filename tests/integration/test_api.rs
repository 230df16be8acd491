//! Integration tests for the HTTP API over a real socket.
//!
//! Each test binds the router to an ephemeral port and talks to it with
//! `reqwest`, the way a front end or the emotion poller would.

use std::sync::Arc;

use lumen_tutor::{create_router, AppState, Config, DemoTutor, HeuristicScorer};
use serde_json::{json, Value};

const QUESTION: &str = "A force of 20 N acts on a body of mass 4 kg. Find the acceleration.";

/// Spawns the API server and returns its base URL.
async fn spawn_test_server(state: AppState) -> (String, tokio::task::JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to get local addr");

    let router = create_router(state);
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Server failed");
    });

    (format!("http://{addr}/api"), handle)
}

fn demo_state(config: Config) -> AppState {
    AppState::new(
        config,
        Arc::new(DemoTutor::new()),
        Arc::new(HeuristicScorer::default()),
    )
}

async fn post(client: &reqwest::Client, url: String, body: Value) -> (u16, Value) {
    let response = client
        .post(url)
        .json(&body)
        .send()
        .await
        .expect("Request failed");
    let status = response.status().as_u16();
    let body = response.json().await.expect("Response was not JSON");
    (status, body)
}

#[tokio::test]
async fn test_session_round_trip_over_http() {
    let (base, _handle) = spawn_test_server(demo_state(Config::default())).await;
    let client = reqwest::Client::new();

    let (status, opening) = post(
        &client,
        format!("{base}/session/start"),
        json!({ "questionText": QUESTION, "language": "telugu" }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(opening["subject"], "physics");
    assert_eq!(opening["mode"], "socratic");
    assert!(opening["tutorReply"].as_str().is_some_and(|s| !s.is_empty()));

    let (status, outcome) = post(
        &client,
        format!("{base}/session/reply"),
        json!({ "reply": "I don't know", "emotion": "happy" }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(outcome["record"]["verdict"], "incorrect");
    assert_eq!(outcome["record"]["score"], 25);
    assert_eq!(outcome["record"]["delta"], -5);
    assert_eq!(outcome["sessionComplete"], false);

    let (status, emotion) = post(
        &client,
        format!("{base}/session/emotion"),
        json!({ "emotion": "sad" }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(emotion["emotion"], "sad");
    assert_eq!(emotion["mode"], "hint");

    let status: Value = client
        .get(format!("{base}/session/status"))
        .send()
        .await
        .expect("Request failed")
        .json()
        .await
        .expect("Response was not JSON");
    assert_eq!(status["active"], true);
    assert_eq!(status["language"], "telugu");
    assert_eq!(status["turnCount"], 1);
    assert_eq!(status["wrongStreak"], 1);
    assert_eq!(status["history"].as_array().map(Vec::len), Some(1));

    let (code, reset) = post(&client, format!("{base}/session/reset"), json!({})).await;
    assert_eq!(code, 200);
    assert_eq!(reset["reset"], true);
}

#[tokio::test]
async fn test_wrong_state_errors_over_http() {
    let (base, _handle) = spawn_test_server(demo_state(Config::default())).await;
    let client = reqwest::Client::new();

    let (status, body) = post(
        &client,
        format!("{base}/session/reply"),
        json!({ "reply": "F = ma" }),
    )
    .await;
    assert_eq!(status, 409);
    assert!(body["error"].as_str().is_some());

    let (status, body) = post(
        &client,
        format!("{base}/session/start"),
        json!({ "questionText": "  \n  " }),
    )
    .await;
    assert_eq!(status, 400);
    assert!(body["error"].as_str().is_some());
}

#[tokio::test]
async fn test_turn_limit_over_http() {
    let mut config = Config::default();
    config.socratic.max_turns = 1;
    let (base, _handle) = spawn_test_server(demo_state(config)).await;
    let client = reqwest::Client::new();

    post(
        &client,
        format!("{base}/session/start"),
        json!({ "questionText": QUESTION }),
    )
    .await;

    let (status, outcome) = post(
        &client,
        format!("{base}/session/reply"),
        json!({ "reply": "force equals mass times acceleration" }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(outcome["sessionComplete"], true);

    let (status, _) = post(
        &client,
        format!("{base}/session/reply"),
        json!({ "reply": "again" }),
    )
    .await;
    assert_eq!(status, 409);
}

/// `from_config` wires the Ollama client behind the demo fallback, so the
/// API keeps answering when no model server is running.
#[tokio::test]
async fn test_from_config_survives_missing_ollama() {
    let mut config = Config::default();
    config.ollama.base_url = "http://127.0.0.1:9".to_string();
    config.ollama.timeout_seconds = 5;
    let state = AppState::from_config(config).expect("Failed to build state");

    let (base, _handle) = spawn_test_server(state).await;
    let client = reqwest::Client::new();

    let (status, opening) = post(
        &client,
        format!("{base}/session/start"),
        json!({ "questionText": QUESTION }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(
        opening["tutorReply"].as_str(),
        Some(DemoTutor::new().next_response().as_str())
    );
}

#[tokio::test]
async fn test_model_scoring_offline_keeps_demo_order_over_http() {
    let mut config = Config::default();
    config.ollama.base_url = "http://127.0.0.1:9".to_string();
    config.ollama.timeout_seconds = 5;
    config.scoring.use_model = true;
    let state = AppState::from_config(config).expect("Failed to build state");

    let (base, _handle) = spawn_test_server(state).await;
    let client = reqwest::Client::new();
    let script = DemoTutor::new();

    let (_, opening) = post(
        &client,
        format!("{base}/session/start"),
        json!({ "questionText": QUESTION }),
    )
    .await;
    assert_eq!(opening["tutorReply"].as_str(), Some(script.next_response().as_str()));

    for reply in ["F = ma", "so the acceleration is 5 m/s²"] {
        let (status, outcome) = post(
            &client,
            format!("{base}/session/reply"),
            json!({ "reply": reply }),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(outcome["record"]["source"], "model_fallback");
        assert_eq!(
            outcome["tutorReply"].as_str(),
            Some(script.next_response().as_str())
        );
    }
}
