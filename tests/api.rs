//! End-to-end tests: the orchestration router on an ephemeral port, called over HTTP.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use greenhill_cockpit::agents::{
    AgentRegistry, DispatchRequest, DispatchResponse, Dispatcher, NOT_CONFIGURED_MESSAGE,
};
use greenhill_cockpit::api::{router, AppState};
use greenhill_cockpit::config::{Config, OrchestrationConfig};
use greenhill_cockpit::llm::{
    ChatMessage, ChatOptions, ChatResponse, LlmClient, LlmError, OpenAiClient, TokenUsage,
};
use greenhill_cockpit::orchestration::{InvokeOutcome, OrchestrationClient};
use greenhill_cockpit::storage::{DispatchState, EvidenceEntry, EvidenceLog, StateStore};
use serde_json::{json, Value};
use tempfile::TempDir;

/// Answers with the user message echoed back and a fixed token count.
struct EchoProvider;

#[async_trait]
impl LlmClient for EchoProvider {
    async fn chat_completion(
        &self,
        model: &str,
        messages: &[ChatMessage],
        _options: ChatOptions,
    ) -> Result<ChatResponse, LlmError> {
        let question = messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        Ok(ChatResponse {
            content: Some(format!("echo: {}", question)),
            finish_reason: Some("stop".to_string()),
            usage: Some(TokenUsage::new(5, 7)),
            model: Some(model.to_string()),
        })
    }
}

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn app_state(dir: &Path, provider: Option<Arc<dyn LlmClient>>) -> Arc<AppState> {
    let state_file = dir.join("state.json");
    let evidence_file = dir.join("evidence.jsonl");
    let config = Config::new(None, state_file.clone(), Some(evidence_file.clone()));
    let dispatcher = Dispatcher::new(
        AgentRegistry::builtin(),
        provider,
        Some(Arc::new(EvidenceLog::new(evidence_file))),
        config.provider.default_model.clone(),
    );
    Arc::new(AppState {
        config,
        dispatcher,
        state_store: StateStore::new(state_file),
    })
}

async fn spawn_cockpit(dir: &Path, provider: Option<Arc<dyn LlmClient>>) -> String {
    spawn(router(app_state(dir, provider))).await
}

fn orchestration_client(url: &str) -> OrchestrationClient {
    OrchestrationClient::new(&OrchestrationConfig {
        url: url.to_string(),
        api_key: Some("test-key".to_string()),
    })
}

#[tokio::test]
async fn test_health_reports_provider_configuration() {
    let dir = TempDir::new().unwrap();
    let base = spawn_cockpit(dir.path(), None).await;

    let body: Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["provider_configured"], false);
}

#[tokio::test]
async fn test_invoke_without_key_is_degraded_but_ok() {
    let dir = TempDir::new().unwrap();
    let base = spawn_cockpit(dir.path(), None).await;

    let response = reqwest::Client::new()
        .post(format!("{}/invoke", base))
        .json(&json!({"question": "Status?", "agent": "finance", "command": null}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["answer"], NOT_CONFIGURED_MESSAGE);
    assert_eq!(body["meta"]["agent"], "finance");
    assert_eq!(body["meta"]["tokens"], 0);
}

#[tokio::test]
async fn test_invoke_unknown_agent_lists_known_ids() {
    let dir = TempDir::new().unwrap();
    let base = spawn_cockpit(dir.path(), Some(Arc::new(EchoProvider))).await;

    let body: Value = reqwest::Client::new()
        .post(format!("{}/invoke", base))
        .json(&json!({"question": "Hi", "agent": "bogus"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let answer = body["answer"].as_str().unwrap();
    assert!(answer.contains("bogus"));
    assert!(answer.contains("ghc_dt"));
    assert_eq!(body["meta"]["tokens"], 0);
}

#[tokio::test]
async fn test_invoke_malformed_body_is_rejected() {
    let dir = TempDir::new().unwrap();
    let base = spawn_cockpit(dir.path(), None).await;

    let response = reqwest::Client::new()
        .post(format!("{}/invoke", base))
        .header("content-type", "application/json")
        .body("{\"question\": ")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn test_orchestrator_answer_is_recorded_as_evidence() {
    let dir = TempDir::new().unwrap();
    let base = spawn_cockpit(dir.path(), Some(Arc::new(EchoProvider))).await;
    let client = reqwest::Client::new();

    let body: Value = client
        .post(format!("{}/invoke", base))
        .json(&json!({"question": "Where are we?", "agent": "auto", "command": "report"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["meta"]["agent"], "ghc_dt");
    assert_eq!(body["meta"]["tokens"], 12);
    assert!(body["answer"].as_str().unwrap().contains("Where are we?"));

    // Non-orchestrator answers stay out of the log.
    client
        .post(format!("{}/invoke", base))
        .json(&json!({"question": "Risks?", "agent": "risk"}))
        .send()
        .await
        .unwrap();

    let evidence: Vec<Value> = client
        .get(format!("{}/api/evidence?limit=5", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(evidence.len(), 1);
    assert_eq!(evidence[0]["agent"], "ghc_dt");
    assert_eq!(evidence[0]["question"], "Where are we?");
    assert_eq!(evidence[0]["command"], "report");
}

#[tokio::test]
async fn test_state_put_then_get() {
    let dir = TempDir::new().unwrap();
    let base = spawn_cockpit(dir.path(), None).await;
    let client = reqwest::Client::new();

    let initial: Value = client
        .get(format!("{}/api/state", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(initial["zec_rate"], 4.0);

    let response = client
        .put(format!("{}/api/state", base))
        .json(&json!({"phase": "Phase 2: Build-out", "zecRate": 4.5, "owner": "board"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let stored: DispatchState = client
        .get(format!("{}/api/state", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stored.phase.as_deref(), Some("Phase 2: Build-out"));
    assert_eq!(stored.zec_rate, Some(4.5));
    assert_eq!(stored.extra.get("owner"), Some(&json!("board")));
    assert!(dir.path().join("state.json").exists());
}

#[tokio::test]
async fn test_agents_listed_in_display_order() {
    let dir = TempDir::new().unwrap();
    let base = spawn_cockpit(dir.path(), None).await;

    let agents: Vec<Value> = reqwest::get(format!("{}/api/agents", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(agents.len(), 9);
    assert_eq!(agents[0]["id"], "ghc_dt");
    assert_eq!(agents[8]["id"], "code");

    let commands: Vec<Value> = reqwest::get(format!("{}/api/commands", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(commands.len(), 6);
}

#[tokio::test]
async fn test_client_answer_and_health() {
    let dir = TempDir::new().unwrap();
    let base = spawn_cockpit(dir.path(), Some(Arc::new(EchoProvider))).await;
    let client = orchestration_client(&base);

    assert!(client.health().await);

    let outcome = client
        .invoke("Cash runway?", Some("forecast"), "finance", &DispatchState::default())
        .await;
    match outcome {
        InvokeOutcome::Answer(response) => {
            assert_eq!(response.meta.agent, "finance");
            assert!(response.answer.starts_with("echo: Command: Generate forecasts"));
            assert!(response.answer.ends_with("Cash runway?"));
        }
        other => panic!("expected answer, got {:?}", other),
    }
}

#[tokio::test]
async fn test_client_forbidden_is_demo() {
    let app = Router::new().route("/invoke", post(|| async { StatusCode::FORBIDDEN }));
    let base = spawn(app).await;

    let outcome = orchestration_client(&base)
        .invoke("Plan?", None, "strategy", &DispatchState::default())
        .await;
    match outcome {
        InvokeOutcome::Demo { agent, answer } => {
            assert_eq!(agent, "strategy");
            assert!(answer.contains("Strategy Advisor"));
        }
        other => panic!("expected demo, got {:?}", other),
    }
}

#[tokio::test]
async fn test_client_server_error_and_error_body() {
    let app = Router::new()
        .route(
            "/invoke",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        )
        .route(
            "/health",
            axum::routing::get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
        );
    let base = spawn(app).await;
    let client = orchestration_client(&base);

    let outcome = client
        .invoke("Plan?", None, "strategy", &DispatchState::default())
        .await;
    match outcome {
        InvokeOutcome::Error { message } => assert!(message.contains("500")),
        other => panic!("expected error, got {:?}", other),
    }
    assert!(!client.health().await);

    let app = Router::new().route(
        "/invoke",
        post(|| async { Json(json!({"status": "error", "message": "graph failed"})) }),
    );
    let base = spawn(app).await;
    let outcome = orchestration_client(&base)
        .invoke("Plan?", None, "strategy", &DispatchState::default())
        .await;
    assert_eq!(
        outcome,
        InvokeOutcome::Error {
            message: "graph failed".to_string()
        }
    );
}

#[tokio::test]
async fn test_client_unreachable_endpoint() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = orchestration_client(&format!("http://{}", addr));
    assert!(!client.health().await);
    let outcome = client
        .invoke("Plan?", None, "auto", &DispatchState::default())
        .await;
    assert!(matches!(outcome, InvokeOutcome::Error { .. }));
}

/// Completion provider stand-in; each path prefix is one upstream behaviour.
fn provider_stub() -> Router {
    Router::new()
        .route(
            "/text/chat/completions",
            post(|| async { "upstream is having a bad day" }),
        )
        .route(
            "/bad-gateway/chat/completions",
            post(|| async { (StatusCode::BAD_GATEWAY, "x") }),
        )
        .route(
            "/no-choices/chat/completions",
            post(|| async { Json(json!({"choices": []})) }),
        )
        .route(
            "/null-content/chat/completions",
            post(|| async {
                Json(json!({
                    "choices": [{"message": {"role": "assistant", "content": null}}],
                    "usage": {"prompt_tokens": 2, "completion_tokens": 1, "total_tokens": 3}
                }))
            }),
        )
        .route(
            "/slow/chat/completions",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                Json(json!({"choices": [{"message": {"content": "too late"}}]}))
            }),
        )
        .route("/ok/models", get(|| async { Json(json!({"data": []})) }))
        .route("/denied/models", get(|| async { StatusCode::UNAUTHORIZED }))
}

fn openai_dispatcher(base_url: String) -> Dispatcher {
    let client = OpenAiClient::new("sk-test".to_string(), base_url, Duration::from_millis(500));
    Dispatcher::new(
        AgentRegistry::builtin(),
        Some(Arc::new(client)),
        None,
        "gpt-4o-mini",
    )
}

async fn ask_finance(dispatcher: &Dispatcher) -> DispatchResponse {
    dispatcher
        .dispatch(DispatchRequest::new("finance", "Cash runway?"))
        .await
}

#[tokio::test]
async fn test_provider_failures_become_error_answers() {
    let base = spawn(provider_stub()).await;

    let cases = [
        ("text", "Error: Parse error: Failed to parse response"),
        ("bad-gateway", "Error: Server error (HTTP 502): x"),
        ("no-choices", "Error: Parse error: No choices in response"),
        ("slow", "Error: Network error: Request timeout"),
    ];
    for (path, expected) in cases {
        let response = ask_finance(&openai_dispatcher(format!("{}/{}", base, path))).await;
        assert!(
            response.answer.starts_with(expected),
            "{}: {}",
            path,
            response.answer
        );
        assert_eq!(response.meta.tokens, 0, "{}", path);
        assert_eq!(response.meta.agent, "finance");
    }
}

#[tokio::test]
async fn test_provider_reply_without_text_is_empty_answer() {
    let base = spawn(provider_stub()).await;

    let response = ask_finance(&openai_dispatcher(format!("{}/null-content", base))).await;
    assert_eq!(response, DispatchResponse::new("", "finance", 3));
}

async fn diagnostics_for(dir: &Path, provider_base: String) -> Value {
    let state_file = dir.join("state.json");
    let config = Config::new(Some("sk-test".to_string()), state_file.clone(), None);
    let state = Arc::new(AppState {
        config,
        dispatcher: openai_dispatcher(provider_base),
        state_store: StateStore::new(state_file),
    });
    let base = spawn(router(state)).await;

    reqwest::get(format!("{}/api/diagnostics", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_diagnostics_probes_provider_models() {
    let dir = TempDir::new().unwrap();
    let provider = spawn(provider_stub()).await;

    let body = diagnostics_for(dir.path(), format!("{}/ok", provider)).await;
    assert_eq!(body["provider_configured"], true);
    assert_eq!(body["provider_reachable"], true);
    assert_eq!(body["api_key"], "********");
    assert!(!body.to_string().contains("sk-test"));

    let body = diagnostics_for(dir.path(), format!("{}/denied", provider)).await;
    assert_eq!(body["provider_reachable"], false);
}

#[tokio::test]
async fn test_state_save_failure_is_server_error() {
    let dir = TempDir::new().unwrap();
    // A directory where the state file should be makes the final rename fail.
    std::fs::create_dir(dir.path().join("state.json")).unwrap();
    let base = spawn_cockpit(dir.path(), None).await;

    let response = reqwest::Client::new()
        .put(format!("{}/api/state", base))
        .json(&json!({"phase": "Phase 2"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "error");
    assert!(body["message"].as_str().unwrap().starts_with("Failed to save state"));
}

#[tokio::test]
async fn test_evidence_limit_defaults_and_cap() {
    let dir = TempDir::new().unwrap();
    let lines: String = (0..250)
        .map(|i| {
            let entry = EvidenceEntry::new("ghc_dt", format!("q{}", i), "a", 1);
            format!("{}\n", serde_json::to_string(&entry).unwrap())
        })
        .collect();
    std::fs::write(dir.path().join("evidence.jsonl"), lines).unwrap();
    let base = spawn_cockpit(dir.path(), None).await;

    let default: Vec<Value> = reqwest::get(format!("{}/api/evidence", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(default.len(), 20);
    assert_eq!(default[0]["question"], "q249");

    let capped: Vec<Value> = reqwest::get(format!("{}/api/evidence?limit=100000", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(capped.len(), 200);
}
