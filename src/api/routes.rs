//! HTTP route handlers.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::agents::{DispatchRequest, DispatchResponse, Dispatcher, COMMANDS};
use crate::config::Config;
use crate::storage::{DispatchState, EvidenceEntry, StateStore};
use crate::util::mask_secret;

use super::types::*;

const DEFAULT_EVIDENCE_LIMIT: usize = 20;
const MAX_EVIDENCE_LIMIT: usize = 200;

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse::new(message)))
}

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub dispatcher: Dispatcher,
    pub state_store: StateStore,
}

impl AppState {
    pub fn from_config(config: Config) -> Self {
        let dispatcher = Dispatcher::from_config(&config);
        let state_store = StateStore::new(config.state_file.clone());
        Self {
            config,
            dispatcher,
            state_store,
        }
    }
}

/// Build the orchestration router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/health", get(health))
        .route("/invoke", post(invoke))
        .route("/api/agents", get(list_agents))
        .route("/api/commands", get(list_commands))
        .route("/api/state", get(get_state).put(put_state))
        .route("/api/evidence", get(list_evidence))
        .route("/api/diagnostics", get(diagnostics))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState::from_config(config));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

/// Health check endpoint.
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        provider_configured: state.dispatcher.provider_configured(),
    })
}

/// Orchestration endpoint: route one question to one agent.
///
/// Dispatch outcomes (including provider failures) are always 200; only a
/// body that cannot be parsed is rejected.
async fn invoke(
    State(state): State<Arc<AppState>>,
    body: Result<Json<InvokeRequest>, JsonRejection>,
) -> Result<Json<DispatchResponse>, ApiError> {
    let Json(req) = body.map_err(|rejection| {
        tracing::debug!("Rejected invoke body: {}", rejection);
        api_error(StatusCode::BAD_REQUEST, rejection.body_text())
    })?;

    let dispatch_state = match req.state {
        Some(s) => s,
        None => state.state_store.load().await,
    };

    let request = DispatchRequest::new(req.agent, req.question)
        .with_command(req.command)
        .with_state(dispatch_state);

    Ok(Json(state.dispatcher.dispatch(request).await))
}

async fn list_agents(State(state): State<Arc<AppState>>) -> Json<Vec<AgentSummary>> {
    Json(
        state
            .dispatcher
            .registry()
            .iter()
            .map(|agent| AgentSummary {
                id: agent.id.clone(),
                name: agent.display_name.clone(),
                temperature: agent.temperature,
            })
            .collect(),
    )
}

async fn list_commands() -> Json<Vec<CommandSummary>> {
    Json(
        COMMANDS
            .iter()
            .map(|c| CommandSummary {
                id: c.id.to_string(),
                description: c.description.to_string(),
            })
            .collect(),
    )
}

async fn get_state(State(state): State<Arc<AppState>>) -> Json<DispatchState> {
    Json(state.state_store.load().await)
}

async fn put_state(
    State(state): State<Arc<AppState>>,
    body: Result<Json<DispatchState>, JsonRejection>,
) -> Result<Json<DispatchState>, ApiError> {
    let Json(new_state) =
        body.map_err(|rejection| api_error(StatusCode::BAD_REQUEST, rejection.body_text()))?;

    state.state_store.save(&new_state).await.map_err(|e| {
        tracing::error!("Failed to save state: {}", e);
        api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to save state: {}", e),
        )
    })?;

    Ok(Json(new_state))
}

async fn list_evidence(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EvidenceQuery>,
) -> Result<Json<Vec<EvidenceEntry>>, ApiError> {
    let Some(log) = state.dispatcher.evidence_log() else {
        return Ok(Json(Vec::new()));
    };
    let limit = query
        .limit
        .unwrap_or(DEFAULT_EVIDENCE_LIMIT)
        .min(MAX_EVIDENCE_LIMIT);

    log.read_recent(limit).await.map(Json).map_err(|e| {
        tracing::error!("Failed to read evidence: {}", e);
        api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Could not read evidence file: {}", e),
        )
    })
}

async fn diagnostics(State(state): State<Arc<AppState>>) -> Json<DiagnosticsResponse> {
    let provider_reachable = state.dispatcher.probe_provider().await;
    Json(DiagnosticsResponse {
        provider_configured: state.dispatcher.provider_configured(),
        provider_reachable,
        api_key: mask_secret(state.config.provider.api_key.as_deref()).to_string(),
        model: state.config.provider.default_model.clone(),
        evidence_log: state
            .dispatcher
            .evidence_log()
            .map(|log| log.path().display().to_string()),
        state_file: state.state_store.path().display().to_string(),
    })
}
