use std::collections::HashMap;
use std::sync::Arc;

use shuttle_axum::axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::config::{AppConfig, ConfigStore, ConfigUpdate};
use crate::history::{PipelineStats, RunHistory, RunRecord};
use crate::lead::{Lead, OutreachEmail};
use crate::pipeline::{self, RunSummary};

const DEFAULT_HISTORY_LIMIT: usize = 20;

#[derive(Clone)]
pub struct AppState {
    pub config: ConfigStore,
    pub history: Arc<RunHistory>,
}

impl AppState {
    /// Build state from the process environment and the optional config file.
    pub fn from_env() -> Self {
        Self {
            config: ConfigStore::new(AppConfig::load()),
            history: Arc::new(RunHistory::new()),
        }
    }

    pub fn with_config(cfg: AppConfig) -> Self {
        Self {
            config: ConfigStore::new(cfg),
            history: Arc::new(RunHistory::new()),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/api/run", get(run_once))
        .route("/api/history", get(history_list))
        .route("/api/stats", get(stats))
        .route("/api/config", get(config_get).post(config_update))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(serde::Serialize)]
struct RunResp {
    success: bool,
    summary: RunSummary,
    leads: Vec<Lead>,
    emails: Vec<OutreachEmail>,
}

#[derive(serde::Serialize)]
struct RunErrorResp {
    success: bool,
    error: String,
}

async fn run_once(State(state): State<AppState>) -> Response {
    let cfg = state.config.snapshot();
    match pipeline::run_with_config(&cfg, &state.history).await {
        Ok(out) => Json(RunResp {
            success: true,
            summary: out.summary,
            leads: out.leads,
            emails: out.emails,
        })
        .into_response(),
        Err(e) => {
            tracing::error!(error = ?e, "pipeline run failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(RunErrorResp {
                    success: false,
                    error: format!("{e:#}"),
                }),
            )
                .into_response()
        }
    }
}

async fn history_list(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> Json<Vec<RunRecord>> {
    let limit = q
        .get("limit")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(DEFAULT_HISTORY_LIMIT);
    Json(state.history.snapshot(limit))
}

async fn stats(State(state): State<AppState>) -> Json<PipelineStats> {
    Json(state.history.stats())
}

async fn config_get(State(state): State<AppState>) -> Json<AppConfig> {
    Json(state.config.snapshot())
}

async fn config_update(
    State(state): State<AppState>,
    Json(update): Json<ConfigUpdate>,
) -> Json<AppConfig> {
    Json(state.config.apply(update))
}
