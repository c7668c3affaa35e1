// src/server/handlers.rs

use axum::{Json, body::Bytes, extract::State};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::supervisor::SupervisorStatus;
use crate::types::{Environment, RefreshOptions};

use super::error::ApiError;
use super::routes::AppState;

/// Body of `POST /`. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RefreshRequest {
    pub refresh_options: RefreshOptions,
}

/// Body of `POST /env/append`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppendEnvRequest {
    pub env: Environment,
    pub refresh_options: RefreshOptions,
}

/// `POST /` - restart the application.
///
/// The body is optional and parsed leniently: a missing or malformed body
/// means default refresh options. Responds only after the old process is
/// gone and the new one is running.
pub async fn refresh(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let request = parse_refresh_request(&body);
    info!(skip_setup = request.refresh_options.skip_setup, "refresh requested");

    state.supervisor.refresh(request.refresh_options).await?;
    Ok(Json(json!({ "status": "ok" })))
}

pub fn parse_refresh_request(body: &[u8]) -> RefreshRequest {
    if body.iter().all(u8::is_ascii_whitespace) {
        return RefreshRequest::default();
    }
    serde_json::from_slice(body).unwrap_or_else(|e| {
        debug!(error = %e, "ignoring unparseable refresh body");
        RefreshRequest::default()
    })
}

/// `GET /env`
pub async fn get_env(State(state): State<AppState>) -> Json<Environment> {
    Json(state.supervisor.environment())
}

/// `POST /env/append` - merge variables and restart with them.
pub async fn append_env(
    State(state): State<AppState>,
    Json(request): Json<AppendEnvRequest>,
) -> Result<Json<Environment>, ApiError> {
    info!(
        keys = request.env.len(),
        skip_setup = request.refresh_options.skip_setup,
        "environment append requested"
    );
    let env = state
        .supervisor
        .append_environment(request.env, request.refresh_options)
        .await?;
    Ok(Json(env))
}

/// `GET /status`
pub async fn status(State(state): State<AppState>) -> Json<SupervisorStatus> {
    Json(state.supervisor.status())
}
