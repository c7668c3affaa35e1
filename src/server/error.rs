// src/server/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

use crate::errors::DevServerError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Supervisor(#[from] DevServerError),
}

impl ApiError {
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Supervisor(e) => match e {
                DevServerError::SetupFailed { .. } => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "setup_failed")
                }
                DevServerError::LoadFailed { .. } => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "load_failed")
                }
                DevServerError::SpawnFailed { .. } => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "spawn_failed")
                }
                DevServerError::TerminationExhausted { .. } => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "termination_exhausted")
                }
                DevServerError::WorkerAlreadyRunning { .. } => {
                    (StatusCode::CONFLICT, "worker_already_running")
                }
                DevServerError::ConfigError(_) => (StatusCode::BAD_REQUEST, "config_error"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        error!(kind, error = %self, "request failed");

        let body = Json(json!({
            "status": "error",
            "kind": kind,
            "error": self.to_string(),
        }));
        (status, body).into_response()
    }
}
