// src/server/routes.rs

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::supervisor::Supervisor;

use super::handlers::{append_env, get_env, refresh, status};

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub supervisor: Arc<Supervisor>,
}

pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/", post(refresh))
        .route("/env", get(get_env))
        .route("/env/append", post(append_env))
        .route("/status", get(status))
        .with_state(state)
}
