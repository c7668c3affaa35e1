// src/server/mod.rs

//! HTTP control surface.
//!
//! | Route | Effect |
//! |---|---|
//! | `POST /` | refresh the worker |
//! | `GET /env` | current environment |
//! | `POST /env/append` | merge environment, then refresh |
//! | `GET /status` | generation and worker state |
//!
//! Handlers call straight into the shared [`Supervisor`]; refreshing
//! requests stay open until the replacement application is running.

pub mod error;
pub mod handlers;
pub mod routes;

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;

use crate::supervisor::Supervisor;

pub use error::ApiError;
pub use routes::{AppState, create_routes};

/// Serve the control API on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, supervisor: Arc<Supervisor>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr().context("reading listener address")?;
    info!(%addr, "control API listening");

    let app = create_routes(AppState { supervisor });
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("serving control API")?;

    info!("control API stopped");
    Ok(())
}
