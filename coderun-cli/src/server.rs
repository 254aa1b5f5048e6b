//! HTTP front end
//!
//! `POST /code/execute` runs a snippet and returns the [`ExecutionResult`]
//! JSON; `GET /health` reports liveness. Authentication happens upstream, the
//! caller identity arrives in the `x-user-id` header.

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use coderun_sandbox::{Dispatcher, ErrorKind, ExecutionRequest, ExecutionResult, ANONYMOUS};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

pub const USER_HEADER: &str = "x-user-id";

/// Body of `POST /code/execute`; absent fields become empty strings
#[derive(Debug, Default, Deserialize)]
struct ExecuteBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    language: String,
}

/// Create the HTTP router
pub fn create_router(dispatcher: Dispatcher) -> Router {
    Router::new()
        .route("/code/execute", post(handle_execute))
        .route("/health", get(handle_health))
        .with_state(dispatcher)
}

/// Serve until the listener fails
pub async fn start_server(listener: tokio::net::TcpListener, dispatcher: Dispatcher) -> Result<()> {
    let app = create_router(dispatcher);

    let bind_addr = listener
        .local_addr()
        .context("Failed to obtain HTTP server bind address")?;
    info!("Starting HTTP server on {}", bind_addr);

    axum::serve(listener, app)
        .await
        .context("HTTP server error")?;

    Ok(())
}

async fn handle_execute(
    State(dispatcher): State<Dispatcher>,
    headers: HeaderMap,
    Json(body): Json<ExecuteBody>,
) -> (StatusCode, Json<ExecutionResult>) {
    let identity = headers
        .get(USER_HEADER)
        .and_then(|h| h.to_str().ok())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(ANONYMOUS);
    debug!(identity, language = %body.language, "Execute request");

    let request = ExecutionRequest::new(body.code, body.language).with_identity(identity);
    let result = dispatcher.execute(request).await;
    (status_for(&result), Json(result))
}

async fn handle_health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

fn status_for(result: &ExecutionResult) -> StatusCode {
    match result.error_kind {
        None => StatusCode::OK,
        Some(ErrorKind::InvalidRequest) => StatusCode::BAD_REQUEST,
        Some(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
