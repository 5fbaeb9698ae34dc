// src/api.rs
//! HTTP triggers for an external scheduler: run discovery or a poll on demand.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

use crate::app::App;
use crate::error::PipelineError;

#[derive(Clone)]
pub struct ApiState {
    app: App,
    /// Discovery and polls are not meant to overlap; one run at a time.
    run_lock: Arc<Mutex<()>>,
}

impl ApiState {
    pub fn new(app: App) -> Self {
        Self {
            app,
            run_lock: Arc::new(Mutex::new(())),
        }
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/run/discover", post(run_discover))
        .route("/run/poll", post(run_poll))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn pipeline_error(e: PipelineError) -> Response {
    let status = match e {
        PipelineError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        PipelineError::State(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    tracing::error!(error = %e, "triggered run failed");
    (status, Json(json!({"error": e.to_string()}))).into_response()
}

async fn run_discover(State(state): State<ApiState>) -> Response {
    let _guard = state.run_lock.lock().await;
    match state.app.discover().await {
        Ok(report) => Json(report).into_response(),
        Err(e) => pipeline_error(e),
    }
}

async fn run_poll(State(state): State<ApiState>) -> Response {
    let _guard = state.run_lock.lock().await;
    match state.app.poll().await {
        Ok(report) => Json(report).into_response(),
        Err(e) => pipeline_error(e),
    }
}
