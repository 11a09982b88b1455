//! Metrics endpoint
//!
//! Exposes the Prometheus registry in text exposition format.

use axum::{extract::State, http::header, response::IntoResponse};

use crate::error::{AppError, AppResult};
use crate::handlers::AppState;

/// GET /metrics handler
pub async fn handler(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let body = state
        .metrics()
        .gather()
        .map_err(|e| AppError::Internal(format!("Failed to gather metrics: {e}")))?;

    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    ))
}
