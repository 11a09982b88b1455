//! Health check endpoint
//!
//! Provides a simple health check for monitoring and load balancers.

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

use crate::handlers::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: &'static str,
    /// Number of catalog chatbots
    pub chatbots: usize,
    /// Number of configured provider backends
    pub providers: usize,
}

/// Health check handler
///
/// Returns 200 OK with the catalog and backend counts, so a monitor can tell
/// a fresh deploy with an empty provider registry from a healthy one.
pub async fn handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "OK",
            chatbots: state.config().chatbots.len(),
            providers: state.registry().len(),
        }),
    )
}
