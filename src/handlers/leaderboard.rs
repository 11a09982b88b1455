//! Leaderboard endpoints
//!
//! Explicit stored entries only: PUT writes whatever score the caller
//! provides, GET serves entries ordered by score. No aggregation happens
//! server-side.

use crate::error::{AppError, AppResult};
use crate::handlers::AppState;
use crate::middleware::RequestId;
use crate::models::LeaderboardEntry;
use crate::store::queries;
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::Deserialize;

/// PUT /api/leaderboard/{chatbot_id} payload
#[derive(Debug, Deserialize)]
pub struct UpsertEntryRequest {
    pub score: f64,
    #[serde(default)]
    pub wins: u32,
    #[serde(default)]
    pub losses: u32,
}

/// GET /api/leaderboard handler
pub async fn list(State(state): State<AppState>) -> AppResult<Json<Vec<LeaderboardEntry>>> {
    let entries = state.store().with_connection(queries::list_leaderboard)?;
    Ok(Json(entries))
}

/// PUT /api/leaderboard/{chatbot_id} handler
pub async fn upsert(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(chatbot_id): Path<String>,
    Json(request): Json<UpsertEntryRequest>,
) -> AppResult<Json<LeaderboardEntry>> {
    if state.config().chatbot(&chatbot_id).is_none() {
        return Err(AppError::Validation(format!(
            "unknown chatbot id '{chatbot_id}'"
        )));
    }
    if !request.score.is_finite() {
        return Err(AppError::Validation(format!(
            "score must be a finite number, got {}",
            request.score
        )));
    }

    let entry = LeaderboardEntry {
        chatbot_id,
        score: request.score,
        wins: request.wins,
        losses: request.losses,
        updated_at: Utc::now(),
    };

    state
        .store()
        .with_connection(|conn| queries::upsert_leaderboard_entry(conn, &entry))?;

    tracing::info!(
        request_id = %request_id,
        chatbot_id = %entry.chatbot_id,
        score = entry.score,
        "Leaderboard entry upserted"
    );

    Ok(Json(entry))
}

/// DELETE /api/leaderboard/{chatbot_id} handler
pub async fn remove(
    State(state): State<AppState>,
    Path(chatbot_id): Path<String>,
) -> AppResult<StatusCode> {
    let deleted = state
        .store()
        .with_connection(|conn| queries::delete_leaderboard_entry(conn, &chatbot_id))?;
    if !deleted {
        return Err(AppError::NotFound(format!(
            "leaderboard entry {chatbot_id}"
        )));
    }
    Ok(StatusCode::NO_CONTENT)
}
