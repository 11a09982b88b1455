//! Arena match endpoints
//!
//! POST starts a match and returns immediately; GET is the viewer's polling
//! surface, returning the rounds recorded so far.

use crate::arena::MAX_ROUNDS;
use crate::error::{AppError, AppResult};
use crate::handlers::AppState;
use crate::middleware::RequestId;
use crate::models::{ArenaMatch, MatchStatus};
use crate::store::queries;
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Create-match request
///
/// Validation is enforced during deserialization - invalid instances cannot exist.
#[derive(Debug, Clone, Serialize)]
pub struct CreateMatchRequest {
    chatbot_a: String,
    chatbot_b: String,
    rounds: u32,
}

impl CreateMatchRequest {
    pub fn chatbot_a(&self) -> &str {
        &self.chatbot_a
    }

    pub fn chatbot_b(&self) -> &str {
        &self.chatbot_b
    }

    pub fn rounds(&self) -> u32 {
        self.rounds
    }
}

impl<'de> Deserialize<'de> for CreateMatchRequest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct RawCreateMatchRequest {
            chatbot_a: String,
            chatbot_b: String,
            rounds: u32,
        }

        let raw = RawCreateMatchRequest::deserialize(deserializer)?;

        if raw.chatbot_a.trim().is_empty() || raw.chatbot_b.trim().is_empty() {
            return Err(serde::de::Error::custom("chatbot ids cannot be empty"));
        }
        if raw.chatbot_a == raw.chatbot_b {
            return Err(serde::de::Error::custom(
                "a match requires two different chatbots",
            ));
        }
        if raw.rounds == 0 || raw.rounds > MAX_ROUNDS {
            return Err(serde::de::Error::custom(format!(
                "rounds must be between 1 and {} (got {})",
                MAX_ROUNDS, raw.rounds
            )));
        }

        Ok(CreateMatchRequest {
            chatbot_a: raw.chatbot_a,
            chatbot_b: raw.chatbot_b,
            rounds: raw.rounds,
        })
    }
}

/// POST /api/arena/matches handler
pub async fn create(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<CreateMatchRequest>,
) -> AppResult<impl IntoResponse> {
    for chatbot_id in [request.chatbot_a(), request.chatbot_b()] {
        if state.config().chatbot(chatbot_id).is_none() {
            return Err(AppError::Validation(format!(
                "unknown chatbot id '{chatbot_id}'"
            )));
        }
    }

    let arena_match = ArenaMatch {
        id: Uuid::new_v4().to_string(),
        chatbot_a: request.chatbot_a().to_string(),
        chatbot_b: request.chatbot_b().to_string(),
        rounds_total: request.rounds(),
        status: MatchStatus::Pending,
        score_a: 0,
        score_b: 0,
        error: None,
        created_at: Utc::now(),
        completed_at: None,
        rounds: Vec::new(),
    };

    state
        .store()
        .with_connection(|conn| queries::insert_match(conn, &arena_match))?;

    tracing::info!(
        request_id = %request_id,
        match_id = %arena_match.id,
        chatbot_a = %arena_match.chatbot_a,
        chatbot_b = %arena_match.chatbot_b,
        rounds_total = arena_match.rounds_total,
        "Arena match created, starting"
    );

    state.arena().spawn_match(arena_match.clone());

    Ok((StatusCode::ACCEPTED, Json(arena_match)))
}

/// GET /api/arena/matches handler
///
/// Listing omits rounds; poll a single match for the full record.
pub async fn list(State(state): State<AppState>) -> AppResult<Json<Vec<ArenaMatch>>> {
    let matches = state.store().with_connection(queries::list_matches)?;
    Ok(Json(matches))
}

/// GET /api/arena/matches/{id} handler (the viewer's polling surface)
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ArenaMatch>> {
    let arena_match = state
        .store()
        .with_connection(|conn| queries::get_match(conn, &id))?
        .ok_or_else(|| AppError::NotFound(format!("arena match {id}")))?;
    Ok(Json(arena_match))
}

/// DELETE /api/arena/matches/{id} handler
pub async fn remove(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let deleted = state
        .store()
        .with_connection(|conn| queries::delete_match(conn, &id))?;
    if !deleted {
        return Err(AppError::NotFound(format!("arena match {id}")));
    }

    tracing::info!(request_id = %request_id, match_id = %id, "Arena match deleted");
    Ok(StatusCode::NO_CONTENT)
}
