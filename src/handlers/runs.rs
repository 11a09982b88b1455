//! Run endpoints
//!
//! POST starts a run and returns immediately; GET is the polling surface
//! clients watch until the run reaches a terminal status.

use crate::error::{AppError, AppResult};
use crate::handlers::AppState;
use crate::middleware::RequestId;
use crate::models::{Run, RunStatus};
use crate::store::queries;
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Maximum number of chatbots selected for one run
const MAX_SELECTED_CHATBOTS: usize = 16;

/// Create-run request
///
/// Structural validation happens during deserialization; the chatbot ids are
/// checked against the catalog in the handler, where the config is available.
#[derive(Debug, Clone, Serialize)]
pub struct CreateRunRequest {
    session_id: String,
    chatbot_ids: Vec<String>,
}

impl CreateRunRequest {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn chatbot_ids(&self) -> &[String] {
        &self.chatbot_ids
    }
}

impl<'de> Deserialize<'de> for CreateRunRequest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct RawCreateRunRequest {
            session_id: String,
            chatbot_ids: Vec<String>,
        }

        let raw = RawCreateRunRequest::deserialize(deserializer)?;

        if raw.session_id.trim().is_empty() {
            return Err(serde::de::Error::custom("session_id cannot be empty"));
        }
        if raw.chatbot_ids.is_empty() {
            return Err(serde::de::Error::custom(
                "chatbot_ids must select at least one chatbot",
            ));
        }
        if raw.chatbot_ids.len() > MAX_SELECTED_CHATBOTS {
            return Err(serde::de::Error::custom(format!(
                "chatbot_ids exceeds maximum of {} selections (got {})",
                MAX_SELECTED_CHATBOTS,
                raw.chatbot_ids.len()
            )));
        }
        let mut seen = std::collections::HashSet::new();
        for id in &raw.chatbot_ids {
            if id.trim().is_empty() {
                return Err(serde::de::Error::custom("chatbot id cannot be empty"));
            }
            if !seen.insert(id.as_str()) {
                return Err(serde::de::Error::custom(format!(
                    "duplicate chatbot id '{}' in selection",
                    id
                )));
            }
        }

        Ok(CreateRunRequest {
            session_id: raw.session_id,
            chatbot_ids: raw.chatbot_ids,
        })
    }
}

/// Query parameters for GET /api/runs
#[derive(Debug, Deserialize)]
pub struct ListRunsQuery {
    pub session_id: Option<String>,
}

/// POST /api/runs handler
///
/// Validates the session and the selected chatbot ids, records the run as
/// pending, and hands it to the dispatcher. Returns 202 - the caller polls
/// GET /api/runs/{id} for progress.
pub async fn create(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<CreateRunRequest>,
) -> AppResult<impl IntoResponse> {
    let session = state
        .store()
        .with_connection(|conn| queries::get_session(conn, request.session_id()))?
        .ok_or_else(|| AppError::NotFound(format!("session {}", request.session_id())))?;

    for chatbot_id in request.chatbot_ids() {
        if state.config().chatbot(chatbot_id).is_none() {
            return Err(AppError::Validation(format!(
                "unknown chatbot id '{chatbot_id}'"
            )));
        }
    }

    let run = Run {
        id: Uuid::new_v4().to_string(),
        session_id: session.id.clone(),
        chatbot_ids: request.chatbot_ids().to_vec(),
        status: RunStatus::Pending,
        created_at: Utc::now(),
        completed_at: None,
        responses: Vec::new(),
    };

    state
        .store()
        .with_connection(|conn| queries::insert_run(conn, &run))?;

    tracing::info!(
        request_id = %request_id,
        run_id = %run.id,
        session_id = %session.id,
        chatbot_count = run.chatbot_ids.len(),
        "Run created, dispatching"
    );

    state.dispatcher().spawn_run(run.clone(), session);

    Ok((StatusCode::ACCEPTED, Json(run)))
}

/// GET /api/runs handler
///
/// Listing omits response bodies; poll a single run for the full record.
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListRunsQuery>,
) -> AppResult<Json<Vec<Run>>> {
    let runs = state
        .store()
        .with_connection(|conn| queries::list_runs(conn, query.session_id.as_deref()))?;
    Ok(Json(runs))
}

/// GET /api/runs/{id} handler (the polling surface)
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Json<Run>> {
    let run = state
        .store()
        .with_connection(|conn| queries::get_run(conn, &id))?
        .ok_or_else(|| AppError::NotFound(format!("run {id}")))?;
    Ok(Json(run))
}

/// DELETE /api/runs/{id} handler
///
/// No cancellation: in-flight provider calls finish on their own and their
/// late writes fail against the deleted row.
pub async fn remove(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let deleted = state
        .store()
        .with_connection(|conn| queries::delete_run(conn, &id))?;
    if !deleted {
        return Err(AppError::NotFound(format!("run {id}")));
    }

    tracing::info!(request_id = %request_id, run_id = %id, "Run deleted");
    Ok(StatusCode::NO_CONTENT)
}
