//! Session endpoints
//!
//! CRUD for saved prompt sequences under /api/sessions.

use crate::error::{AppError, AppResult};
use crate::handlers::AppState;
use crate::middleware::RequestId;
use crate::models::Session;
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

/// Maximum number of prompt steps per session
const MAX_PROMPT_STEPS: usize = 50;

/// Maximum allowed prompt step length in characters
const MAX_PROMPT_LENGTH: usize = 100_000;

/// Maximum session name length in characters
const MAX_NAME_LENGTH: usize = 200;

/// Create/update session payload
///
/// Validation is enforced during deserialization - invalid instances cannot exist.
#[derive(Debug, Clone, Serialize)]
pub struct SessionPayload {
    name: String,
    prompts: Vec<String>,
}

impl SessionPayload {
    /// Get the session name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the ordered prompt steps
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }
}

/// Custom Deserialize implementation that validates during deserialization
impl<'de> Deserialize<'de> for SessionPayload {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct RawSessionPayload {
            name: String,
            prompts: Vec<String>,
        }

        let raw = RawSessionPayload::deserialize(deserializer)?;

        if raw.name.trim().is_empty() {
            return Err(serde::de::Error::custom(
                "name cannot be empty or contain only whitespace",
            ));
        }
        if raw.name.chars().count() > MAX_NAME_LENGTH {
            return Err(serde::de::Error::custom(format!(
                "name exceeds maximum length of {} characters",
                MAX_NAME_LENGTH
            )));
        }

        if raw.prompts.is_empty() {
            return Err(serde::de::Error::custom(
                "prompts must contain at least one step",
            ));
        }
        if raw.prompts.len() > MAX_PROMPT_STEPS {
            return Err(serde::de::Error::custom(format!(
                "prompts exceeds maximum of {} steps (got {})",
                MAX_PROMPT_STEPS,
                raw.prompts.len()
            )));
        }
        for (index, prompt) in raw.prompts.iter().enumerate() {
            if prompt.trim().is_empty() {
                return Err(serde::de::Error::custom(format!(
                    "prompt step {} cannot be empty or contain only whitespace",
                    index
                )));
            }
            // Count Unicode characters, not bytes
            let char_count = prompt.chars().count();
            if char_count > MAX_PROMPT_LENGTH {
                return Err(serde::de::Error::custom(format!(
                    "prompt step {} exceeds maximum length of {} characters (got {})",
                    index, MAX_PROMPT_LENGTH, char_count
                )));
            }
        }

        Ok(SessionPayload {
            name: raw.name,
            prompts: raw.prompts,
        })
    }
}

/// POST /api/sessions handler
pub async fn create(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(payload): Json<SessionPayload>,
) -> AppResult<impl IntoResponse> {
    let session = Session {
        id: Uuid::new_v4().to_string(),
        name: payload.name().to_string(),
        prompts: payload.prompts().to_vec(),
        created_at: Utc::now(),
    };

    state
        .store()
        .with_connection(|conn| queries::insert_session(conn, &session))?;

    tracing::info!(
        request_id = %request_id,
        session_id = %session.id,
        step_count = session.prompts.len(),
        "Session created"
    );

    Ok((StatusCode::CREATED, Json(session)))
}

/// GET /api/sessions handler
pub async fn list(State(state): State<AppState>) -> AppResult<Json<Vec<Session>>> {
    let sessions = state.store().with_connection(queries::list_sessions)?;
    Ok(Json(sessions))
}

/// GET /api/sessions/{id} handler
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Session>> {
    let session = state
        .store()
        .with_connection(|conn| queries::get_session(conn, &id))?
        .ok_or_else(|| AppError::NotFound(format!("session {id}")))?;
    Ok(Json(session))
}

/// PUT /api/sessions/{id} handler
pub async fn update(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<String>,
    Json(payload): Json<SessionPayload>,
) -> AppResult<Json<Session>> {
    let updated = state.store().with_connection(|conn| {
        queries::update_session(conn, &id, payload.name(), payload.prompts())
    })?;
    if !updated {
        return Err(AppError::NotFound(format!("session {id}")));
    }

    tracing::info!(request_id = %request_id, session_id = %id, "Session updated");

    let session = state
        .store()
        .with_connection(|conn| queries::get_session(conn, &id))?
        .ok_or_else(|| AppError::NotFound(format!("session {id}")))?;
    Ok(Json(session))
}

/// DELETE /api/sessions/{id} handler
///
/// Cascades: runs for the session and their responses go with it.
pub async fn remove(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let deleted = state
        .store()
        .with_connection(|conn| queries::delete_session(conn, &id))?;
    if !deleted {
        return Err(AppError::NotFound(format!("session {id}")));
    }

    tracing::info!(request_id = %request_id, session_id = %id, "Session deleted");
    Ok(StatusCode::NO_CONTENT)
}
