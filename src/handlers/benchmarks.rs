//! Benchmark proposal endpoints
//!
//! CRUD over proposals plus a status transition endpoint. Scoring a proposal
//! against model output is a client concern; the service only stores rows.

use crate::error::{AppError, AppResult};
use crate::handlers::AppState;
use crate::middleware::RequestId;
use crate::models::{BenchmarkProposal, ProposalStatus};
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

/// Create-proposal payload
///
/// Validation is enforced during deserialization - invalid instances cannot exist.
#[derive(Debug, Clone, Serialize)]
pub struct CreateProposalRequest {
    title: String,
    #[serde(default)]
    description: String,
    category: String,
}

impl CreateProposalRequest {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn category(&self) -> &str {
        &self.category
    }
}

impl<'de> Deserialize<'de> for CreateProposalRequest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct RawCreateProposalRequest {
            title: String,
            #[serde(default)]
            description: String,
            category: String,
        }

        let raw = RawCreateProposalRequest::deserialize(deserializer)?;

        if raw.title.trim().is_empty() {
            return Err(serde::de::Error::custom("title cannot be empty"));
        }
        if raw.category.trim().is_empty() {
            return Err(serde::de::Error::custom("category cannot be empty"));
        }

        Ok(CreateProposalRequest {
            title: raw.title,
            description: raw.description,
            category: raw.category,
        })
    }
}

/// PUT /api/benchmarks/proposals/{id}/status payload
#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: ProposalStatus,
}

/// Response for the status transition endpoint
#[derive(Debug, Serialize)]
pub struct SetStatusResponse {
    pub id: String,
    pub status: ProposalStatus,
}

/// GET /api/benchmarks/proposals handler
pub async fn list(State(state): State<AppState>) -> AppResult<Json<Vec<BenchmarkProposal>>> {
    let proposals = state.store().with_connection(queries::list_proposals)?;
    Ok(Json(proposals))
}

/// POST /api/benchmarks/proposals handler
pub async fn create(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<CreateProposalRequest>,
) -> AppResult<impl IntoResponse> {
    let proposal = BenchmarkProposal {
        id: Uuid::new_v4().to_string(),
        title: request.title().to_string(),
        description: request.description().to_string(),
        category: request.category().to_string(),
        status: ProposalStatus::Open,
        created_at: Utc::now(),
    };

    state
        .store()
        .with_connection(|conn| queries::insert_proposal(conn, &proposal))?;

    tracing::info!(
        request_id = %request_id,
        proposal_id = %proposal.id,
        category = %proposal.category,
        "Benchmark proposal created"
    );

    Ok((StatusCode::CREATED, Json(proposal)))
}

/// PUT /api/benchmarks/proposals/{id}/status handler
pub async fn set_status(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<String>,
    Json(request): Json<SetStatusRequest>,
) -> AppResult<Json<SetStatusResponse>> {
    let updated = state
        .store()
        .with_connection(|conn| queries::set_proposal_status(conn, &id, request.status))?;
    if !updated {
        return Err(AppError::NotFound(format!("benchmark proposal {id}")));
    }

    tracing::info!(
        request_id = %request_id,
        proposal_id = %id,
        status = request.status.as_str(),
        "Benchmark proposal status updated"
    );

    Ok(Json(SetStatusResponse {
        id,
        status: request.status,
    }))
}

/// DELETE /api/benchmarks/proposals/{id} handler
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let deleted = state
        .store()
        .with_connection(|conn| queries::delete_proposal(conn, &id))?;
    if !deleted {
        return Err(AppError::NotFound(format!("benchmark proposal {id}")));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_proposal_request_deserializes() {
        let json = r#"{"title": "Long-context recall", "category": "reasoning"}"#;
        let request: CreateProposalRequest =
            serde_json::from_str(json).expect("should deserialize");

        assert_eq!(request.title(), "Long-context recall");
        assert_eq!(request.description(), "");
    }

    #[test]
    fn test_create_proposal_request_rejects_blank_title() {
        let json = r#"{"title": "  ", "category": "reasoning"}"#;
        let result = serde_json::from_str::<CreateProposalRequest>(json);

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("title"));
    }

    #[test]
    fn test_set_status_request_rejects_unknown_status() {
        let json = r#"{"status": "merged"}"#;
        let result = serde_json::from_str::<SetStatusRequest>(json);

        assert!(result.is_err());
    }
}
