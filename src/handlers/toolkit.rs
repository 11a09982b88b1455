//! Toolkit catalog endpoints

use crate::error::{AppError, AppResult};
use crate::handlers::AppState;
use crate::middleware::RequestId;
use crate::models::ToolkitEntry;
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

/// Create-entry payload
///
/// Validation is enforced during deserialization - invalid instances cannot exist.
#[derive(Debug, Clone, Serialize)]
pub struct CreateToolkitRequest {
    name: String,
    category: String,
    url: String,
    #[serde(default)]
    description: String,
}

impl CreateToolkitRequest {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl<'de> Deserialize<'de> for CreateToolkitRequest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct RawCreateToolkitRequest {
            name: String,
            category: String,
            url: String,
            #[serde(default)]
            description: String,
        }

        let raw = RawCreateToolkitRequest::deserialize(deserializer)?;

        for (field, value) in [
            ("name", &raw.name),
            ("category", &raw.category),
            ("url", &raw.url),
        ] {
            if value.trim().is_empty() {
                return Err(serde::de::Error::custom(format!(
                    "{field} cannot be empty"
                )));
            }
        }
        if !raw.url.starts_with("http://") && !raw.url.starts_with("https://") {
            return Err(serde::de::Error::custom(
                "url must start with 'http://' or 'https://'",
            ));
        }

        Ok(CreateToolkitRequest {
            name: raw.name,
            category: raw.category,
            url: raw.url,
            description: raw.description,
        })
    }
}

/// GET /api/toolkit handler
pub async fn list(State(state): State<AppState>) -> AppResult<Json<Vec<ToolkitEntry>>> {
    let entries = state
        .store()
        .with_connection(queries::list_toolkit_entries)?;
    Ok(Json(entries))
}

/// POST /api/toolkit handler
pub async fn create(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<CreateToolkitRequest>,
) -> AppResult<impl IntoResponse> {
    let entry = ToolkitEntry {
        id: Uuid::new_v4().to_string(),
        name: request.name().to_string(),
        category: request.category().to_string(),
        url: request.url().to_string(),
        description: request.description().to_string(),
        created_at: Utc::now(),
    };

    state
        .store()
        .with_connection(|conn| queries::insert_toolkit_entry(conn, &entry))?;

    tracing::info!(
        request_id = %request_id,
        entry_id = %entry.id,
        category = %entry.category,
        "Toolkit entry created"
    );

    Ok((StatusCode::CREATED, Json(entry)))
}

/// DELETE /api/toolkit/{id} handler
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let deleted = state
        .store()
        .with_connection(|conn| queries::delete_toolkit_entry(conn, &id))?;
    if !deleted {
        return Err(AppError::NotFound(format!("toolkit entry {id}")));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_toolkit_request_deserializes() {
        let json = r#"{"name": "tokenizer playground", "category": "debugging", "url": "https://example.com/tok"}"#;
        let request: CreateToolkitRequest = serde_json::from_str(json).expect("should deserialize");

        assert_eq!(request.name(), "tokenizer playground");
        assert_eq!(request.description(), "");
    }

    #[test]
    fn test_create_toolkit_request_rejects_blank_fields() {
        let json = r#"{"name": "", "category": "debugging", "url": "https://example.com"}"#;
        let result = serde_json::from_str::<CreateToolkitRequest>(json);

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("name"));
    }

    #[test]
    fn test_create_toolkit_request_rejects_non_http_url() {
        let json = r#"{"name": "x", "category": "y", "url": "ftp://example.com"}"#;
        let result = serde_json::from_str::<CreateToolkitRequest>(json);

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("http"));
    }
}
