//! Error types for promptgrid
//!
//! All errors implement `IntoResponse` for Axum handlers.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read config file '{path}': {source}")]
    ConfigFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ConfigParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] crate::store::StoreError),

    #[error("Provider {provider} request failed: {reason}")]
    ProviderQueryFailed { provider: String, reason: String },

    #[error("Provider {provider} timed out after {timeout_seconds} seconds")]
    ProviderTimeout {
        provider: String,
        timeout_seconds: u64,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            Self::ConfigFileRead { .. } | Self::ConfigParseFailed { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            Self::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            Self::ProviderQueryFailed { .. } => (StatusCode::BAD_GATEWAY, self.to_string()),
            Self::ProviderTimeout { .. } => (StatusCode::GATEWAY_TIMEOUT, self.to_string()),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

/// Convenience type alias for Results
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_creates() {
        let err = AppError::Config("test error".to_string());
        assert_eq!(err.to_string(), "Configuration error: test error");
    }

    #[test]
    fn test_validation_error_creates() {
        let err = AppError::Validation("invalid input".to_string());
        assert_eq!(err.to_string(), "Invalid request: invalid input");
    }

    #[test]
    fn test_provider_query_failed_error_creates() {
        let err = AppError::ProviderQueryFailed {
            provider: "anthropic".to_string(),
            reason: "connection refused".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Provider anthropic request failed: connection refused"
        );
    }

    #[test]
    fn test_provider_timeout_error_creates() {
        let err = AppError::ProviderTimeout {
            provider: "openai".to_string(),
            timeout_seconds: 30,
        };
        assert_eq!(err.to_string(), "Provider openai timed out after 30 seconds");
    }

    #[test]
    fn test_validation_error_response_status() {
        let err = AppError::Validation("test".to_string());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_not_found_error_response_status() {
        let err = AppError::NotFound("run abc".to_string());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_provider_query_failed_response_status() {
        let err = AppError::ProviderQueryFailed {
            provider: "google".to_string(),
            reason: "500 from upstream".to_string(),
        };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_provider_timeout_response_status() {
        let err = AppError::ProviderTimeout {
            provider: "xai".to_string(),
            timeout_seconds: 30,
        };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn test_internal_error_response_status() {
        let err = AppError::Internal("unexpected state".to_string());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
