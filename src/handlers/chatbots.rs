//! Chatbot catalog endpoint
//!
//! The catalog is static config; this endpoint simply serves it so the
//! client can render the selection grid.

use axum::{Json, extract::State};
use serde::Serialize;

use crate::handlers::AppState;
use crate::models::Chatbot;

/// Response for GET /api/chatbots
#[derive(Serialize)]
pub struct ChatbotsResponse {
    pub chatbots: Vec<Chatbot>,
}

/// GET /api/chatbots handler
pub async fn list(State(state): State<AppState>) -> Json<ChatbotsResponse> {
    Json(ChatbotsResponse {
        chatbots: state.config().chatbots.clone(),
    })
}
