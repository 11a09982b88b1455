//! Saved prompt sessions
//!
//! A session is an ordered sequence of prompt steps - the script a run plays
//! against each selected chatbot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A saved, ordered sequence of prompt steps
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub name: String,
    /// Prompt steps in send order; step_order on responses indexes into this
    pub prompts: Vec<String>,
    pub created_at: DateTime<Utc>,
}
