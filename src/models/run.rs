//! Runs and their collected responses
//!
//! A run is one execution of a session's prompt sequence against a set of
//! selected chatbots. Responses accumulate as provider calls finish; the run
//! reaches a terminal status once every conversation has ended.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Run lifecycle status
///
/// `pending → running → completed | failed`. A run fails only when every
/// provider call errored; partial failures complete with the error strings
/// recorded on the affected rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    /// Stable lowercase label, used for storage and metrics labels
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }

    /// Parse a stored status label
    pub fn parse(s: &str) -> Option<RunStatus> {
        match s {
            "pending" => Some(RunStatus::Pending),
            "running" => Some(RunStatus::Running),
            "completed" => Some(RunStatus::Completed),
            "failed" => Some(RunStatus::Failed),
            _ => None,
        }
    }

    /// Whether polling clients can stop
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }
}

/// One provider call's outcome within a run
///
/// Exactly one of `content` / `error` is set. `step_order` indexes into the
/// session's prompt list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatbotResponse {
    pub chatbot_id: String,
    pub step_order: u32,
    pub content: Option<String>,
    pub error: Option<String>,
    pub latency_ms: u64,
    pub created_at: DateTime<Utc>,
}

impl ChatbotResponse {
    /// Whether this call produced content (as opposed to a recorded error)
    pub fn is_ok(&self) -> bool {
        self.content.is_some()
    }
}

/// One execution of a prompt sequence against selected chatbots
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: String,
    pub session_id: String,
    pub chatbot_ids: Vec<String>,
    pub status: RunStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Append-only; ordered by arrival, not by chatbot or step
    #[serde(default)]
    pub responses: Vec<ChatbotResponse>,
}
