//! Arena match types
//!
//! An arena match pits two chatbots against each other in a repeated game
//! (iterated prisoner's dilemma). Rounds and running totals are persisted as
//! they complete so the match viewer can poll mid-game.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Arena match lifecycle status
///
/// Mirrors the run lifecycle: `pending → running → completed | failed`.
/// A provider error at any round fails the whole match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Pending => "pending",
            MatchStatus::Running => "running",
            MatchStatus::Completed => "completed",
            MatchStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<MatchStatus> {
        match s {
            "pending" => Some(MatchStatus::Pending),
            "running" => Some(MatchStatus::Running),
            "completed" => Some(MatchStatus::Completed),
            "failed" => Some(MatchStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, MatchStatus::Completed | MatchStatus::Failed)
    }
}

/// A move in the iterated prisoner's dilemma
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArenaMove {
    Cooperate,
    Defect,
}

impl ArenaMove {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArenaMove::Cooperate => "cooperate",
            ArenaMove::Defect => "defect",
        }
    }

    pub fn parse(s: &str) -> Option<ArenaMove> {
        match s {
            "cooperate" => Some(ArenaMove::Cooperate),
            "defect" => Some(ArenaMove::Defect),
            _ => None,
        }
    }
}

/// One completed round of a match
///
/// `raw_a`/`raw_b` keep the verbatim model replies so the viewer can show
/// what a model actually said, including replies that failed to parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArenaRound {
    pub round: u32,
    pub move_a: ArenaMove,
    pub move_b: ArenaMove,
    pub score_a: u32,
    pub score_b: u32,
    pub raw_a: String,
    pub raw_b: String,
}

/// Two chatbots playing a repeated game
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArenaMatch {
    pub id: String,
    pub chatbot_a: String,
    pub chatbot_b: String,
    pub rounds_total: u32,
    pub status: MatchStatus,
    /// Running point totals, updated as rounds complete
    pub score_a: u32,
    pub score_b: u32,
    /// Provider error that failed the match, if any
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub rounds: Vec<ArenaRound>,
}
