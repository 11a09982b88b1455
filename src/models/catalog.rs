//! Flat catalog rows: leaderboard entries, toolkit entries, benchmark proposals
//!
//! These are plain stored records with no derived state. Leaderboard scores
//! are whatever the caller put there; the service does no aggregation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One leaderboard row, keyed by chatbot id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub chatbot_id: String,
    pub score: f64,
    pub wins: u32,
    pub losses: u32,
    pub updated_at: DateTime<Utc>,
}

/// One entry in the toolkit catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolkitEntry {
    pub id: String,
    pub name: String,
    pub category: String,
    pub url: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Review status of a benchmark proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
    Open,
    Accepted,
    Rejected,
}

impl ProposalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalStatus::Open => "open",
            ProposalStatus::Accepted => "accepted",
            ProposalStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<ProposalStatus> {
        match s {
            "open" => Some(ProposalStatus::Open),
            "accepted" => Some(ProposalStatus::Accepted),
            "rejected" => Some(ProposalStatus::Rejected),
            _ => None,
        }
    }
}

/// A user-submitted benchmark proposal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkProposal {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub status: ProposalStatus,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proposal_status_labels_round_trip() {
        for status in [
            ProposalStatus::Open,
            ProposalStatus::Accepted,
            ProposalStatus::Rejected,
        ] {
            assert_eq!(ProposalStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ProposalStatus::parse("merged"), None);
    }
}
