//! Domain types for promptgrid
//!
//! Sessions, runs, the chatbot catalog, arena matches, and the flat catalog
//! rows (leaderboard, toolkit, benchmark proposals).

pub mod arena;
pub mod catalog;
pub mod chatbot;
pub mod run;
pub mod session;

pub use arena::{ArenaMatch, ArenaMove, ArenaRound, MatchStatus};
pub use catalog::{BenchmarkProposal, LeaderboardEntry, ProposalStatus, ToolkitEntry};
pub use chatbot::{Chatbot, Provider};
pub use run::{ChatbotResponse, Run, RunStatus};
pub use session::Session;
