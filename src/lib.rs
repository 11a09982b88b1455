//! promptgrid - side-by-side prompt runner for hosted AI chat providers
//!
//! This library sends identical prompt sequences to multiple chat APIs
//! (OpenAI, Anthropic, Google, xAI, OpenRouter), records the responses next
//! to each other, and serves the surrounding CRUD features: saved sessions,
//! runs, a chatbot catalog, arena matches, a leaderboard, a toolkit catalog,
//! and benchmark proposals.

pub mod arena;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod providers;
pub mod store;
pub mod telemetry;
