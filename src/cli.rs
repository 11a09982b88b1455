//! Command-line interface for promptgrid
//!
//! Provides argument parsing and subcommand handling for the promptgrid binary.

use clap::{Parser, Subcommand};

/// Side-by-side prompt runner for hosted AI chat providers
#[derive(Parser)]
#[command(name = "promptgrid")]
#[command(version)]
#[command(about = "Side-by-side prompt runner for hosted AI chat providers")]
#[command(
    long_about = "Promptgrid sends identical prompt sequences to multiple AI chat APIs \
    (OpenAI, Anthropic, Google, xAI, OpenRouter), records the responses side by side, \
    and serves them through a REST API."
)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate a template configuration file
    Config {
        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },
}

/// Generate template configuration content
pub fn generate_config_template() -> &'static str {
    r#"# Promptgrid Configuration
# ========================
#
# This file configures the HTTP server, provider credentials, the chatbot
# catalog, dispatch bounds, and observability settings for promptgrid.

# ─────────────────────────────────────────────────────────────────────────────
# SERVER CONFIGURATION
# ─────────────────────────────────────────────────────────────────────────────

[server]
# IP address to bind to (0.0.0.0 for all interfaces, 127.0.0.1 for localhost only)
host = "0.0.0.0"

# Port to listen on
port = 3000

# Timeout per provider call in seconds (1-300). A run with N prompt steps may
# take up to N timeouts per chatbot in the worst case.
request_timeout_seconds = 60

# ─────────────────────────────────────────────────────────────────────────────
# STORAGE
# ─────────────────────────────────────────────────────────────────────────────

[storage]
# SQLite database file. Created on first start.
path = "promptgrid.db"

# ─────────────────────────────────────────────────────────────────────────────
# DISPATCH
# ─────────────────────────────────────────────────────────────────────────────

[dispatch]
# How many chatbot conversations run concurrently (1-64). Steps within one
# chatbot always run sequentially - they form a conversation.
max_concurrent_chatbots = 4

# Generation defaults; individual chatbots may override these in the catalog.
max_output_tokens = 1024
temperature = 0.7

# ─────────────────────────────────────────────────────────────────────────────
# PROVIDERS
# ─────────────────────────────────────────────────────────────────────────────
#
# Configure credentials for each provider the catalog references. When
# api_key is omitted, the provider's conventional environment variable is
# consulted instead (OPENAI_API_KEY, ANTHROPIC_API_KEY, GOOGLE_API_KEY,
# XAI_API_KEY, OPENROUTER_API_KEY). base_url is only needed for proxies.

[providers.openai]
api_key = ""

[providers.anthropic]
api_key = ""

# [providers.google]
# api_key = ""

# [providers.xai]
# api_key = ""

# [providers.openrouter]
# api_key = ""
# base_url = "https://openrouter.ai/api/v1"

# ─────────────────────────────────────────────────────────────────────────────
# CHATBOT CATALOG
# ─────────────────────────────────────────────────────────────────────────────
#
# The static catalog served by GET /api/chatbots. Runs and arena matches
# select chatbots by id.
#
# Entry fields:
#   - id: unique slug used in API requests
#   - name: display name
#   - provider: openai | anthropic | google | xai | openrouter
#   - model: provider-side model identifier
#   - max_output_tokens / temperature: optional per-chatbot overrides

[[chatbots]]
id = "gpt-4o"
name = "GPT-4o"
provider = "openai"
model = "gpt-4o"

[[chatbots]]
id = "claude-sonnet"
name = "Claude Sonnet"
provider = "anthropic"
model = "claude-sonnet-4-5"

# [[chatbots]]
# id = "gemini-pro"
# name = "Gemini Pro"
# provider = "google"
# model = "gemini-2.5-pro"
# temperature = 0.2

# ─────────────────────────────────────────────────────────────────────────────
# OBSERVABILITY
# ─────────────────────────────────────────────────────────────────────────────

[observability]
# Log level: "trace", "debug", "info", "warn", "error"
log_level = "info"

# Prometheus metrics are always available at /metrics on the server port
# For production, consider using a reverse proxy to restrict access
"#
}
