//! HTTP request handlers for the promptgrid API

use crate::arena::ArenaEngine;
use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::error::{AppError, AppResult};
use crate::metrics::Metrics;
use crate::middleware::request_id_middleware;
use crate::providers::ProviderRegistry;
use crate::store::Database;
use axum::{
    Router,
    routing::{delete, get, post, put},
};
use std::sync::Arc;

pub mod arena;
pub mod benchmarks;
pub mod chatbots;
pub mod health;
pub mod leaderboard;
pub mod metrics;
pub mod runs;
pub mod sessions;
pub mod toolkit;

/// Application state shared across all handlers
///
/// Contains configuration, storage, the run dispatcher, and the arena engine.
/// All fields are Arc'd for cheap cloning across Axum handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    store: Arc<Database>,
    registry: Arc<ProviderRegistry>,
    dispatcher: Arc<Dispatcher>,
    arena: Arc<ArenaEngine>,
    metrics: Metrics,
}

impl AppState {
    /// Create a new AppState from a validated configuration and open store
    pub fn new(config: Config, store: Database) -> AppResult<Self> {
        let config = Arc::new(config);
        let store = Arc::new(store);
        let metrics = Metrics::new()
            .map_err(|e| AppError::Internal(format!("Failed to create metrics: {e}")))?;
        let registry = Arc::new(ProviderRegistry::from_config(&config)?);
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&config),
            Arc::clone(&registry),
            Arc::clone(&store),
            metrics.clone(),
        ));
        let arena = Arc::new(ArenaEngine::new(
            Arc::clone(&config),
            Arc::clone(&registry),
            Arc::clone(&store),
            metrics.clone(),
        ));

        Ok(Self {
            config,
            store,
            registry,
            dispatcher,
            arena,
            metrics,
        })
    }

    /// Get reference to the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get reference to the store
    pub fn store(&self) -> &Database {
        &self.store
    }

    /// Get reference to the provider registry
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Get reference to the run dispatcher
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Get reference to the arena engine
    pub fn arena(&self) -> &Arc<ArenaEngine> {
        &self.arena
    }

    /// Get reference to the metrics collector
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}

/// Assemble the full application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::handler))
        .route("/metrics", get(metrics::handler))
        .route("/api/chatbots", get(chatbots::list))
        .route("/api/sessions", post(sessions::create).get(sessions::list))
        .route(
            "/api/sessions/{id}",
            get(sessions::get).put(sessions::update).delete(sessions::remove),
        )
        .route("/api/runs", post(runs::create).get(runs::list))
        .route("/api/runs/{id}", get(runs::get).delete(runs::remove))
        .route("/api/arena/matches", post(arena::create).get(arena::list))
        .route(
            "/api/arena/matches/{id}",
            get(arena::get).delete(arena::remove),
        )
        .route("/api/leaderboard", get(leaderboard::list))
        .route(
            "/api/leaderboard/{chatbot_id}",
            put(leaderboard::upsert).delete(leaderboard::remove),
        )
        .route("/api/toolkit", get(toolkit::list).post(toolkit::create))
        .route("/api/toolkit/{id}", delete(toolkit::remove))
        .route(
            "/api/benchmarks/proposals",
            get(benchmarks::list).post(benchmarks::create),
        )
        .route(
            "/api/benchmarks/proposals/{id}/status",
            put(benchmarks::set_status),
        )
        .route("/api/benchmarks/proposals/{id}", delete(benchmarks::remove))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}
