//! Prometheus metrics collection for promptgrid
//!
//! This module provides metrics instrumentation for tracking:
//! - Run and arena match outcomes by terminal status
//! - Provider calls, errors, and call latency by provider
//!
//! Metrics are exposed via the `/metrics` endpoint in Prometheus text format.

use crate::models::{MatchStatus, Provider, RunStatus};
use prometheus::{
    CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Metrics collector for promptgrid
///
/// Labels come from the `Provider`, `RunStatus`, and `MatchStatus` enums, so
/// cardinality is bounded at compile time: 5 providers and 2 terminal
/// statuses per lifecycle.
#[derive(Clone)]
pub struct Metrics {
    pub registry: Arc<Registry>,
    runs_total: CounterVec,
    arena_matches_total: CounterVec,
    provider_requests: CounterVec,
    provider_errors: CounterVec,
    provider_latency: HistogramVec,
}

impl Metrics {
    /// Create a new Metrics instance
    ///
    /// Registers all metrics with a new Prometheus registry.
    ///
    /// # Errors
    ///
    /// Returns an error if metric registration fails (e.g., duplicate names).
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        // Counter: Runs reaching a terminal status
        //
        // Only terminal statuses are recorded; pending/running are transient
        // states visible through the API, not time series.
        let runs_total = CounterVec::new(
            Opts::new(
                "promptgrid_runs_total",
                "Total number of runs by terminal status",
            ),
            &["status"],
        )?;

        // Counter: Arena matches reaching a terminal status
        let arena_matches_total = CounterVec::new(
            Opts::new(
                "promptgrid_arena_matches_total",
                "Total number of arena matches by terminal status",
            ),
            &["status"],
        )?;

        // Counter: Provider calls attempted, by provider
        let provider_requests = CounterVec::new(
            Opts::new(
                "promptgrid_provider_requests_total",
                "Total provider chat calls attempted by provider",
            ),
            &["provider"],
        )?;

        // Counter: Provider calls that errored, by provider
        //
        // success_rate = 1 - provider_errors_total / provider_requests_total
        let provider_errors = CounterVec::new(
            Opts::new(
                "promptgrid_provider_errors_total",
                "Total provider chat calls that errored by provider",
            ),
            &["provider"],
        )?;

        // Histogram: Provider call latency by provider
        //
        // Buckets span quick cache-hit replies through slow long-context
        // generations; the per-call timeout caps the top end.
        let provider_latency = HistogramVec::new(
            HistogramOpts::new(
                "promptgrid_provider_latency_ms",
                "Provider chat call latency in milliseconds",
            )
            .buckets(vec![
                50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0, 30000.0,
            ]),
            &["provider"],
        )?;

        // Register all metrics
        registry.register(Box::new(runs_total.clone()))?;
        registry.register(Box::new(arena_matches_total.clone()))?;
        registry.register(Box::new(provider_requests.clone()))?;
        registry.register(Box::new(provider_errors.clone()))?;
        registry.register(Box::new(provider_latency.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            runs_total,
            arena_matches_total,
            provider_requests,
            provider_errors,
            provider_latency,
        })
    }

    /// Record a run reaching a terminal status
    ///
    /// Non-terminal statuses are silently skipped; they are lifecycle states,
    /// not outcomes.
    pub fn record_run_outcome(&self, status: RunStatus) -> Result<(), prometheus::Error> {
        if !status.is_terminal() {
            tracing::debug!(status = %status.as_str(), "Skipping metrics for non-terminal run status");
            return Ok(());
        }
        self.runs_total
            .get_metric_with_label_values(&[status.as_str()])?
            .inc();
        Ok(())
    }

    /// Record an arena match reaching a terminal status
    pub fn record_match_outcome(&self, status: MatchStatus) -> Result<(), prometheus::Error> {
        if !status.is_terminal() {
            tracing::debug!(status = %status.as_str(), "Skipping metrics for non-terminal match status");
            return Ok(());
        }
        self.arena_matches_total
            .get_metric_with_label_values(&[status.as_str()])?
            .inc();
        Ok(())
    }

    /// Record one attempted provider call
    pub fn record_provider_request(&self, provider: Provider) -> Result<(), prometheus::Error> {
        self.provider_requests
            .get_metric_with_label_values(&[provider.as_str()])?
            .inc();
        Ok(())
    }

    /// Record one errored provider call
    pub fn record_provider_error(&self, provider: Provider) -> Result<(), prometheus::Error> {
        self.provider_errors
            .get_metric_with_label_values(&[provider.as_str()])?
            .inc();
        Ok(())
    }

    /// Observe one provider call's latency
    ///
    /// # Errors
    ///
    /// Returns an error if the metric is not registered, or if `latency_ms`
    /// is NaN, infinite, or negative. NaN and infinity corrupt histogram
    /// percentiles; negative durations are logically invalid.
    pub fn observe_provider_latency(
        &self,
        provider: Provider,
        latency_ms: f64,
    ) -> Result<(), prometheus::Error> {
        if !latency_ms.is_finite() {
            return Err(prometheus::Error::Msg(format!(
                "Histogram value must be finite (not NaN or Infinity), got: {}",
                latency_ms
            )));
        }
        if latency_ms < 0.0 {
            return Err(prometheus::Error::Msg(format!(
                "Histogram value must be non-negative (duration cannot be negative), got: {}",
                latency_ms
            )));
        }

        self.provider_latency
            .get_metric_with_label_values(&[provider.as_str()])?
            .observe(latency_ms);
        Ok(())
    }

    /// Gather all metrics and encode them in Prometheus text format
    ///
    /// # Errors
    ///
    /// Returns an error if metric encoding fails.
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        encoder.encode(&metric_families, &mut buffer).map_err(|e| {
            tracing::error!(error = %e, "Prometheus text encoder failed");
            prometheus::Error::Msg(format!(
                "Failed to encode {} metric families: {}",
                metric_families.len(),
                e
            ))
        })?;

        String::from_utf8(buffer).map_err(|e| {
            prometheus::Error::Msg(format!(
                "Failed to convert metrics to UTF-8: {}. \
                This indicates corrupted metric names or labels.",
                e
            ))
        })
    }
}
