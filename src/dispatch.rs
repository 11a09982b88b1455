//! Run dispatcher
//!
//! The fan-out/fan-in core: a run sends a session's prompt sequence to every
//! selected chatbot. Within one chatbot the steps form a conversation and run
//! strictly in order; across chatbots the conversations run concurrently,
//! bounded by a semaphore. Each call's latency and outcome is persisted as it
//! finishes, so polling clients see responses arrive in completion order.
//!
//! Failure policy: errors are caught and recorded as a string on the response
//! row - no retries. A failed step ends that chatbot's conversation. The run
//! fails only when every call errored.

use crate::config::Config;
use crate::error::AppError;
use crate::metrics::Metrics;
use crate::models::{Chatbot, ChatbotResponse, Run, RunStatus, Session};
use crate::providers::{ChatBackend, ChatMessage, ProviderRegistry};
use crate::store::{Database, queries};
use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;

/// Executes runs in the background
///
/// Shared across handlers via `Arc`; one semaphore bounds the provider
/// fan-out across all concurrently executing runs.
pub struct Dispatcher {
    config: Arc<Config>,
    registry: Arc<ProviderRegistry>,
    store: Arc<Database>,
    metrics: Metrics,
    semaphore: Arc<Semaphore>,
}

impl Dispatcher {
    pub fn new(
        config: Arc<Config>,
        registry: Arc<ProviderRegistry>,
        store: Arc<Database>,
        metrics: Metrics,
    ) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.dispatch.max_concurrent_chatbots));
        Self {
            config,
            registry,
            store,
            metrics,
            semaphore,
        }
    }

    /// Start executing a pending run in the background
    ///
    /// Detached per the polling model: the handler returns immediately and
    /// clients observe progress through GET /api/runs/{id}.
    pub fn spawn_run(self: &Arc<Self>, run: Run, session: Session) {
        let dispatcher = Arc::clone(self);
        tokio::spawn(async move {
            let run_id = run.id.clone();
            dispatcher.execute_run(run, session).await;
            tracing::debug!(run_id = %run_id, "Run task finished");
        });
    }

    async fn execute_run(self: Arc<Self>, run: Run, session: Session) {
        tracing::info!(
            run_id = %run.id,
            session_id = %session.id,
            chatbot_count = run.chatbot_ids.len(),
            step_count = session.prompts.len(),
            "Starting run"
        );

        self.persist_status(&run.id, RunStatus::Running, None);

        let prompts = Arc::new(session.prompts);
        let mut handles = Vec::with_capacity(run.chatbot_ids.len());
        for chatbot_id in &run.chatbot_ids {
            // Ids are validated at run creation; a miss here means the config
            // changed under a queued run.
            let Some(bot) = self.config.chatbot(chatbot_id).cloned() else {
                tracing::error!(
                    run_id = %run.id,
                    chatbot_id = %chatbot_id,
                    "Chatbot disappeared from catalog between run creation and dispatch, skipping"
                );
                continue;
            };

            let dispatcher = Arc::clone(&self);
            let run_id = run.id.clone();
            let prompts = Arc::clone(&prompts);
            handles.push(tokio::spawn(async move {
                dispatcher.run_conversation(&run_id, &bot, &prompts).await
            }));
        }

        let mut successful_steps = 0usize;
        for result in join_all(handles).await {
            match result {
                Ok(ok_steps) => successful_steps += ok_steps,
                Err(e) => {
                    tracing::warn!(run_id = %run.id, error = %e, "Conversation task panicked");
                }
            }
        }

        let status = final_status(successful_steps);
        self.persist_status(&run.id, status, Some(Utc::now()));

        // Log-and-continue on metrics recording errors (observability should
        // never break run completion).
        if let Err(e) = self.metrics.record_run_outcome(status) {
            tracing::error!(run_id = %run.id, error = %e, "Metrics recording failed (non-fatal)");
        }

        tracing::info!(
            run_id = %run.id,
            status = status.as_str(),
            successful_steps = successful_steps,
            "Run finished"
        );
    }

    /// Play one chatbot's conversation; returns the number of successful steps
    ///
    /// Step i is sent with the accumulated history of earlier prompts and
    /// this chatbot's earlier answers. A failed step breaks the history, so
    /// the remaining steps are not sent.
    async fn run_conversation(&self, run_id: &str, bot: &Chatbot, prompts: &[String]) -> usize {
        let _permit = match self.semaphore.acquire().await {
            Ok(permit) => permit,
            Err(_) => {
                tracing::error!(run_id = %run_id, "Dispatch semaphore closed");
                return 0;
            }
        };

        let Some(backend) = self.registry.backend(bot.provider()) else {
            tracing::error!(
                run_id = %run_id,
                chatbot_id = %bot.id(),
                provider = %bot.provider(),
                "No backend registered for provider, skipping conversation"
            );
            return 0;
        };

        let mut history: Vec<ChatMessage> = Vec::with_capacity(prompts.len() * 2);
        let mut ok_steps = 0usize;

        for (step, prompt) in prompts.iter().enumerate() {
            history.push(ChatMessage::user(prompt.as_str()));

            let (outcome, latency_ms) =
                timed_call(&backend, bot, &history, &self.config, &self.metrics).await;

            let response = match &outcome {
                Ok(content) => ChatbotResponse {
                    chatbot_id: bot.id().to_string(),
                    step_order: step as u32,
                    content: Some(content.clone()),
                    error: None,
                    latency_ms,
                    created_at: Utc::now(),
                },
                Err(reason) => ChatbotResponse {
                    chatbot_id: bot.id().to_string(),
                    step_order: step as u32,
                    content: None,
                    error: Some(reason.clone()),
                    latency_ms,
                    created_at: Utc::now(),
                },
            };

            // Persist in completion order. A miss means the run was deleted
            // mid-flight; in-flight calls are not cancelled, their late
            // writes just land on the floor.
            if let Err(e) = self
                .store
                .with_connection(|conn| queries::append_response(conn, run_id, &response))
            {
                tracing::debug!(
                    run_id = %run_id,
                    chatbot_id = %bot.id(),
                    step = step,
                    error = %e,
                    "Dropping response write (run deleted mid-flight?)"
                );
                return ok_steps;
            }

            match outcome {
                Ok(content) => {
                    tracing::debug!(
                        run_id = %run_id,
                        chatbot_id = %bot.id(),
                        step = step,
                        latency_ms = latency_ms,
                        response_length = content.len(),
                        "Step completed"
                    );
                    history.push(ChatMessage::assistant(content));
                    ok_steps += 1;
                }
                Err(reason) => {
                    tracing::warn!(
                        run_id = %run_id,
                        chatbot_id = %bot.id(),
                        step = step,
                        error = %reason,
                        "Step failed, ending this chatbot's conversation"
                    );
                    break;
                }
            }
        }

        ok_steps
    }

    fn persist_status(
        &self,
        run_id: &str,
        status: RunStatus,
        completed_at: Option<chrono::DateTime<Utc>>,
    ) {
        if let Err(e) = self
            .store
            .with_connection(|conn| queries::set_run_status(conn, run_id, status, completed_at))
        {
            tracing::warn!(run_id = %run_id, status = status.as_str(), error = %e, "Failed to persist run status");
        }
    }
}

/// Terminal status for a finished run
///
/// Failed only when every call errored; any content at all means the
/// side-by-side view has something to show.
fn final_status(successful_steps: usize) -> RunStatus {
    if successful_steps > 0 {
        RunStatus::Completed
    } else {
        RunStatus::Failed
    }
}

/// Issue one provider call under the configured timeout, recording metrics
///
/// Returns the reply or the error string to be stored, plus the call latency
/// in milliseconds. The timeout is per call; a conversation with N steps may
/// take up to N timeouts.
pub(crate) async fn timed_call(
    backend: &Arc<dyn ChatBackend>,
    bot: &Chatbot,
    messages: &[ChatMessage],
    config: &Config,
    metrics: &Metrics,
) -> (Result<String, String>, u64) {
    let provider = bot.provider();
    let max_tokens = config.dispatch.effective_max_tokens(bot);
    let temperature = config.dispatch.effective_temperature(bot);

    if let Err(e) = metrics.record_provider_request(provider) {
        tracing::error!(provider = %provider, error = %e, "Metrics recording failed (non-fatal)");
    }

    let started = Instant::now();
    let result = tokio::time::timeout(
        config.request_timeout(),
        backend.complete(bot.model(), messages, max_tokens, temperature),
    )
    .await;
    let latency_ms = started.elapsed().as_millis() as u64;

    let outcome = match result {
        Ok(Ok(content)) => Ok(content),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_elapsed) => Err(AppError::ProviderTimeout {
            provider: provider.to_string(),
            timeout_seconds: config.server.request_timeout_seconds,
        }
        .to_string()),
    };

    if let Err(e) = metrics.observe_provider_latency(provider, latency_ms as f64) {
        tracing::error!(provider = %provider, error = %e, "Metrics recording failed (non-fatal)");
    }
    if outcome.is_err() {
        if let Err(e) = metrics.record_provider_error(provider) {
            tracing::error!(provider = %provider, error = %e, "Metrics recording failed (non-fatal)");
        }
    }

    (outcome, latency_ms)
}
