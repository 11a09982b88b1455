//! Provider chat clients
//!
//! One backend per wire format: OpenAI-style chat completions (also spoken by
//! xAI and OpenRouter), the Anthropic Messages API, and Google's
//! generateContent API. Backends receive a full message history per call and
//! return the assistant's reply text; errors are surfaced to the dispatcher,
//! which records them - there are no retries.

pub mod anthropic;
pub mod google;
pub mod openai;

pub use anthropic::AnthropicBackend;
pub use google::GoogleBackend;
pub use openai::OpenAiCompatibleBackend;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::Provider;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Role of a message in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message in a conversation history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A chat completion backend for one provider
///
/// Implementations translate the neutral message history into the provider's
/// wire format and extract the reply text from the response.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Which provider this backend speaks for
    fn provider(&self) -> Provider;

    /// Send a message history and return the assistant's reply text
    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        max_tokens: u32,
        temperature: f64,
    ) -> AppResult<String>;
}

/// Configured backends keyed by provider
///
/// Built once at startup from the validated config; only providers actually
/// referenced by the chatbot catalog get a backend.
pub struct ProviderRegistry {
    backends: HashMap<Provider, Arc<dyn ChatBackend>>,
}

impl ProviderRegistry {
    /// Build backends for every provider the catalog references
    pub fn from_config(config: &Config) -> AppResult<Self> {
        // One shared connection pool; the per-call timeout is also enforced
        // here so a stuck connection cannot outlive the dispatcher's budget.
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {e}")))?;

        let referenced: HashSet<Provider> =
            config.chatbots.iter().map(|bot| bot.provider()).collect();

        let mut backends: HashMap<Provider, Arc<dyn ChatBackend>> = HashMap::new();
        for provider in referenced {
            let section = config.providers.get(provider).ok_or_else(|| {
                AppError::Config(format!("[providers.{provider}] is not configured"))
            })?;
            let api_key = section.resolved_api_key(provider).ok_or_else(|| {
                AppError::Config(format!("no api_key available for provider {provider}"))
            })?;
            let base_url = section.base_url_or_default(provider);
            let timeout_seconds = config.server.request_timeout_seconds;

            let backend: Arc<dyn ChatBackend> = match provider {
                Provider::OpenAi | Provider::Xai | Provider::OpenRouter => {
                    Arc::new(OpenAiCompatibleBackend::new(
                        provider,
                        client.clone(),
                        base_url,
                        api_key,
                        timeout_seconds,
                    ))
                }
                Provider::Anthropic => Arc::new(AnthropicBackend::new(
                    client.clone(),
                    base_url,
                    api_key,
                    timeout_seconds,
                )),
                Provider::Google => Arc::new(GoogleBackend::new(
                    client.clone(),
                    base_url,
                    api_key,
                    timeout_seconds,
                )),
            };

            tracing::debug!(provider = %provider, "Registered provider backend");
            backends.insert(provider, backend);
        }

        Ok(Self { backends })
    }

    /// Look up the backend for a provider
    pub fn backend(&self, provider: Provider) -> Option<Arc<dyn ChatBackend>> {
        self.backends.get(&provider).cloned()
    }

    /// Number of configured backends
    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

/// Map a reqwest transport error into the application error taxonomy
///
/// Timeouts get their own variant so handlers can answer 504 instead of 502.
pub(crate) fn transport_error(
    provider: Provider,
    timeout_seconds: u64,
    err: reqwest::Error,
) -> AppError {
    if err.is_timeout() {
        AppError::ProviderTimeout {
            provider: provider.to_string(),
            timeout_seconds,
        }
    } else {
        AppError::ProviderQueryFailed {
            provider: provider.to_string(),
            reason: err.to_string(),
        }
    }
}
