//! Anthropic Messages API backend
//!
//! Speaks `POST {base}/v1/messages`. Unlike the OpenAI wire format, system
//! prompts live in a dedicated top-level field and the reply arrives as a
//! list of typed content blocks.

use super::{ChatBackend, ChatMessage, Role, transport_error};
use crate::error::{AppError, AppResult};
use crate::models::Provider;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ContentBlock {
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Split system messages out of the history, per the Messages API contract
///
/// Multiple system messages are joined; user/assistant messages keep their
/// relative order.
fn split_system(messages: &[ChatMessage]) -> (Option<String>, Vec<WireMessage<'_>>) {
    let mut system_parts = Vec::new();
    let mut wire = Vec::new();
    for message in messages {
        match message.role {
            Role::System => system_parts.push(message.content.as_str()),
            Role::User => wire.push(WireMessage {
                role: "user",
                content: &message.content,
            }),
            Role::Assistant => wire.push(WireMessage {
                role: "assistant",
                content: &message.content,
            }),
        }
    }
    let system = if system_parts.is_empty() {
        None
    } else {
        Some(system_parts.join("\n\n"))
    };
    (system, wire)
}

/// Backend for the Anthropic Messages API
pub struct AnthropicBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    timeout_seconds: u64,
}

impl AnthropicBackend {
    pub fn new(
        client: reqwest::Client,
        base_url: String,
        api_key: String,
        timeout_seconds: u64,
    ) -> Self {
        Self {
            client,
            base_url,
            api_key,
            timeout_seconds,
        }
    }
}

#[async_trait]
impl ChatBackend for AnthropicBackend {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        max_tokens: u32,
        temperature: f64,
    ) -> AppResult<String> {
        let (system, wire_messages) = split_system(messages);
        let request = MessagesRequest {
            model,
            max_tokens,
            temperature,
            system,
            messages: wire_messages,
        };

        let url = format!("{}/v1/messages", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(Provider::Anthropic, self.timeout_seconds, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let reason = match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(api_error) => format!("{} ({})", api_error.error.message, status.as_u16()),
                Err(_) => format!("HTTP {}: {}", status.as_u16(), body),
            };
            return Err(AppError::ProviderQueryFailed {
                provider: Provider::Anthropic.to_string(),
                reason,
            });
        }

        let body: MessagesResponse = response.json().await.map_err(|e| {
            AppError::ProviderQueryFailed {
                provider: Provider::Anthropic.to_string(),
                reason: format!("Failed to parse response: {e}"),
            }
        })?;

        let text: String = body
            .content
            .into_iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .collect();

        if text.is_empty() {
            return Err(AppError::ProviderQueryFailed {
                provider: Provider::Anthropic.to_string(),
                reason: "No text content in response".to_string(),
            });
        }

        Ok(text)
    }
}
