//! OpenAI-compatible chat completions backend
//!
//! Speaks `POST {base}/chat/completions` with bearer auth. Besides OpenAI
//! itself, xAI and OpenRouter expose the same wire format, so all three share
//! this backend with different base URLs.

use super::{ChatBackend, ChatMessage, Role, transport_error};
use crate::error::{AppError, AppResult};
use crate::models::Provider;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Chat completion request payload
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// Chat completion response
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

/// Error response shape shared by OpenAI-compatible APIs
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

fn wire_role(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

/// Backend for OpenAI, xAI, and OpenRouter
pub struct OpenAiCompatibleBackend {
    provider: Provider,
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    timeout_seconds: u64,
}

impl OpenAiCompatibleBackend {
    pub fn new(
        provider: Provider,
        client: reqwest::Client,
        base_url: String,
        api_key: String,
        timeout_seconds: u64,
    ) -> Self {
        Self {
            provider,
            client,
            base_url,
            api_key,
            timeout_seconds,
        }
    }
}

#[async_trait]
impl ChatBackend for OpenAiCompatibleBackend {
    fn provider(&self) -> Provider {
        self.provider
    }

    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        max_tokens: u32,
        temperature: f64,
    ) -> AppResult<String> {
        let request = ChatCompletionRequest {
            model,
            messages: messages
                .iter()
                .map(|m| WireMessage {
                    role: wire_role(m.role),
                    content: &m.content,
                })
                .collect(),
            max_tokens,
            temperature,
        };

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(self.provider, self.timeout_seconds, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Prefer the structured error message when the body parses
            let reason = match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(api_error) => format!("{} ({})", api_error.error.message, status.as_u16()),
                Err(_) => format!("HTTP {}: {}", status.as_u16(), body),
            };
            return Err(AppError::ProviderQueryFailed {
                provider: self.provider.to_string(),
                reason,
            });
        }

        let body: ChatCompletionResponse = response.json().await.map_err(|e| {
            AppError::ProviderQueryFailed {
                provider: self.provider.to_string(),
                reason: format!("Failed to parse response: {e}"),
            }
        })?;

        body.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AppError::ProviderQueryFailed {
                provider: self.provider.to_string(),
                reason: "No choices in response".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serializes_expected_shape() {
        let messages = vec![
            ChatMessage::system("Answer briefly."),
            ChatMessage::user("What is the capital of France?"),
        ];
        let request = ChatCompletionRequest {
            model: "gpt-4o",
            messages: messages
                .iter()
                .map(|m| WireMessage {
                    role: wire_role(m.role),
                    content: &m.content,
                })
                .collect(),
            max_tokens: 256,
            temperature: 0.7,
        };

        let json = serde_json::to_value(&request).expect("should serialize");
        assert_eq!(json["model"], "gpt-4o");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["messages"][1]["content"], "What is the capital of France?");
        assert_eq!(json["max_tokens"], 256);
    }

    #[test]
    fn test_response_parses_first_choice() {
        let body = r#"{
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "Paris."}, "finish_reason": "stop"}
            ],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
        }"#;

        let parsed: ChatCompletionResponse = serde_json::from_str(body).expect("should parse");
        assert_eq!(parsed.choices[0].message.content, "Paris.");
    }

    #[test]
    fn test_error_body_parses_message() {
        let body = r#"{"error": {"message": "Rate limit reached", "type": "rate_limit_error"}}"#;
        let parsed: ApiErrorResponse = serde_json::from_str(body).expect("should parse");
        assert_eq!(parsed.error.message, "Rate limit reached");
    }

    #[test]
    fn test_wire_role_mapping() {
        assert_eq!(wire_role(Role::System), "system");
        assert_eq!(wire_role(Role::User), "user");
        assert_eq!(wire_role(Role::Assistant), "assistant");
    }
}
