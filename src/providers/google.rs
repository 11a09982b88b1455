//! Google generateContent backend
//!
//! Speaks `POST {base}/v1beta/models/{model}:generateContent` with the API
//! key in the query string. Roles are `user`/`model`, message text travels in
//! `parts`, and system prompts go in `systemInstruction`.

use super::{ChatBackend, ChatMessage, Role, transport_error};
use crate::error::{AppError, AppResult};
use crate::models::Provider;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Translate the neutral history into generateContent's shape
///
/// System messages collapse into `systemInstruction`; assistant turns become
/// role `model`.
fn build_request<'a>(
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f64,
) -> GenerateContentRequest<'a> {
    let mut system_parts = Vec::new();
    let mut contents = Vec::new();
    for message in messages {
        match message.role {
            Role::System => system_parts.push(Part {
                text: &message.content,
            }),
            Role::User => contents.push(Content {
                role: Some("user"),
                parts: vec![Part {
                    text: &message.content,
                }],
            }),
            Role::Assistant => contents.push(Content {
                role: Some("model"),
                parts: vec![Part {
                    text: &message.content,
                }],
            }),
        }
    }

    GenerateContentRequest {
        system_instruction: if system_parts.is_empty() {
            None
        } else {
            Some(Content {
                role: None,
                parts: system_parts,
            })
        },
        contents,
        generation_config: GenerationConfig {
            max_output_tokens: max_tokens,
            temperature,
        },
    }
}

/// Backend for Google's generateContent API
pub struct GoogleBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    timeout_seconds: u64,
}

impl GoogleBackend {
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
impl ChatBackend for GoogleBackend {
    fn provider(&self) -> Provider {
        Provider::Google
    }

    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        max_tokens: u32,
        temperature: f64,
    ) -> AppResult<String> {
        let request = build_request(messages, max_tokens, temperature);

        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, model);
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(Provider::Google, self.timeout_seconds, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let reason = match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(api_error) => format!("{} ({})", api_error.error.message, status.as_u16()),
                Err(_) => format!("HTTP {}: {}", status.as_u16(), body),
            };
            return Err(AppError::ProviderQueryFailed {
                provider: Provider::Google.to_string(),
                reason,
            });
        }

        let body: GenerateContentResponse = response.json().await.map_err(|e| {
            AppError::ProviderQueryFailed {
                provider: Provider::Google.to_string(),
                reason: format!("Failed to parse response: {e}"),
            }
        })?;

        let text: String = body
            .candidates
            .into_iter()
            .next()
            .map(|c| {
                c.content
                    .parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<String>()
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(AppError::ProviderQueryFailed {
                provider: Provider::Google.to_string(),
                reason: "No candidates in response".to_string(),
            });
        }

        Ok(text)
    }
}
