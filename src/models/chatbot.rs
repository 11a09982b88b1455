//! Chatbot catalog types
//!
//! A `Chatbot` is a static descriptor of one provider/model pairing, loaded
//! from the `[[chatbots]]` section of the config file. Catalog entries are
//! never stored in the database; runs reference them by id.

use serde::{Deserialize, Serialize};

/// Hosted chat API providers promptgrid can dispatch to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAi,
    Anthropic,
    Google,
    Xai,
    OpenRouter,
}

impl Provider {
    /// All supported providers, in catalog display order
    pub const ALL: [Provider; 5] = [
        Provider::OpenAi,
        Provider::Anthropic,
        Provider::Google,
        Provider::Xai,
        Provider::OpenRouter,
    ];

    /// Stable lowercase label, used for config keys and metrics labels
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
            Provider::Google => "google",
            Provider::Xai => "xai",
            Provider::OpenRouter => "openrouter",
        }
    }

    /// Default API base URL when the config does not override it
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::OpenAi => "https://api.openai.com/v1",
            Provider::Anthropic => "https://api.anthropic.com",
            Provider::Google => "https://generativelanguage.googleapis.com",
            Provider::Xai => "https://api.x.ai/v1",
            Provider::OpenRouter => "https://openrouter.ai/api/v1",
        }
    }

    /// Conventional environment variable consulted when the config omits
    /// an api_key for this provider
    pub fn api_key_env_var(&self) -> &'static str {
        match self {
            Provider::OpenAi => "OPENAI_API_KEY",
            Provider::Anthropic => "ANTHROPIC_API_KEY",
            Provider::Google => "GOOGLE_API_KEY",
            Provider::Xai => "XAI_API_KEY",
            Provider::OpenRouter => "OPENROUTER_API_KEY",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One provider/model pairing available to query
///
/// Fields are private to enforce invariants. Catalog entries are loaded via
/// deserialization and validated by `Config::validate()`; after construction
/// they cannot be mutated, so validated data remains valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chatbot {
    id: String,
    name: String,
    provider: Provider,
    model: String,
    /// Per-chatbot override of the dispatch-wide output token cap
    #[serde(default)]
    max_output_tokens: Option<u32>,
    /// Per-chatbot override of the dispatch-wide sampling temperature
    #[serde(default)]
    temperature: Option<f64>,
}

impl Chatbot {
    /// Get the catalog id (unique slug)
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the provider this chatbot dispatches through
    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// Get the provider-side model identifier
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Get the output token cap override, if any
    pub fn max_output_tokens(&self) -> Option<u32> {
        self.max_output_tokens
    }

    /// Get the temperature override, if any
    pub fn temperature(&self) -> Option<f64> {
        self.temperature
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_serde_round_trip() {
        for provider in Provider::ALL {
            let json = serde_json::to_string(&provider).expect("should serialize");
            assert_eq!(json, format!("\"{}\"", provider.as_str()));
            let back: Provider = serde_json::from_str(&json).expect("should deserialize");
            assert_eq!(back, provider);
        }
    }

    #[test]
    fn test_provider_rejects_unknown_name() {
        let result = serde_json::from_str::<Provider>(r#""mistral""#);
        assert!(result.is_err(), "unsupported provider should be rejected");
    }

    #[test]
    fn test_chatbot_deserializes_from_toml() {
        let toml = r#"
id = "gpt-4o"
name = "GPT-4o"
provider = "openai"
model = "gpt-4o"
max_output_tokens = 2048
temperature = 0.2
"#;
        let bot: Chatbot = toml::from_str(toml).expect("should parse chatbot");
        assert_eq!(bot.id(), "gpt-4o");
        assert_eq!(bot.name(), "GPT-4o");
        assert_eq!(bot.provider(), Provider::OpenAi);
        assert_eq!(bot.model(), "gpt-4o");
        assert_eq!(bot.max_output_tokens(), Some(2048));
        assert_eq!(bot.temperature(), Some(0.2));
    }

    #[test]
    fn test_chatbot_overrides_default_to_none() {
        let toml = r#"
id = "sonnet"
name = "Claude Sonnet"
provider = "anthropic"
model = "claude-sonnet-4-5"
"#;
        let bot: Chatbot = toml::from_str(toml).expect("should parse chatbot");
        assert_eq!(bot.max_output_tokens(), None);
        assert_eq!(bot.temperature(), None);
    }

    #[test]
    fn test_default_base_urls_are_https() {
        for provider in Provider::ALL {
            assert!(
                provider.default_base_url().starts_with("https://"),
                "{} default base_url should be https",
                provider
            );
        }
    }
}
