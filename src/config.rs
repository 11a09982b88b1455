//! Configuration management for promptgrid
//!
//! Parses TOML configuration files and provides typed access to settings.

use crate::models::{Chatbot, Provider};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    /// Static chatbot catalog served by GET /api/chatbots
    pub chatbots: Vec<Chatbot>,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Timeout per provider call in seconds, range (0, 300]
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

fn default_request_timeout() -> u64 {
    60
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// SQLite database file path
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("promptgrid.db")
}

/// Dispatch configuration
///
/// Bounds the fan-out and supplies generation defaults that individual
/// chatbots may override in the catalog.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DispatchConfig {
    /// How many chatbot conversations run concurrently per run, range [1, 64]
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_chatbots: usize,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_chatbots: default_max_concurrent(),
            max_output_tokens: default_max_output_tokens(),
            temperature: default_temperature(),
        }
    }
}

impl DispatchConfig {
    /// Output token cap for a chatbot, honoring its catalog override
    pub fn effective_max_tokens(&self, bot: &Chatbot) -> u32 {
        bot.max_output_tokens().unwrap_or(self.max_output_tokens)
    }

    /// Sampling temperature for a chatbot, honoring its catalog override
    pub fn effective_temperature(&self, bot: &Chatbot) -> f64 {
        bot.temperature().unwrap_or(self.temperature)
    }
}

fn default_max_concurrent() -> usize {
    4
}

fn default_max_output_tokens() -> u32 {
    1024
}

fn default_temperature() -> f64 {
    0.7
}

/// Per-provider credential and endpoint configuration
///
/// A missing section means the provider is unconfigured; chatbots referencing
/// it are rejected at validation time.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProvidersConfig {
    pub openai: Option<ProviderConfig>,
    pub anthropic: Option<ProviderConfig>,
    pub google: Option<ProviderConfig>,
    pub xai: Option<ProviderConfig>,
    pub openrouter: Option<ProviderConfig>,
}

impl ProvidersConfig {
    /// Look up the section for a provider
    pub fn get(&self, provider: Provider) -> Option<&ProviderConfig> {
        match provider {
            Provider::OpenAi => self.openai.as_ref(),
            Provider::Anthropic => self.anthropic.as_ref(),
            Provider::Google => self.google.as_ref(),
            Provider::Xai => self.xai.as_ref(),
            Provider::OpenRouter => self.openrouter.as_ref(),
        }
    }
}

/// One provider section: `[providers.openai]` etc.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProviderConfig {
    /// API key; falls back to the provider's conventional environment
    /// variable (e.g. OPENAI_API_KEY) when omitted
    api_key: Option<String>,
    /// Override of the provider's default API base URL
    base_url: Option<String>,
}

impl ProviderConfig {
    /// Construct a section with an inline key (used by tests)
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            base_url: None,
        }
    }

    /// Construct a section with an inline key and base URL override
    pub fn with_api_key_and_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            api_key: Some(api_key.into()),
            base_url: Some(base_url.into()),
        }
    }

    /// Resolve the API key: config value first, environment variable second
    pub fn resolved_api_key(&self, provider: Provider) -> Option<String> {
        match &self.api_key {
            Some(key) if !key.trim().is_empty() => Some(key.clone()),
            _ => std::env::var(provider.api_key_env_var())
                .ok()
                .filter(|v| !v.trim().is_empty()),
        }
    }

    /// Base URL for the provider, honoring the override
    pub fn base_url_or_default(&self, provider: Provider) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| provider.default_base_url().to_string())
    }

    /// The raw base URL override, if any (validated at config load)
    pub fn base_url_override(&self) -> Option<&str> {
        self.base_url.as_deref()
    }
}

/// Observability configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::error::AppResult<Self> {
        let path_display = path.as_ref().display().to_string();

        // Phase 1: Read file (preserves io::Error context)
        let content = std::fs::read_to_string(path.as_ref()).map_err(|source| {
            crate::error::AppError::ConfigFileRead {
                path: path_display.clone(),
                source,
            }
        })?;

        // Phase 2: Parse TOML (preserves toml::de::Error context)
        let config: Self = toml::from_str(&content).map_err(|source| {
            crate::error::AppError::ConfigParseFailed {
                path: path_display.clone(),
                source,
            }
        })?;

        // Phase 3: Validate parsed config (provides contextual reason)
        config.validate().map_err(|e| {
            crate::error::AppError::Config(format!("{}: {}", path_display, e))
        })?;

        Ok(config)
    }

    /// Per-call timeout for provider requests
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_seconds)
    }

    /// Look up a catalog entry by id
    pub fn chatbot(&self, id: &str) -> Option<&Chatbot> {
        self.chatbots.iter().find(|b| b.id() == id)
    }

    /// Validate configuration after parsing
    ///
    /// This is called automatically by `from_file()`, but can also be called
    /// explicitly when constructing Config via other means (e.g., in tests).
    pub fn validate(&self) -> crate::error::AppResult<()> {
        // Request timeout: (0, 300] seconds
        if self.server.request_timeout_seconds == 0 {
            return Err(crate::error::AppError::Config(
                "request_timeout_seconds must be greater than 0".to_string(),
            ));
        }
        if self.server.request_timeout_seconds > 300 {
            return Err(crate::error::AppError::Config(format!(
                "request_timeout_seconds cannot exceed 300 seconds (5 minutes), got {}",
                self.server.request_timeout_seconds
            )));
        }

        // Dispatch bounds
        if self.dispatch.max_concurrent_chatbots == 0 || self.dispatch.max_concurrent_chatbots > 64
        {
            return Err(crate::error::AppError::Config(format!(
                "dispatch.max_concurrent_chatbots must be between 1 and 64, got {}",
                self.dispatch.max_concurrent_chatbots
            )));
        }
        if self.dispatch.max_output_tokens == 0 {
            return Err(crate::error::AppError::Config(
                "dispatch.max_output_tokens must be greater than 0".to_string(),
            ));
        }
        validate_temperature("dispatch.temperature", self.dispatch.temperature)?;

        // Catalog: at least one chatbot, unique non-empty ids, valid overrides
        if self.chatbots.is_empty() {
            return Err(crate::error::AppError::Config(
                "no chatbots configured. Add at least one [[chatbots]] entry \
                (id, name, provider, model) to the config file."
                    .to_string(),
            ));
        }

        let mut seen_ids = std::collections::HashSet::new();
        for bot in &self.chatbots {
            if bot.id().trim().is_empty() {
                return Err(crate::error::AppError::Config(
                    "chatbot id cannot be empty".to_string(),
                ));
            }
            if !seen_ids.insert(bot.id()) {
                return Err(crate::error::AppError::Config(format!(
                    "duplicate chatbot id '{}'. Catalog ids must be unique.",
                    bot.id()
                )));
            }
            if bot.model().trim().is_empty() {
                return Err(crate::error::AppError::Config(format!(
                    "chatbot '{}' has an empty model identifier",
                    bot.id()
                )));
            }
            if let Some(max_tokens) = bot.max_output_tokens() {
                if max_tokens == 0 {
                    return Err(crate::error::AppError::Config(format!(
                        "chatbot '{}' has max_output_tokens=0. The override must be \
                        greater than 0.",
                        bot.id()
                    )));
                }
            }
            if let Some(temperature) = bot.temperature() {
                validate_temperature(&format!("chatbot '{}' temperature", bot.id()), temperature)?;
            }

            // Every referenced provider needs a section with usable credentials
            let provider = bot.provider();
            let Some(section) = self.providers.get(provider) else {
                return Err(crate::error::AppError::Config(format!(
                    "chatbot '{}' uses provider '{}' but [providers.{}] is not configured",
                    bot.id(),
                    provider,
                    provider
                )));
            };
            if section.resolved_api_key(provider).is_none() {
                return Err(crate::error::AppError::Config(format!(
                    "chatbot '{}' uses provider '{}' but no api_key is set \
                    ([providers.{}].api_key or the {} environment variable)",
                    bot.id(),
                    provider,
                    provider,
                    provider.api_key_env_var()
                )));
            }
        }

        // Base URL overrides must be absolute http(s) URLs
        for provider in Provider::ALL {
            if let Some(section) = self.providers.get(provider) {
                if let Some(base_url) = section.base_url_override() {
                    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
                        return Err(crate::error::AppError::Config(format!(
                            "[providers.{}].base_url '{}' is invalid. base_url must start \
                            with 'http://' or 'https://'.",
                            provider, base_url
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}

fn validate_temperature(field: &str, temperature: f64) -> crate::error::AppResult<()> {
    if !(0.0..=2.0).contains(&temperature) || temperature.is_nan() {
        return Err(crate::error::AppError::Config(format!(
            "{} is invalid: {}. temperature must be a finite number between 0.0 and 2.0.",
            field, temperature
        )));
    }
    Ok(())
}

impl FromStr for Config {
    type Err = crate::error::AppError;

    fn from_str(toml_str: &str) -> Result<Self, Self::Err> {
        let config: Config = toml::from_str(toml_str).map_err(|source| {
            crate::error::AppError::ConfigParseFailed {
                path: "<string>".to_string(),
                source,
            }
        })?;

        // Validate config before returning
        config.validate()?;
        Ok(config)
    }
}
