// Process configuration, read once at startup from the environment
// (after `.env` has been loaded by main).

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::core::ai::AiConfig;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_OPENROUTER_MODEL: &str = "deepseek/deepseek-chat-v3.1:free";
const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_HISTORY_BUDGET: usize = 2000;
const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?} ({reason})")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("Unknown AI_PROVIDER {0:?}: expected \"gemini\" or \"openrouter\"")]
    UnknownProvider(String),
}

/// Which text-generation backend the gateway talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Gemini,
    OpenRouter,
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Ok(ProviderKind::Gemini),
            "openrouter" => Ok(ProviderKind::OpenRouter),
            _ => Err(ConfigError::UnknownProvider(s.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_address: SocketAddr,
    pub provider: ProviderKind,
    /// Default key for the selected provider. Requests may override it.
    pub api_key: Option<String>,
    pub ai: AiConfig,
    pub request_timeout: Duration,
    pub history_token_budget: usize,
    pub max_body_bytes: usize,
    pub log_level: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable source. Blank values count
    /// as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let provider = match var("AI_PROVIDER") {
            Some(value) => value.parse()?,
            None => ProviderKind::Gemini,
        };

        let (api_key, model) = match provider {
            ProviderKind::Gemini => (
                var("GEMINI_API_KEY").or_else(|| var("GOOGLE_API_KEY")),
                var("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            ),
            ProviderKind::OpenRouter => (
                var("OPENROUTER_API_KEY"),
                var("OPENROUTER_MODEL").unwrap_or_else(|| DEFAULT_OPENROUTER_MODEL.to_string()),
            ),
        };

        let temperature: f32 = parse_var(&var, "AI_TEMPERATURE")?.unwrap_or(DEFAULT_TEMPERATURE);
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::InvalidValue {
                var: "AI_TEMPERATURE",
                value: temperature.to_string(),
                reason: "must be between 0.0 and 2.0".to_string(),
            });
        }

        let timeout_secs: u64 =
            parse_var(&var, "AI_REQUEST_TIMEOUT_SECS")?.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                var: "AI_REQUEST_TIMEOUT_SECS",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            bind_address: parse_var(&var, "BIND_ADDRESS")?
                .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT))),
            provider,
            api_key,
            ai: AiConfig {
                model,
                temperature,
                max_tokens: parse_var(&var, "AI_MAX_OUTPUT_TOKENS")?,
                top_p: None,
            },
            request_timeout: Duration::from_secs(timeout_secs),
            history_token_budget: parse_var(&var, "CHAT_HISTORY_TOKEN_BUDGET")?
                .unwrap_or(DEFAULT_HISTORY_BUDGET),
            max_body_bytes: parse_var(&var, "MAX_BODY_BYTES")?.unwrap_or(DEFAULT_MAX_BODY_BYTES),
            log_level: var("LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        })
    }
}

fn parse_var<T>(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    var(name)
        .map(|value| {
            value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
                var: name,
                value: value.clone(),
                reason: e.to_string(),
            })
        })
        .transpose()
}
