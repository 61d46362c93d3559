use serde::Serialize;
use std::collections::BTreeMap;
use std::collections::HashMap;

use super::failure::FailureKind;

/// Generation settings shared by every flow.
#[derive(Debug, Clone)]
pub struct AiConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f32>,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            temperature: 0.7,
            max_tokens: None,
            top_p: None,
        }
    }
}

/// The structured output a flow expects back from the model: a set of
/// named string fields, all required.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputShape {
    pub fields: &'static [&'static str],
}

impl OutputShape {
    pub const fn new(fields: &'static [&'static str]) -> Self {
        Self { fields }
    }
}

/// Raw response from an AI provider, before output validation.
#[derive(Debug, Clone, Default)]
pub struct AiProviderResponse {
    /// The text the model produced. Expected to hold a JSON object.
    pub content: String,

    /// Why the model stopped generating, when the provider reports it.
    pub finish_reason: Option<String>,
}

/// A request to run one flow.
#[derive(Debug, Clone, Default)]
pub struct FlowRequest {
    /// Named input fields for the flow.
    pub payload: HashMap<String, String>,

    /// Caller-supplied API key. Blank or absent means "use the default key".
    pub api_key_override: Option<String>,
}

impl FlowRequest {
    pub fn new(payload: HashMap<String, String>) -> Self {
        Self {
            payload,
            api_key_override: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key_override = Some(api_key.into());
        self
    }
}

/// Successful flow output. Serializes as a flat JSON object of the output fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowResult {
    #[serde(flatten)]
    pub fields: BTreeMap<String, String>,

    /// Set when a fallback policy produced this result instead of the model.
    #[serde(skip)]
    pub recovered_from: Option<FailureKind>,
}

impl FlowResult {
    pub fn new(fields: BTreeMap<String, String>) -> Self {
        Self {
            fields,
            recovered_from: None,
        }
    }

    #[allow(dead_code)]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }
}
