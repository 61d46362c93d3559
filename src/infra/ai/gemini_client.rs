// =============================================================================
// GEMINI CLIENT - Google AI Studio API Integration
// =============================================================================
//
// This module provides an implementation of the `AiProvider` trait that
// communicates with Google's Gemini API (https://ai.google.dev/gemini-api/docs).
//
// **Request shape:**
// - Authentication: the API key travels in the `x-goog-api-key` header. It is
//   passed in per call, so a user-supplied key never outlives its request.
// - Structured output: `responseMimeType: application/json` plus a
//   `responseSchema` built from the flow's output shape.
// - Response format: Content is at `candidates[0].content.parts[*].text`.
//
// **Environment Variables:**
// - `GEMINI_API_KEY` - Default API key from https://aistudio.google.com/apikey

use crate::core::ai::{AiConfig, AiProvider, AiProviderResponse, OutputShape};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::error::Error;
use std::time::Duration;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

// =============================================================================
// GEMINI API DATA STRUCTURES
// =============================================================================
//
// These structs model the Gemini API request/response format.
// See: https://ai.google.dev/api/generate-content

/// A single part of content. Gemini uses a "parts" array to support
/// multimodal content; we only send and read text.
#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,

    /// Set on parts that carry the model's thinking rather than the answer.
    #[serde(skip_serializing_if = "Option::is_none")]
    thought: Option<bool>,
}

/// Represents a message in the conversation.
#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(default)]
struct Content {
    /// Role: "user" or "model"
    role: String,
    parts: Vec<Part>,
}

/// Generation configuration options that control the model's output.
/// See: https://ai.google.dev/api/generate-content#generationconfig
#[derive(Debug, Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    /// Controls randomness. Range: [0.0, 2.0]. Higher = more creative.
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,

    /// Maximum number of tokens to generate in the response.
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,

    /// Nucleus sampling: considers tokens with top_p cumulative probability.
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,

    /// Always "application/json" for flows.
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,

    /// OpenAPI-subset schema the JSON answer must follow.
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
}

/// The request body sent to the Gemini generateContent endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,

    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

/// A candidate response from the model.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    /// Missing when the candidate was blocked.
    content: Option<Content>,

    /// Why the model stopped generating (e.g., "STOP", "MAX_TOKENS", "SAFETY").
    finish_reason: Option<String>,
}

/// Feedback about the prompt itself, present when it was blocked.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// The response from the Gemini generateContent endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    /// List of candidate responses. Usually just one.
    candidates: Option<Vec<Candidate>>,

    prompt_feedback: Option<PromptFeedback>,
}

/// Error response from the Gemini API.
#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiErrorDetail,
}

// =============================================================================
// CLIENT
// =============================================================================

/// Client for Google's Gemini API.
///
/// Holds only the HTTP client; the API key is supplied on every call.
pub struct GeminiClient {
    client: Client,
    base_url: String,
}

impl GeminiClient {
    /// Creates a client whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: GEMINI_BASE_URL.to_string(),
        })
    }

    /// Builds the `responseSchema` for an output shape: an object whose
    /// declared fields are all required strings.
    fn response_schema(shape: &OutputShape) -> Value {
        let properties: serde_json::Map<String, Value> = shape
            .fields
            .iter()
            .map(|f| (f.to_string(), json!({ "type": "STRING" })))
            .collect();

        json!({
            "type": "OBJECT",
            "properties": properties,
            "required": shape.fields,
        })
    }

    fn build_request(prompt: &str, shape: &OutputShape, config: &AiConfig) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                    thought: None,
                }],
            }],
            generation_config: Some(GenerationConfig {
                temperature: Some(config.temperature),
                max_output_tokens: config.max_tokens,
                top_p: config.top_p,
                response_mime_type: Some("application/json".to_string()),
                response_schema: Some(Self::response_schema(shape)),
            }),
        }
    }

    /// Formats a non-success response. The status line is kept in the message
    /// because failure classification looks for codes such as 429 and 503.
    fn format_api_error(status: reqwest::StatusCode, body: &str) -> String {
        match serde_json::from_str::<GeminiErrorResponse>(body) {
            Ok(error_response) => format!(
                "Gemini API error ({}): {}{}",
                status,
                error_response.error.message,
                error_response
                    .error
                    .status
                    .map(|s| format!(" [{}]", s))
                    .unwrap_or_default()
            ),
            Err(_) => format!("Gemini API error: {} - {}", status, body),
        }
    }

    /// Pulls the answer text out of a response. Thought parts are skipped and
    /// the remaining text parts are concatenated.
    fn extract_content(
        response: GenerateContentResponse,
    ) -> Result<AiProviderResponse, Box<dyn Error + Send + Sync>> {
        if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(format!("Gemini blocked the prompt: {}", reason).into());
        }

        let candidate = response
            .candidates
            .and_then(|c| c.into_iter().next())
            .ok_or(
                "No content in Gemini response - the model may have been blocked by safety filters",
            )?;

        let content: String = candidate
            .content
            .map(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .filter(|p| !p.thought.unwrap_or(false))
            .filter_map(|p| p.text)
            .collect();

        Ok(AiProviderResponse {
            content,
            finish_reason: candidate.finish_reason,
        })
    }
}

#[async_trait]
impl AiProvider for GeminiClient {
    async fn generate(
        &self,
        prompt: &str,
        shape: &OutputShape,
        config: &AiConfig,
        api_key: &str,
    ) -> Result<AiProviderResponse, Box<dyn Error + Send + Sync>> {
        // Format: {base}/models/{model}:generateContent
        let url = format!("{}/models/{}:generateContent", self.base_url, config.model);
        let request = Self::build_request(prompt, shape, config);

        // Log request for debugging (be careful not to log the API key!)
        tracing::debug!(
            "Gemini request to model {}: {} output fields",
            config.model,
            shape.fields.len()
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            // The status line must survive an unreadable body.
            let error_text = response.text().await.unwrap_or_default();
            return Err(Self::format_api_error(status, &error_text).into());
        }

        let response_json: GenerateContentResponse = response.json().await?;
        let result = Self::extract_content(response_json)?;

        tracing::debug!(
            "Gemini response received: {} chars, finish reason {:?}",
            result.content.len(),
            result.finish_reason
        );

        Ok(result)
    }
}

// =============================================================================
// TESTS
// =============================================================================
