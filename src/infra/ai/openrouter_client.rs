use crate::core::ai::{AiConfig, AiProvider, AiProviderResponse, OutputShape};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::error::Error;
use std::time::Duration;

const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

pub struct OpenRouterClient {
    client: Client,
}

impl OpenRouterClient {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
        })
    }

    fn build_payload(prompt: &str, shape: &OutputShape, config: &AiConfig) -> Value {
        // OpenRouter has no per-field schema support across all models, so the
        // expected keys are restated in a system message and JSON mode is requested.
        let system = format!(
            "Reply with a single JSON object containing the string fields: {}.",
            shape.fields.join(", ")
        );

        json!({
            "model": config.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": prompt },
            ],
            "temperature": config.temperature,
            "max_tokens": config.max_tokens,
            "top_p": config.top_p,
            "response_format": { "type": "json_object" },
        })
    }

    fn format_api_error(status: reqwest::StatusCode, body: &str) -> String {
        format!("OpenRouter API error: {} - {}", status, body)
    }
}

#[async_trait]
impl AiProvider for OpenRouterClient {
    async fn generate(
        &self,
        prompt: &str,
        shape: &OutputShape,
        config: &AiConfig,
        api_key: &str,
    ) -> Result<AiProviderResponse, Box<dyn Error + Send + Sync>> {
        let payload = Self::build_payload(prompt, shape, config);

        let response = self
            .client
            .post(OPENROUTER_URL)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            // The status line must survive an unreadable body.
            let text = response.text().await.unwrap_or_default();
            return Err(Self::format_api_error(status, &text).into());
        }

        let response_json: Value = response.json().await?;

        // Extract content
        let content = response_json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or("Failed to parse response content")?
            .to_string();
        let finish_reason = response_json["choices"][0]["finish_reason"]
            .as_str()
            .map(str::to_string);

        Ok(AiProviderResponse {
            content,
            finish_reason,
        })
    }
}
