use super::failure::{FailureKind, FlowFailure};
use super::flows::{FlowCatalog, FlowDefinition, OnFailure};
use super::history::HistoryWindow;
use super::models::{AiConfig, AiProviderResponse, FlowRequest, FlowResult, OutputShape};
use super::output::parse_output;
use super::prompt::render;
use async_trait::async_trait;
use std::error::Error;

#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Sends one generation request to the AI provider.
    ///
    /// `api_key` is the credential for this call only. Implementations must not
    /// keep it beyond the request, so concurrent calls with different keys stay
    /// isolated. The error's message is what the gateway classifies.
    async fn generate(
        &self,
        prompt: &str,
        shape: &OutputShape,
        config: &AiConfig,
        api_key: &str,
    ) -> Result<AiProviderResponse, Box<dyn Error + Send + Sync>>;
}

// Blanket implementation for Box<dyn AiProvider>
// This allows us to use trait objects in the FlowGateway, enabling
// runtime switching between different AI providers (Gemini, OpenRouter)
#[async_trait]
impl AiProvider for Box<dyn AiProvider> {
    async fn generate(
        &self,
        prompt: &str,
        shape: &OutputShape,
        config: &AiConfig,
        api_key: &str,
    ) -> Result<AiProviderResponse, Box<dyn Error + Send + Sync>> {
        // Delegate to the inner provider
        (**self).generate(prompt, shape, config, api_key).await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("Unknown flow: {0}")]
    UnknownFlow(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("{0}")]
    Failed(FlowFailure),
}

/// Runs named flows against an AI provider.
pub struct FlowGateway<P: AiProvider> {
    provider: P,
    catalog: FlowCatalog,
    config: AiConfig,
    default_api_key: Option<String>,
    history: HistoryWindow,
}

impl<P: AiProvider> FlowGateway<P> {
    pub fn new(
        provider: P,
        catalog: FlowCatalog,
        config: AiConfig,
        default_api_key: Option<String>,
    ) -> Self {
        Self {
            provider,
            catalog,
            config,
            default_api_key: default_api_key.filter(|k| !k.trim().is_empty()),
            history: HistoryWindow::default(),
        }
    }

    pub fn with_history_window(mut self, history: HistoryWindow) -> Self {
        self.history = history;
        self
    }

    pub fn catalog(&self) -> &FlowCatalog {
        &self.catalog
    }

    /// Runs `flow_name` once.
    ///
    /// Request problems are reported before the provider is called. Provider and
    /// output failures are classified, then either replaced by the flow's
    /// fallback result or returned as `FlowError::Failed`.
    pub async fn invoke(
        &self,
        flow_name: &str,
        request: FlowRequest,
    ) -> Result<FlowResult, FlowError> {
        let flow = self
            .catalog
            .get(flow_name)
            .ok_or_else(|| FlowError::UnknownFlow(flow_name.to_string()))?;

        let FlowRequest {
            mut payload,
            api_key_override,
        } = request;

        for &field in flow.required_fields {
            let present = payload
                .get(field)
                .map(|v| !v.trim().is_empty())
                .unwrap_or(false);
            if !present {
                return Err(FlowError::InvalidRequest(format!(
                    "Missing required field `{}`",
                    field
                )));
            }
        }

        if let Some(prepare) = flow.prepare {
            prepare(&mut payload).map_err(FlowError::InvalidRequest)?;
        }

        if let Some(field) = flow.history_field {
            if let Some(history) = payload.get(field) {
                let trimmed = self.history.select(history);
                payload.insert(field.to_string(), trimmed);
            }
        }

        let prompt = render(flow.template, &payload);

        let outcome = match self.select_api_key(api_key_override.as_deref()) {
            Some(api_key) => self.run(flow, &prompt, api_key).await,
            None => Err(FlowFailure::new(
                FailureKind::Unknown,
                "No API key configured for the AI provider",
            )),
        };

        match outcome {
            Ok(result) => Ok(result),
            Err(failure) => self.resolve_failure(flow, failure),
        }
    }

    /// A non-blank override wins over the process-wide default.
    fn select_api_key<'a>(&'a self, api_key_override: Option<&'a str>) -> Option<&'a str> {
        api_key_override
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .or(self.default_api_key.as_deref())
    }

    async fn run(
        &self,
        flow: &FlowDefinition,
        prompt: &str,
        api_key: &str,
    ) -> Result<FlowResult, FlowFailure> {
        tracing::debug!(
            flow = flow.name,
            model = %self.config.model,
            prompt_chars = prompt.len(),
            "Invoking AI flow"
        );

        let response = self
            .provider
            .generate(prompt, &flow.output, &self.config, api_key)
            .await
            .map_err(|e| FlowFailure::from_provider_error(&e.to_string()))?;

        let fields = parse_output(&response.content, &flow.output).map_err(|e| {
            FlowFailure::new(
                FailureKind::InvalidOutput,
                format!("{} (finish reason: {:?})", e, response.finish_reason),
            )
        })?;

        if let Some(check) = flow.output_check {
            check(&fields).map_err(|e| FlowFailure::new(FailureKind::InvalidOutput, e))?;
        }

        Ok(FlowResult::new(fields))
    }

    fn resolve_failure(
        &self,
        flow: &FlowDefinition,
        failure: FlowFailure,
    ) -> Result<FlowResult, FlowError> {
        tracing::warn!(
            flow = flow.name,
            kind = ?failure.kind,
            detail = %failure.detail,
            "AI flow failed"
        );

        match (flow.on_failure, flow.fallback_result()) {
            (OnFailure::Fallback(_), Some(mut fallback)) => {
                fallback.recovered_from = Some(failure.kind);
                Ok(fallback)
            }
            _ => Err(FlowError::Failed(failure)),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
