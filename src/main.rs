// This is the entry point of the FutureSight server.
//
// **Architecture Overview:**
// - `core/` = Business logic (AI flow gateway, calendar import)
// - `infra/` = Implementations of core traits (Gemini, OpenRouter, iCalendar parser)
// - `web/` = HTTP adapters (axum routes, error-to-status mapping)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Build the router and serve it

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "infra/infra_layer.rs"]
mod infra;
#[path = "web/web_layer.rs"]
mod web;

mod config;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{AppConfig, ProviderKind};
use crate::core::ai::{AiProvider, FlowCatalog, FlowGateway, HistoryWindow};
use crate::core::calendar_import::{CalendarImporter, CalendarParser};
use crate::infra::ai::{GeminiClient, OpenRouterClient};
use crate::infra::calendar::IcalendarParser;
use crate::web::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    let config = AppConfig::from_env().context("Invalid configuration")?;

    // RUST_LOG wins; LOG_LEVEL is the fallback filter.
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Select the AI provider based on configuration
    let provider: Box<dyn AiProvider> = match config.provider {
        ProviderKind::Gemini => Box::new(
            GeminiClient::new(config.request_timeout)
                .context("Failed to create Gemini HTTP client")?,
        ),
        ProviderKind::OpenRouter => Box::new(
            OpenRouterClient::new(config.request_timeout)
                .context("Failed to create OpenRouter HTTP client")?,
        ),
    };

    if config.api_key.is_none() {
        tracing::warn!(
            provider = ?config.provider,
            "No default API key configured; flow requests must supply `apiKey`"
        );
    }

    tracing::info!(
        provider = ?config.provider,
        model = %config.ai.model,
        "AI provider initialized"
    );

    let gateway = FlowGateway::new(
        provider,
        FlowCatalog::builtin(),
        config.ai.clone(),
        config.api_key.clone(),
    )
    .with_history_window(HistoryWindow::new(config.history_token_budget));

    let parser: Box<dyn CalendarParser> = Box::new(IcalendarParser::new());
    let importer = CalendarImporter::new(parser);

    let app = web::router(AppState::new(gateway, importer), config.max_body_bytes);

    let listener = tokio::net::TcpListener::bind(config.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address))?;
    tracing::info!("FutureSight server listening on http://{}", config.bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
