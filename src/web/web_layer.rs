// The web module exposes the core services over HTTP.
// Handlers stay thin: extract, call core, map the outcome to a response.

#[path = "routes/mod.rs"]
pub mod routes;

#[path = "state.rs"]
pub mod state;

pub use state::AppState;

use axum::{extract::DefaultBodyLimit, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Builds the application router with CORS, request tracing and the body cap.
pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(routes::health::router())
        .merge(routes::flows::router())
        .merge(routes::calendar::router())
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
