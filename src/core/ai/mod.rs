pub mod ai_service;
pub mod failure;
pub mod flows;
pub mod history;
pub mod models;
pub mod output;
pub mod prompt;

pub use ai_service::{AiProvider, FlowError, FlowGateway};
pub use failure::{FailureKind, FlowFailure};
pub use flows::{FlowCatalog, FlowSummary};
pub use history::HistoryWindow;
pub use models::{AiConfig, AiProviderResponse, FlowRequest, FlowResult, OutputShape};
