use std::sync::Arc;

use crate::core::ai::{AiProvider, FlowGateway};
use crate::core::calendar_import::{CalendarImporter, CalendarParser};

/// Shared application state. Everything in here is immutable after startup,
/// so cloning per request is just reference counting.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<FlowGateway<Box<dyn AiProvider>>>,
    pub importer: Arc<CalendarImporter<Box<dyn CalendarParser>>>,
}

impl AppState {
    pub fn new(
        gateway: FlowGateway<Box<dyn AiProvider>>,
        importer: CalendarImporter<Box<dyn CalendarParser>>,
    ) -> Self {
        Self {
            gateway: Arc::new(gateway),
            importer: Arc::new(importer),
        }
    }
}
