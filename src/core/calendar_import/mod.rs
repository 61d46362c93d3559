// Core calendar import module - normalization, parsing contract and outcomes.

pub mod import_service;
pub mod models;
pub mod normalize;

pub use import_service::{CalendarImporter, CalendarParseError, CalendarParser, ImportError};
pub use models::{CalendarComponent, CalendarTime, ComponentKind, ImportNotice, ParsedCalendar};
