// Calendar import service.
//
// Normalizes raw calendar text, hands it to a `CalendarParser`, and reports one
// of three successes (full, empty, no events) or one classified error. Like the
// AI gateway, parser failures are mapped by marker matching onto a fixed set of
// kinds instead of leaking parser internals.

use super::models::{CalendarImport, ImportNotice, ParsedCalendar};
use super::normalize::normalize_text;
use crate::core::markers::contains_any;
use thiserror::Error;

const MALFORMED_MARKERS: &[&str] = &[
    "invalid calendar container",
    "invalid vcalendar",
    "begin:vcalendar",
    "end:vcalendar",
];
const LINE_BREAK_MARKERS: &[&str] = &["line break", "linebreak", "line ending"];

/// Error reported by a calendar parser. The message is what gets classified.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct CalendarParseError(pub String);

/// Turns normalized iCalendar text into components.
pub trait CalendarParser: Send + Sync {
    fn parse(&self, text: &str) -> Result<ParsedCalendar, CalendarParseError>;
}

impl CalendarParser for Box<dyn CalendarParser> {
    fn parse(&self, text: &str) -> Result<ParsedCalendar, CalendarParseError> {
        (**self).parse(text)
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ImportError {
    #[error("The file may be corrupt or is not a valid calendar file.")]
    MalformedFormat { detail: String },

    #[error(
        "Failed to parse the calendar due to inconsistent line endings. Please re-export the file and try again."
    )]
    InconsistentLineEndings { detail: String },

    #[error("Failed to parse the calendar file: {0}")]
    Unknown(String),
}

impl ImportError {
    /// Client-side problems with the file, as opposed to unexpected failures.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, ImportError::Unknown(_))
    }
}

/// Maps a parser error onto an import error kind.
pub fn classify_parse_error(err: &CalendarParseError) -> ImportError {
    let message = err.0.as_str();
    if contains_any(message, MALFORMED_MARKERS) {
        ImportError::MalformedFormat {
            detail: message.to_string(),
        }
    } else if contains_any(message, LINE_BREAK_MARKERS) {
        ImportError::InconsistentLineEndings {
            detail: message.to_string(),
        }
    } else {
        ImportError::Unknown(message.to_string())
    }
}

pub struct CalendarImporter<P: CalendarParser> {
    parser: P,
}

impl<P: CalendarParser> CalendarImporter<P> {
    pub fn new(parser: P) -> Self {
        Self { parser }
    }

    /// Normalizes and parses `raw_text`.
    pub fn import(&self, raw_text: &str) -> Result<CalendarImport, ImportError> {
        let normalized = normalize_text(raw_text);

        if normalized.is_empty() {
            tracing::info!("Calendar import received an empty file");
            return Ok(CalendarImport {
                data: ParsedCalendar::new(),
                notice: Some(ImportNotice::EmptyCalendar),
                normalized,
            });
        }

        let data = self.parser.parse(normalized.as_str()).map_err(|err| {
            let classified = classify_parse_error(&err);
            tracing::warn!(
                error = %err,
                kind = ?classified,
                bytes = normalized.as_str().len(),
                "Calendar parse failed"
            );
            classified
        })?;

        let events = data.event_count();
        tracing::info!(
            components = data.len(),
            events,
            "Calendar import parsed"
        );

        let notice = (events == 0).then_some(ImportNotice::NoEvents);
        Ok(CalendarImport {
            data,
            notice,
            normalized,
        })
    }
}
