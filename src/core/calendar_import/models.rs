use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

use super::normalize::NormalizedCalendarText;

/// Component type discriminator, serialized as the iCalendar component name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentKind {
    Event,
    Todo,
    Journal,
    FreeBusy,
    Timezone,
    Other(String),
}

impl ComponentKind {
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_uppercase().as_str() {
            "VEVENT" => ComponentKind::Event,
            "VTODO" => ComponentKind::Todo,
            "VJOURNAL" => ComponentKind::Journal,
            "VFREEBUSY" => ComponentKind::FreeBusy,
            "VTIMEZONE" => ComponentKind::Timezone,
            other => ComponentKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ComponentKind::Event => "VEVENT",
            ComponentKind::Todo => "VTODO",
            ComponentKind::Journal => "VJOURNAL",
            ComponentKind::FreeBusy => "VFREEBUSY",
            ComponentKind::Timezone => "VTIMEZONE",
            ComponentKind::Other(name) => name.as_str(),
        }
    }
}

impl Serialize for ComponentKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A DTSTART/DTEND value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarTime {
    /// ISO-8601 text: `2025-03-04`, `2025-03-04T09:30:00Z` or `2025-03-04T09:30:00`.
    pub value: String,
    pub date_only: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tzid: Option<String>,
}

/// One top-level calendar component.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarComponent {
    #[serde(rename = "type")]
    pub kind: ComponentKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<CalendarTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<CalendarTime>,
    /// Remaining properties by name. Repeated properties are comma-joined.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

impl CalendarComponent {
    pub fn new(kind: ComponentKind) -> Self {
        Self {
            kind,
            uid: None,
            summary: None,
            description: None,
            location: None,
            start: None,
            end: None,
            properties: BTreeMap::new(),
        }
    }

    pub fn is_event(&self) -> bool {
        self.kind == ComponentKind::Event
    }
}

/// Parsed calendar: component identifier -> component.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ParsedCalendar {
    components: BTreeMap<String, CalendarComponent>,
}

impl ParsedCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `component` under `id`, suffixing `#2`, `#3`, ... when the id is
    /// already taken. Returns the id actually used.
    pub fn insert(&mut self, id: String, component: CalendarComponent) -> String {
        let mut key = id.clone();
        let mut n = 2;
        while self.components.contains_key(&key) {
            key = format!("{}#{}", id, n);
            n += 1;
        }
        self.components.insert(key.clone(), component);
        key
    }

    #[allow(dead_code)]
    pub fn get(&self, id: &str) -> Option<&CalendarComponent> {
        self.components.get(id)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn events(&self) -> impl Iterator<Item = &CalendarComponent> {
        self.components.values().filter(|c| c.is_event())
    }

    pub fn event_count(&self) -> usize {
        self.events().count()
    }
}

/// Benign outcomes reported alongside a successful import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportNotice {
    EmptyCalendar,
    NoEvents,
}

impl ImportNotice {
    pub fn message(&self) -> &'static str {
        match self {
            ImportNotice::EmptyCalendar => "The calendar file is empty.",
            ImportNotice::NoEvents => "No importable events were found in the calendar file.",
        }
    }
}

/// A successful import.
#[derive(Debug, Clone)]
pub struct CalendarImport {
    pub data: ParsedCalendar,
    pub notice: Option<ImportNotice>,
    pub normalized: NormalizedCalendarText,
}
