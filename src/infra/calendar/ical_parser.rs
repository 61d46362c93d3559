//! `CalendarParser` backed by the `icalendar` crate's parser.

use crate::core::calendar_import::{
    CalendarComponent, CalendarParseError, CalendarParser, CalendarTime, ComponentKind,
    ParsedCalendar,
};
use icalendar::{
    parser::{read_calendar, Component, Property},
    CalendarDateTime, DatePerhapsTime,
};

/// Properties lifted into dedicated `CalendarComponent` fields.
const LIFTED: &[&str] = &["UID", "SUMMARY", "DESCRIPTION", "LOCATION", "DTSTART", "DTEND"];

/// TEXT-valued properties whose escapes are undone.
const TEXT_PROPERTIES: &[&str] = &["SUMMARY", "DESCRIPTION", "LOCATION", "COMMENT", "CATEGORIES"];

#[derive(Debug, Default, Clone, Copy)]
pub struct IcalendarParser;

impl IcalendarParser {
    pub fn new() -> Self {
        Self
    }
}

impl CalendarParser for IcalendarParser {
    fn parse(&self, text: &str) -> Result<ParsedCalendar, CalendarParseError> {
        check_line_endings(text)?;
        check_container(text)?;

        // The grammar expects every content line, including the last, to end in CRLF.
        let mut input = text.trim_end().to_string();
        input.push_str("\r\n");

        let calendar = read_calendar(&input).map_err(|e| CalendarParseError(e.to_string()))?;

        // Flatten the VCALENDAR wrapper so its children become top-level entries.
        let mut flattened: Vec<&Component> = Vec::new();
        for component in &calendar.components {
            if component.name.as_ref().eq_ignore_ascii_case("VCALENDAR") {
                flattened.extend(component.components.iter());
            } else {
                flattened.push(component);
            }
        }

        let mut parsed = ParsedCalendar::new();
        for (index, component) in flattened.into_iter().enumerate() {
            let converted = convert_component(component);
            let id = component_id(component, &converted.kind, index);
            parsed.insert(id, converted);
        }

        Ok(parsed)
    }
}

fn check_container(text: &str) -> Result<(), CalendarParseError> {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());

    let first = lines.next().unwrap_or_default();
    if !first.eq_ignore_ascii_case("BEGIN:VCALENDAR") {
        return Err(CalendarParseError(
            "Invalid calendar container: expected BEGIN:VCALENDAR".to_string(),
        ));
    }

    let last = lines.last().unwrap_or_default();
    if !last.eq_ignore_ascii_case("END:VCALENDAR") {
        return Err(CalendarParseError(
            "Invalid calendar container: missing END:VCALENDAR".to_string(),
        ));
    }

    Ok(())
}

/// Rejects text that mixes CRLF with bare CR or LF.
fn check_line_endings(text: &str) -> Result<(), CalendarParseError> {
    let crlf = text.matches("\r\n").count();
    let bare_cr = text.matches('\r').count() - crlf;
    let bare_lf = text.matches('\n').count() - crlf;

    let styles = [crlf, bare_cr, bare_lf].iter().filter(|n| **n > 0).count();
    if styles > 1 {
        return Err(CalendarParseError(format!(
            "Unable to detect line breaks: found {} CRLF, {} CR and {} LF",
            crlf, bare_cr, bare_lf
        )));
    }
    Ok(())
}

fn component_id(component: &Component, kind: &ComponentKind, index: usize) -> String {
    ["UID", "TZID"]
        .iter()
        .filter_map(|name| component.find_prop(name))
        .map(|p| p.val.as_ref().trim().to_string())
        .find(|v| !v.is_empty())
        .unwrap_or_else(|| format!("{}-{}", kind.as_str(), index).to_ascii_lowercase())
}

fn convert_component(component: &Component) -> CalendarComponent {
    let mut converted = CalendarComponent::new(ComponentKind::from_name(component.name.as_ref()));

    let text = |name: &str| component.find_prop(name).map(property_text);
    converted.uid = text("UID");
    converted.summary = text("SUMMARY");
    converted.description = text("DESCRIPTION");
    converted.location = text("LOCATION");
    converted.start = component.find_prop("DTSTART").and_then(to_calendar_time);
    converted.end = component.find_prop("DTEND").and_then(to_calendar_time);

    for property in &component.properties {
        let name = property.name.as_ref().to_ascii_uppercase();
        if LIFTED.contains(&name.as_str()) {
            continue;
        }
        let value = property_text(property);
        converted
            .properties
            .entry(name)
            .and_modify(|existing| {
                existing.push(',');
                existing.push_str(&value);
            })
            .or_insert(value);
    }

    // Times that failed to convert are kept verbatim rather than dropped.
    for (name, time) in [("DTSTART", &converted.start), ("DTEND", &converted.end)] {
        if time.is_none() {
            if let Some(raw) = component.find_prop(name) {
                converted
                    .properties
                    .insert(name.to_string(), raw.val.as_ref().to_string());
            }
        }
    }

    converted
}

fn property_text(property: &Property) -> String {
    let raw = property.val.as_ref();
    let name = property.name.as_ref().to_ascii_uppercase();
    if TEXT_PROPERTIES.contains(&name.as_str()) {
        unescape_text(raw)
    } else {
        raw.to_string()
    }
}

/// Undoes iCalendar TEXT escaping: `\n`/`\N`, `\,`, `\;` and `\\`.
fn unescape_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(escaped @ (',' | ';' | '\\')) => out.push(escaped),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn to_calendar_time(property: &Property) -> Option<CalendarTime> {
    let time = match DatePerhapsTime::try_from(property).ok()? {
        DatePerhapsTime::Date(date) => CalendarTime {
            value: date.format("%Y-%m-%d").to_string(),
            date_only: true,
            tzid: None,
        },
        DatePerhapsTime::DateTime(CalendarDateTime::Utc(dt)) => CalendarTime {
            value: dt.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            date_only: false,
            tzid: None,
        },
        DatePerhapsTime::DateTime(CalendarDateTime::Floating(naive)) => CalendarTime {
            value: naive.format("%Y-%m-%dT%H:%M:%S").to_string(),
            date_only: false,
            tzid: None,
        },
        DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { date_time, tzid }) => {
            CalendarTime {
                value: date_time.format("%Y-%m-%dT%H:%M:%S").to_string(),
                date_only: false,
                tzid: Some(tzid),
            }
        }
    };
    Some(time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::calendar_import::{CalendarImporter, ImportError, ImportNotice};

    const ONE_EVENT: &str = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:-//FutureSight//Test//EN\r\n\
BEGIN:VEVENT\r\n\
UID:standup-1@example.com\r\n\
DTSTAMP:20250301T080000Z\r\n\
DTSTART:20250304T093000Z\r\n\
DTEND:20250304T094500Z\r\n\
SUMMARY:Daily standup\\, team A\r\n\
DESCRIPTION:Line one\\nLine two\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

    #[test]
    fn test_parses_single_event() {
        let parsed = IcalendarParser::new().parse(ONE_EVENT).unwrap();

        assert_eq!(parsed.len(), 1);
        let event = parsed.get("standup-1@example.com").unwrap();
        assert!(event.is_event());
        assert_eq!(event.summary.as_deref(), Some("Daily standup, team A"));
        assert_eq!(event.description.as_deref(), Some("Line one\nLine two"));

        let start = event.start.as_ref().unwrap();
        assert_eq!(start.value, "2025-03-04T09:30:00Z");
        assert!(!start.date_only);
        assert_eq!(event.end.as_ref().unwrap().value, "2025-03-04T09:45:00Z");
        assert_eq!(
            event.properties.get("DTSTAMP").map(String::as_str),
            Some("20250301T080000Z")
        );
    }

    #[test]
    fn test_all_day_event_and_generated_ids() {
        let text = "BEGIN:VCALENDAR\r\n\
BEGIN:VEVENT\r\n\
DTSTART;VALUE=DATE:20250310\r\n\
SUMMARY:Holiday\r\n\
END:VEVENT\r\n\
BEGIN:VTODO\r\n\
SUMMARY:Pack\r\n\
END:VTODO\r\n\
END:VCALENDAR";
        let parsed = IcalendarParser::new().parse(text).unwrap();

        let holiday = parsed.get("vevent-0").unwrap();
        let start = holiday.start.as_ref().unwrap();
        assert_eq!(start.value, "2025-03-10");
        assert!(start.date_only);
        assert_eq!(parsed.get("vtodo-1").unwrap().kind, ComponentKind::Todo);
    }

    #[test]
    fn test_rejects_missing_container() {
        let err = IcalendarParser::new()
            .parse("this is not a calendar at all")
            .unwrap_err();
        assert!(err.0.starts_with("Invalid calendar container"));

        let err = IcalendarParser::new()
            .parse("BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nEND:VEVENT")
            .unwrap_err();
        assert!(err.0.contains("END:VCALENDAR"));
    }

    #[test]
    fn test_rejects_mixed_line_endings() {
        let err = IcalendarParser::new()
            .parse("BEGIN:VCALENDAR\r\nVERSION:2.0\nEND:VCALENDAR")
            .unwrap_err();
        assert!(err.0.starts_with("Unable to detect line breaks"));
    }

    #[test]
    fn test_unescape_text() {
        assert_eq!(unescape_text(r"a\,b\;c\\d\Ne"), "a,b;c\\d\ne");
        assert_eq!(unescape_text(r"trailing\"), "trailing\\");
        assert_eq!(unescape_text(r"keep\x"), "keep\\x");
    }

    // ===== Through the importer =====

    #[test]
    fn test_import_folded_lf_file() {
        let importer = CalendarImporter::new(IcalendarParser::new());
        let text = "BEGIN:VCALENDAR\n\
BEGIN:VEVENT\n\
UID:folded-1\n\
DTSTART:20250304T093000Z\n\
SUMMARY:Quarterly planning with the\n  whole team\n\
END:VEVENT\n\
END:VCALENDAR\n";

        let import = importer.import(text).unwrap();
        assert_eq!(import.notice, None);
        assert_eq!(
            import.data.get("folded-1").unwrap().summary.as_deref(),
            Some("Quarterly planning with the whole team")
        );
    }

    #[test]
    fn test_import_bom_is_equivalent() {
        let importer = CalendarImporter::new(IcalendarParser::new());
        let plain = importer.import(ONE_EVENT).unwrap();
        let with_bom = importer.import(&format!("\u{feff}{}", ONE_EVENT)).unwrap();
        assert_eq!(plain.data, with_bom.data);
    }

    #[test]
    fn test_import_calendar_without_events() {
        let importer = CalendarImporter::new(IcalendarParser::new());
        let import = importer
            .import("BEGIN:VCALENDAR\r\nVERSION:2.0\r\nBEGIN:VTODO\r\nUID:todo-1\r\nSUMMARY:Pack\r\nEND:VTODO\r\nEND:VCALENDAR\r\n")
            .unwrap();

        assert_eq!(import.notice, Some(ImportNotice::NoEvents));
        assert_eq!(import.data.len(), 1);
        assert!(import.data.get("todo-1").is_some());
    }

    #[test]
    fn test_import_garbage_is_malformed() {
        let importer = CalendarImporter::new(IcalendarParser::new());
        let err = importer.import("Dear team, see you at 10.").unwrap_err();
        assert!(matches!(err, ImportError::MalformedFormat { .. }));
    }
}
