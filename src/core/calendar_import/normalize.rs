//! iCalendar text normalization.
//!
//! Calendar exports arrive with a byte-order mark, with LF or CR line endings,
//! or with a mix of all three. Content lines may also be folded (RFC 5545
//! §3.1): a long line is split by CRLF followed by one space or tab. All of this
//! is repaired here, before any field-level parsing, because a value folded in
//! the middle of a token would otherwise read as two properties.

const BOM: char = '\u{feff}';

/// Calendar text with CRLF-only line endings and all folds resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedCalendarText(String);

impl NormalizedCalendarText {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Normalizes raw calendar text.
///
/// Steps, in order: strip the BOM, map CR, LF and CRLF to CRLF, unfold
/// continuation lines, trim. The output is a fixed point: normalizing it again
/// returns it unchanged.
pub fn normalize_text(raw: &str) -> NormalizedCalendarText {
    let text = raw.trim_start_matches(BOM);

    let mut out = String::with_capacity(text.len() + text.len() / 32);
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push_str("\r\n");
            }
            '\n' => out.push_str("\r\n"),
            ' ' | '\t' if out.ends_with("\r\n") => {
                // Folded continuation: drop the line break and this one
                // whitespace character. Checking the output rather than the input
                // also resolves breaks exposed by an earlier unfold.
                out.truncate(out.len() - 2);
            }
            other => out.push(other),
        }
    }

    let trimmed = out.trim_matches(|c: char| c.is_whitespace() || c == BOM);
    NormalizedCalendarText(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_and_blank() {
        assert!(normalize_text("").is_empty());
        assert!(normalize_text(" \r\n\t\n ").is_empty());
        assert!(normalize_text("\u{feff}").is_empty());
    }

    #[test]
    fn test_line_endings_become_crlf() {
        let normalized = normalize_text("A:1\nB:2\rC:3\r\nD:4");
        assert_eq!(normalized.as_str(), "A:1\r\nB:2\r\nC:3\r\nD:4");
    }

    #[test]
    fn test_bom_is_stripped() {
        let with_bom = normalize_text("\u{feff}BEGIN:VCALENDAR\nEND:VCALENDAR\n");
        let without = normalize_text("BEGIN:VCALENDAR\nEND:VCALENDAR\n");
        assert_eq!(with_bom, without);
        assert_eq!(without.as_str(), "BEGIN:VCALENDAR\r\nEND:VCALENDAR");
    }

    #[test]
    fn test_folded_lines_are_joined() {
        let normalized = normalize_text("DESCRIPTION:This is a lo\r\n ng description\r\n\tthat wraps\r\nUID:1");
        assert_eq!(
            normalized.as_str(),
            "DESCRIPTION:This is a long descriptionthat wraps\r\nUID:1"
        );
    }

    #[test]
    fn test_folds_with_bare_line_endings() {
        let normalized = normalize_text("SUMMARY:Team\n  sync\rUID:2");
        // One whitespace character belongs to the fold; the second is content.
        assert_eq!(normalized.as_str(), "SUMMARY:Team sync\r\nUID:2");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "\u{feff}\u{feff}BEGIN:VCALENDAR\r\n\r\n \tX:1\n",
            " \u{feff}A:1\rB:2\n\n",
            "SUMMARY:x\r\n\r\n\r\n y",
            "plain text",
        ];
        for input in inputs {
            let once = normalize_text(input);
            let twice = normalize_text(once.as_str());
            assert_eq!(once, twice, "input: {:?}", input);
            assert!(!once.as_str().contains("\r\n "));
            assert!(!once.as_str().contains("\r\n\t"));
            assert!(!once.as_str().replace("\r\n", "").contains(['\r', '\n']));
        }
    }
}
