// Prompt template rendering.
//
// Templates use `{{field}}` placeholders. Rendering is one left-to-right pass over
// the template: substituted values are copied into the output and never scanned
// again, so a caller who sends `{{topic}}` as text gets that literal text in the
// prompt.

use std::collections::HashMap;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Renders `template`, replacing each `{{name}}` with `values[name]`.
/// Placeholders without a value render as empty text.
pub fn render(template: &str, values: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find(OPEN) {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + OPEN.len()..];

        match after_open.find(CLOSE) {
            Some(end) => {
                let name = after_open[..end].trim();
                if let Some(value) = values.get(name) {
                    out.push_str(value);
                }
                rest = &after_open[end + CLOSE.len()..];
            }
            None => {
                // Unterminated placeholder: keep the remainder as literal text.
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}

/// Lists the placeholder names used in `template`, in order of appearance.
pub fn placeholders(template: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = template;

    while let Some(start) = rest.find(OPEN) {
        let after_open = &rest[start + OPEN.len()..];
        let Some(end) = after_open.find(CLOSE) else {
            break;
        };
        names.push(after_open[..end].trim());
        rest = &after_open[end + CLOSE.len()..];
    }

    names
}
