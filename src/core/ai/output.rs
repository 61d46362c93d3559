// Structured output validation.
//
// Models are asked for a JSON object, but they do not always answer with bare
// JSON: code fences and a sentence of preamble are common. We cut out the
// outermost `{...}` and check it against the flow's output shape. Anything that
// does not satisfy the shape is rejected whole; there are no partial results.

use super::models::OutputShape;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum OutputError {
    #[error("model returned an empty response")]
    Empty,

    #[error("model response does not contain a JSON object")]
    NoObject,

    #[error("model response is not valid JSON: {0}")]
    Malformed(String),

    #[error("model response is missing field `{0}`")]
    MissingField(String),

    #[error("model response field `{0}` is not a non-empty string")]
    InvalidField(String),
}

/// Parses `content` into the fields declared by `shape`.
///
/// Each declared field must be a string that is non-empty after trimming.
/// Fields the shape does not declare are dropped.
pub fn parse_output(
    content: &str,
    shape: &OutputShape,
) -> Result<BTreeMap<String, String>, OutputError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(OutputError::Empty);
    }

    let object_text = extract_object(trimmed).ok_or(OutputError::NoObject)?;
    let value: Value =
        serde_json::from_str(object_text).map_err(|e| OutputError::Malformed(e.to_string()))?;
    let object = value.as_object().ok_or(OutputError::NoObject)?;

    let mut fields = BTreeMap::new();
    for &name in shape.fields {
        let raw = object
            .get(name)
            .ok_or_else(|| OutputError::MissingField(name.to_string()))?;
        let text = raw
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| OutputError::InvalidField(name.to_string()))?;
        fields.insert(name.to_string(), text.to_string());
    }

    Ok(fields)
}

/// Returns the slice from the first `{` to the last `}`, if any.
fn extract_object(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end > start {
        Some(&content[start..=end])
    } else {
        None
    }
}
