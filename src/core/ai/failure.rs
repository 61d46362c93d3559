//! Classification of failed AI invocations.
//!
//! Providers report errors as free text (HTTP status plus whatever message the
//! vendor sent). This module maps that text onto a small set of kinds, each with
//! a fixed message that is safe to show to end users. The marker lists are an
//! approximation of the vendors' error wording, not a documented contract, so
//! they all live here.

use crate::core::markers::contains_any;
use thiserror::Error;

const RATE_LIMIT_MARKERS: &[&str] = &["429", "quota", "resource has been exhausted"];
const OVERLOAD_MARKERS: &[&str] = &["503", "overloaded"];

/// What went wrong, as far as the caller needs to know.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Quota exhausted or too many requests.
    RateLimited,
    /// Transient overload on the provider side.
    Overloaded,
    /// The model answered, but not in the declared output shape.
    InvalidOutput,
    Unknown,
}

impl FailureKind {
    /// Fixed, user-facing message for this kind.
    pub fn user_message(&self) -> &'static str {
        match self {
            FailureKind::RateLimited => {
                "The AI service has hit its rate limit or quota. Please try again later."
            }
            FailureKind::Overloaded => {
                "The AI model is temporarily overloaded. Please try again shortly."
            }
            FailureKind::InvalidOutput => {
                "The AI model returned an unexpected response. Please try again."
            }
            FailureKind::Unknown => {
                "Something went wrong while contacting the AI model. Please try again."
            }
        }
    }
}

/// A classified failure. `detail` carries the raw provider text for logs and is
/// not part of the `Display` output.
#[derive(Debug, Clone, Error)]
#[error("{}", .kind.user_message())]
pub struct FlowFailure {
    pub kind: FailureKind,
    pub detail: String,
}

impl FlowFailure {
    pub fn new(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    /// Classifies a provider error message.
    pub fn from_provider_error(message: &str) -> Self {
        Self::new(classify(message), message)
    }
}

/// Maps provider error text onto a failure kind. Rate limiting wins when a
/// message carries markers for both.
pub fn classify(message: &str) -> FailureKind {
    if contains_any(message, RATE_LIMIT_MARKERS) {
        FailureKind::RateLimited
    } else if contains_any(message, OVERLOAD_MARKERS) {
        FailureKind::Overloaded
    } else {
        FailureKind::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_markers() {
        assert_eq!(
            classify("Gemini API error (429 Too Many Requests): slow down"),
            FailureKind::RateLimited
        );
        assert_eq!(classify("You exceeded your current QUOTA"), FailureKind::RateLimited);
        assert_eq!(
            classify("Resource has been exhausted (e.g. check quota)."),
            FailureKind::RateLimited
        );
    }

    #[test]
    fn test_overload_markers() {
        assert_eq!(
            classify("Gemini API error (503 Service Unavailable): try later"),
            FailureKind::Overloaded
        );
        assert_eq!(classify("The model is OVERLOADED."), FailureKind::Overloaded);
    }

    #[test]
    fn test_unknown_fallthrough() {
        assert_eq!(classify("error sending request"), FailureKind::Unknown);
        assert_eq!(classify(""), FailureKind::Unknown);
    }

    #[test]
    fn test_display_hides_detail() {
        let failure = FlowFailure::from_provider_error("503 upstream connect error, key=abc");
        assert_eq!(failure.kind, FailureKind::Overloaded);
        assert_eq!(
            failure.to_string(),
            "The AI model is temporarily overloaded. Please try again shortly."
        );
        assert!(!failure.to_string().contains("abc"));
    }
}
