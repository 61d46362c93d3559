pub mod calendar;
pub mod flows;
pub mod health;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::core::ai::{FailureKind, FlowError};

/// Standard API error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(status: StatusCode, error: impl Into<String>) -> Response {
        (
            status,
            Json(ErrorResponse {
                error: error.into(),
            }),
        )
            .into_response()
    }
}

/// HTTP status for a classified failure.
fn failure_status(kind: FailureKind) -> StatusCode {
    match kind {
        FailureKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        FailureKind::Overloaded => StatusCode::SERVICE_UNAVAILABLE,
        FailureKind::InvalidOutput => StatusCode::BAD_GATEWAY,
        FailureKind::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// Failed carries only the fixed per-kind message; the raw provider detail was
// already logged by the gateway.
impl IntoResponse for FlowError {
    fn into_response(self) -> Response {
        let status = match &self {
            FlowError::UnknownFlow(_) => StatusCode::NOT_FOUND,
            FlowError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            FlowError::Failed(failure) => failure_status(failure.kind),
        };
        ErrorResponse::new(status, self.to_string())
    }
}

/// Body text and status for a request body axum could not read as JSON.
pub(crate) fn rejection_parts(rejection: &JsonRejection) -> (StatusCode, String) {
    let status = match rejection.status() {
        StatusCode::PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
        _ => StatusCode::BAD_REQUEST,
    };
    (status, rejection.body_text())
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ai::FlowFailure;

    #[test]
    fn test_flow_error_status_mapping() {
        let cases = [
            (FlowError::UnknownFlow("x".into()), StatusCode::NOT_FOUND),
            (FlowError::InvalidRequest("x".into()), StatusCode::BAD_REQUEST),
            (
                FlowError::Failed(FlowFailure::new(FailureKind::RateLimited, "429")),
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (
                FlowError::Failed(FlowFailure::new(FailureKind::Overloaded, "503")),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                FlowError::Failed(FlowFailure::new(FailureKind::InvalidOutput, "bad json")),
                StatusCode::BAD_GATEWAY,
            ),
            (
                FlowError::Failed(FlowFailure::new(FailureKind::Unknown, "boom")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }
}
