//! Calendar import endpoint

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::core::calendar_import::{ImportError, ParsedCalendar};
use crate::web::routes::rejection_parts;
use crate::web::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/calendar/import", post(import_calendar))
}

/// Request body for importing a calendar file
#[derive(Deserialize)]
pub struct ImportRequest {
    #[serde(rename = "icsContent")]
    pub ics_content: Option<String>,
}

/// Import outcome. `data` is present on success, `message` on notices and errors.
#[derive(Serialize)]
pub struct ImportResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ParsedCalendar>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ImportResponse {
    fn failure(status: StatusCode, message: impl Into<String>) -> Response {
        (
            status,
            Json(ImportResponse {
                success: false,
                data: None,
                message: Some(message.into()),
            }),
        )
            .into_response()
    }
}

impl IntoResponse for ImportError {
    fn into_response(self) -> Response {
        let status = if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        ImportResponse::failure(status, self.to_string())
    }
}

/// POST /api/calendar/import - Normalize and parse an .ics file
async fn import_calendar(
    State(state): State<AppState>,
    body: Result<Json<ImportRequest>, JsonRejection>,
) -> Result<Json<ImportResponse>, Response> {
    let Json(request) = body.map_err(|rejection| {
        let (status, message) = rejection_parts(&rejection);
        ImportResponse::failure(status, message)
    })?;

    let ics_content = request.ics_content.ok_or_else(|| {
        ImportResponse::failure(StatusCode::BAD_REQUEST, "Missing required field `icsContent`")
    })?;

    let raw_bytes = ics_content.len();
    // Parsing is CPU-bound and bodies can be several megabytes.
    let importer = state.importer.clone();
    let import = tokio::task::spawn_blocking(move || importer.import(&ics_content))
        .await
        .map_err(|e| {
            tracing::error!("Calendar import task failed: {}", e);
            ImportError::Unknown("the import task did not complete".to_string())
        })
        .and_then(|result| result)
        .map_err(IntoResponse::into_response)?;

    tracing::debug!(
        raw_bytes,
        normalized_bytes = import.normalized.as_str().len(),
        notice = ?import.notice,
        "Calendar import succeeded"
    );

    Ok(Json(ImportResponse {
        success: true,
        data: Some(import.data),
        message: import.notice.map(|n| n.message().to_string()),
    }))
}
