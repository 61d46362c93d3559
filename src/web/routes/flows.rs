//! AI flow endpoints

use std::collections::HashMap;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{Map, Value};

use crate::core::ai::flows::FlowDefinition;
use crate::core::ai::history::history_entry;
use crate::core::ai::{FlowError, FlowRequest, FlowResult, FlowSummary};
use crate::web::routes::{rejection_parts, ErrorResponse};
use crate::web::AppState;

const API_KEY_FIELD: &str = "apiKey";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/flows", get(list_flows))
        .route("/api/flows/{flow}", post(invoke_flow))
}

/// GET /api/flows - List the available flows
async fn list_flows(State(state): State<AppState>) -> Json<Vec<FlowSummary>> {
    Json(state.gateway.catalog().summaries())
}

/// POST /api/flows/{flow} - Run a flow
async fn invoke_flow(
    State(state): State<AppState>,
    Path(flow_name): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<FlowResult>, Response> {
    let Json(body) = body.map_err(|rejection| {
        let (status, message) = rejection_parts(&rejection);
        ErrorResponse::new(status, message)
    })?;

    let flow = state
        .gateway
        .catalog()
        .get(&flow_name)
        .ok_or_else(|| FlowError::UnknownFlow(flow_name.clone()).into_response())?;

    let request = payload_from_json(flow, body).map_err(IntoResponse::into_response)?;

    let result = state
        .gateway
        .invoke(&flow_name, request)
        .await
        .map_err(IntoResponse::into_response)?;

    if let Some(kind) = result.recovered_from {
        tracing::info!(flow = %flow_name, kind = ?kind, "Answered with fallback");
    }

    Ok(Json(result))
}

/// Converts a JSON request body into a `FlowRequest`.
///
/// Declared string fields are taken verbatim and `null` counts as absent. The
/// flow's history field may also be an array of `{role, content}` objects or
/// strings, flattened to one `role: content` entry per message with continuation
/// lines indented. Undeclared fields are ignored.
pub fn payload_from_json(flow: &FlowDefinition, body: Value) -> Result<FlowRequest, FlowError> {
    let Value::Object(body) = body else {
        return Err(FlowError::InvalidRequest(
            "Request body must be a JSON object".to_string(),
        ));
    };

    let api_key = match body.get(API_KEY_FIELD) {
        None | Some(Value::Null) => None,
        Some(Value::String(key)) => Some(key.clone()),
        Some(_) => {
            return Err(FlowError::InvalidRequest(
                "Field `apiKey` must be a string".to_string(),
            ))
        }
    };

    let mut payload = HashMap::new();
    for (field, value) in body {
        if !flow.accepts(&field) {
            continue;
        }
        let text = match value {
            Value::Null => continue,
            Value::String(text) => text,
            Value::Array(entries) if flow.history_field == Some(field.as_str()) => {
                flatten_history(&field, entries)?
            }
            _ => {
                return Err(FlowError::InvalidRequest(format!(
                    "Field `{}` must be a string",
                    field
                )))
            }
        };
        payload.insert(field, text);
    }

    let request = FlowRequest::new(payload);
    Ok(match api_key {
        Some(key) => request.with_api_key(key),
        None => request,
    })
}

fn flatten_history(field: &str, entries: Vec<Value>) -> Result<String, FlowError> {
    let invalid = || {
        FlowError::InvalidRequest(format!(
            "Field `{}` entries must be strings or {{role, content}} objects",
            field
        ))
    };

    let lines = entries
        .into_iter()
        .map(|entry| match entry {
            Value::String(line) => Ok(history_entry(&line)),
            Value::Object(message) => history_line(&message).ok_or_else(invalid),
            _ => Err(invalid()),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(lines.join("\n"))
}

fn history_line(message: &Map<String, Value>) -> Option<String> {
    let role = message.get("role")?.as_str()?;
    let content = message.get("content")?.as_str()?;
    Some(history_entry(&format!("{}: {}", role, content)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ai::FlowCatalog;
    use crate::web::routes::test_support::{app, get, post_json, send};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::json;

    #[tokio::test]
    async fn test_list_flows() {
        let (status, body) = send(app(Ok("{}")), get("/api/flows")).await;
        assert_eq!(status, StatusCode::OK);

        let flows = body.as_array().unwrap();
        assert_eq!(flows.len(), 6);

        let chat = flows.iter().find(|f| f["name"] == "chat").unwrap();
        assert_eq!(chat["onFailure"], "fallback");
        assert_eq!(chat["requiredFields"], json!(["prompt"]));
        assert_eq!(chat["outputFields"], json!(["response"]));

        let event = flows.iter().find(|f| f["name"] == "create-event").unwrap();
        assert_eq!(event["onFailure"], "raise");
    }

    #[tokio::test]
    async fn test_invoke_returns_output_fields() {
        let app = app(Ok(r#"```json
{"quote": "Keep going, one page at a time."}
```"#));
        let (status, body) = send(
            app,
            post_json("/api/flows/motivational-quote", json!({ "topic": "writing" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "quote": "Keep going, one page at a time." }));
    }

    #[tokio::test]
    async fn test_unknown_flow_is_404() {
        let (status, body) =
            send(app(Ok("{}")), post_json("/api/flows/horoscope", json!({}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Unknown flow: horoscope");
    }

    #[tokio::test]
    async fn test_missing_field_is_400() {
        let (status, body) = send(
            app(Ok(r#"{"summary": "x"}"#)),
            post_json("/api/flows/summarize-news", json!({ "title": "Markets", "content": "  " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("content"));
    }

    #[tokio::test]
    async fn test_provider_failures_map_to_status() {
        let cases = [
            ("429 Too Many Requests", StatusCode::TOO_MANY_REQUESTS),
            ("The model is overloaded", StatusCode::SERVICE_UNAVAILABLE),
            ("connection reset by peer", StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (message, expected) in cases {
            let (status, body) = send(
                app(Err(message)),
                post_json("/api/flows/motivational-quote", json!({ "topic": "focus" })),
            )
            .await;
            assert_eq!(status, expected, "{}", message);
            // Raw provider text never reaches the caller.
            assert!(!body["error"].as_str().unwrap().contains(message));
        }
    }

    #[tokio::test]
    async fn test_invalid_output_is_502() {
        let (status, body) = send(
            app(Ok("Sure! Here is a quote for you.")),
            post_json("/api/flows/motivational-quote", json!({ "topic": "focus" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(
            body["error"],
            "The AI model returned an unexpected response. Please try again."
        );
    }

    #[tokio::test]
    async fn test_chat_failure_answers_200() {
        let (status, body) = send(
            app(Err("Resource has been exhausted")),
            post_json(
                "/api/flows/chat",
                json!({ "prompt": "hi", "chatHistory": [{ "role": "user", "content": "hello" }] }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(!body["response"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_body_is_400() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/flows/chat")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(app(Ok("{}")), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[test]
    fn test_payload_flattens_history_and_reads_api_key() {
        let catalog = FlowCatalog::builtin();
        let chat = catalog.get("chat").unwrap();
        let request = payload_from_json(
            chat,
            json!({
                "prompt": "What's next?",
                "apiKey": "user-key",
                "unrelated": 42,
                "chatHistory": [
                    { "role": "user", "content": "Book the dentist" },
                    { "role": "assistant", "content": "Done." },
                    "user: thanks"
                ]
            }),
        )
        .unwrap();

        assert_eq!(request.api_key_override.as_deref(), Some("user-key"));
        assert_eq!(
            request.payload.get("chatHistory").map(String::as_str),
            Some("user: Book the dentist\nassistant: Done.\nuser: thanks")
        );
        assert!(!request.payload.contains_key("unrelated"));
        assert!(!request.payload.contains_key("apiKey"));
    }

    #[test]
    fn test_payload_indents_multiline_history_messages() {
        let catalog = FlowCatalog::builtin();
        let chat = catalog.get("chat").unwrap();
        let request = payload_from_json(
            chat,
            json!({
                "prompt": "Anything else?",
                "chatHistory": [
                    { "role": "user", "content": "Groceries:\nmilk\neggs" },
                    { "role": "assistant", "content": "Added." }
                ]
            }),
        )
        .unwrap();

        assert_eq!(
            request.payload.get("chatHistory").map(String::as_str),
            Some("user: Groceries:\n  milk\n  eggs\nassistant: Added.")
        );
    }

    #[test]
    fn test_payload_rejects_non_string_fields() {
        let catalog = FlowCatalog::builtin();
        let quote = catalog.get("motivational-quote").unwrap();
        assert!(matches!(
            payload_from_json(quote, json!({ "topic": 7 })),
            Err(FlowError::InvalidRequest(_))
        ));
        assert!(matches!(
            payload_from_json(quote, json!(["topic"])),
            Err(FlowError::InvalidRequest(_))
        ));

        let chat = catalog.get("chat").unwrap();
        assert!(matches!(
            payload_from_json(chat, json!({ "prompt": "hi", "chatHistory": [{ "role": "user" }] })),
            Err(FlowError::InvalidRequest(_))
        ));
    }
}
