// Flow catalog.
//
// Every AI operation the app exposes is a `FlowDefinition`: which input fields it
// needs, the prompt template, the output shape it expects back, and what to do
// when the model call fails. Adding a flow means adding a definition here; the
// gateway and the HTTP layer pick it up from the catalog.

use super::models::{FlowResult, OutputShape};
use super::prompt::placeholders;
use chrono::{NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Input preparation hook. Runs after required-field validation and may fill in
/// derived fields. An `Err` rejects the request before the model is called.
pub type PrepareFn = fn(&mut HashMap<String, String>) -> Result<(), String>;

/// Extra validation of parsed output beyond the output shape.
pub type OutputCheckFn = fn(&BTreeMap<String, String>) -> Result<(), String>;

/// What a flow does when the model call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnFailure {
    /// Answer with this text in every output field. Used by conversational
    /// flows, which should never hard-fail in front of the user.
    Fallback(&'static str),
    /// Surface the classified failure to the caller.
    Raise,
}

impl OnFailure {
    pub fn label(&self) -> &'static str {
        match self {
            OnFailure::Fallback(_) => "fallback",
            OnFailure::Raise => "raise",
        }
    }
}

pub struct FlowDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub required_fields: &'static [&'static str],
    pub optional_fields: &'static [&'static str],
    pub output: OutputShape,
    pub template: &'static str,
    pub on_failure: OnFailure,
    /// Input field holding prior conversation, trimmed to the history budget.
    pub history_field: Option<&'static str>,
    pub prepare: Option<PrepareFn>,
    pub output_check: Option<OutputCheckFn>,
}

impl FlowDefinition {
    /// Whether `field` is one of this flow's declared inputs.
    pub fn accepts(&self, field: &str) -> bool {
        self.required_fields.contains(&field) || self.optional_fields.contains(&field)
    }

    /// The result returned under a fallback policy.
    pub fn fallback_result(&self) -> Option<FlowResult> {
        match self.on_failure {
            OnFailure::Fallback(text) => Some(FlowResult::new(
                self.output
                    .fields
                    .iter()
                    .map(|f| (f.to_string(), text.to_string()))
                    .collect(),
            )),
            OnFailure::Raise => None,
        }
    }

    pub fn summary(&self) -> FlowSummary {
        FlowSummary {
            name: self.name,
            description: self.description,
            required_fields: self.required_fields,
            optional_fields: self.optional_fields,
            output_fields: self.output.fields,
            on_failure: self.on_failure.label(),
        }
    }
}

/// Public description of a flow, as listed by the API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowSummary {
    pub name: &'static str,
    pub description: &'static str,
    pub required_fields: &'static [&'static str],
    pub optional_fields: &'static [&'static str],
    pub output_fields: &'static [&'static str],
    pub on_failure: &'static str,
}

// =============================================================================
// PROMPT TEMPLATES
// =============================================================================

const QUOTE_TEMPLATE: &str = "You are an encouraging writing coach. Write one short, original \
motivational quote (at most two sentences) about the topic below. Do not attribute it to \
anyone.\n\nRespond with a JSON object with a single string field \"quote\".\n\nTopic: {{topic}}";

const NEWS_TEMPLATE: &str = "Summarize the following news article in two or three plain \
sentences for a busy reader. Keep names, numbers and dates accurate.\n\nRespond with a JSON \
object with a single string field \"summary\".\n\nHeadline: {{title}}\n\nArticle:\n{{content}}";

const EMAIL_TEMPLATE: &str = "Summarize this email in one or two sentences. Mention any request \
or deadline it contains.\n\nRespond with a JSON object with a single string field \
\"summary\".\n\nFrom: {{sender}}\nSubject: {{subject}}\n\nPreview:\n{{snippet}}";

const GREETING_TEMPLATE: &str = "Write a warm, one-sentence greeting for {{userName}} opening \
their calendar dashboard. Time of day: {{timeOfDay}}. Keep it under 25 words.\n\nRespond with a \
JSON object with a single string field \"greeting\".";

const CHAT_TEMPLATE: &str = "You are FutureSight, a friendly assistant that helps people plan \
their day, manage their calendar and stay focused. Answer the user's latest message concisely, \
using the conversation so far for context.\n\nConversation so far:\n{{chatHistory}}\n\nUser: \
{{prompt}}\n\nRespond with a JSON object with a single string field \"response\".";

const EVENT_TEMPLATE: &str = "Extract a single calendar event from the request below. Today's \
date is {{currentDate}}; resolve relative dates such as \"tomorrow\" or \"next Friday\" against \
it. If no end time is given, assume the event lasts one hour.\n\nRespond with a JSON object with \
the string fields \"title\", \"date\" (YYYY-MM-DD), \"startTime\" (HH:MM, 24-hour) and \
\"endTime\" (HH:MM, 24-hour).\n\nRequest: {{prompt}}";

const CHAT_FALLBACK: &str =
    "Sorry, I'm having trouble responding right now. Please try again in a moment.";
const GREETING_FALLBACK: &str =
    "Welcome back! Sorry, I couldn't prepare a personal greeting right now, but your day is ready.";

// =============================================================================
// FLOW HOOKS
// =============================================================================

/// Fills `currentDate` from `timeZone` (IANA name, default UTC) unless the caller
/// supplied a date already.
fn prepare_event_request(payload: &mut HashMap<String, String>) -> Result<(), String> {
    if let Some(date) = payload.get("currentDate").filter(|d| !d.trim().is_empty()) {
        NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
            .map_err(|_| format!("currentDate must be YYYY-MM-DD, got `{}`", date))?;
        return Ok(());
    }

    let tz: Tz = match payload.get("timeZone").map(|t| t.trim()).filter(|t| !t.is_empty()) {
        Some(name) => name
            .parse()
            .map_err(|_| format!("Unknown time zone `{}`", name))?,
        None => chrono_tz::UTC,
    };

    let today = Utc::now().with_timezone(&tz).format("%Y-%m-%d").to_string();
    payload.insert("currentDate".to_string(), today);
    Ok(())
}

fn check_event_output(fields: &BTreeMap<String, String>) -> Result<(), String> {
    let date = fields.get("date").map(String::as_str).unwrap_or_default();
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| format!("date `{}` is not YYYY-MM-DD", date))?;

    for key in ["startTime", "endTime"] {
        let time = fields.get(key).map(String::as_str).unwrap_or_default();
        NaiveTime::parse_from_str(time, "%H:%M")
            .map_err(|_| format!("{} `{}` is not HH:MM", key, time))?;
    }

    Ok(())
}

// =============================================================================
// CATALOG
// =============================================================================

/// The built-in flows.
pub fn builtin_flows() -> Vec<FlowDefinition> {
    vec![
        FlowDefinition {
            name: "motivational-quote",
            description: "Generate a short motivational quote about a topic",
            required_fields: &["topic"],
            optional_fields: &[],
            output: OutputShape::new(&["quote"]),
            template: QUOTE_TEMPLATE,
            on_failure: OnFailure::Raise,
            history_field: None,
            prepare: None,
            output_check: None,
        },
        FlowDefinition {
            name: "summarize-news",
            description: "Summarize a news article",
            required_fields: &["title", "content"],
            optional_fields: &[],
            output: OutputShape::new(&["summary"]),
            template: NEWS_TEMPLATE,
            on_failure: OnFailure::Raise,
            history_field: None,
            prepare: None,
            output_check: None,
        },
        FlowDefinition {
            name: "summarize-email",
            description: "Summarize an email from its subject and preview",
            required_fields: &["subject", "snippet"],
            optional_fields: &["sender"],
            output: OutputShape::new(&["summary"]),
            template: EMAIL_TEMPLATE,
            on_failure: OnFailure::Raise,
            history_field: None,
            prepare: None,
            output_check: None,
        },
        FlowDefinition {
            name: "greeting",
            description: "Greet the user on the dashboard",
            required_fields: &["userName"],
            optional_fields: &["timeOfDay"],
            output: OutputShape::new(&["greeting"]),
            template: GREETING_TEMPLATE,
            on_failure: OnFailure::Fallback(GREETING_FALLBACK),
            history_field: None,
            prepare: None,
            output_check: None,
        },
        FlowDefinition {
            name: "chat",
            description: "Conversational assistant",
            required_fields: &["prompt"],
            optional_fields: &["chatHistory"],
            output: OutputShape::new(&["response"]),
            template: CHAT_TEMPLATE,
            on_failure: OnFailure::Fallback(CHAT_FALLBACK),
            history_field: Some("chatHistory"),
            prepare: None,
            output_check: None,
        },
        FlowDefinition {
            name: "create-event",
            description: "Turn a natural-language request into a calendar event",
            required_fields: &["prompt"],
            optional_fields: &["currentDate", "timeZone"],
            output: OutputShape::new(&["title", "date", "startTime", "endTime"]),
            template: EVENT_TEMPLATE,
            on_failure: OnFailure::Raise,
            history_field: None,
            prepare: Some(prepare_event_request),
            output_check: Some(check_event_output),
        },
    ]
}

/// Flows by name.
pub struct FlowCatalog {
    flows: Vec<FlowDefinition>,
}

impl FlowCatalog {
    pub fn new(flows: Vec<FlowDefinition>) -> Self {
        for flow in &flows {
            for name in placeholders(flow.template) {
                if !flow.accepts(name) {
                    tracing::warn!(
                        flow = flow.name,
                        placeholder = name,
                        "Prompt template references an undeclared field"
                    );
                }
            }
        }
        Self { flows }
    }

    pub fn builtin() -> Self {
        Self::new(builtin_flows())
    }

    pub fn get(&self, name: &str) -> Option<&FlowDefinition> {
        self.flows.iter().find(|f| f.name == name)
    }

    pub fn summaries(&self) -> Vec<FlowSummary> {
        self.flows.iter().map(FlowDefinition::summary).collect()
    }
}
