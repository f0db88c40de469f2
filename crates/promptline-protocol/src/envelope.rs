//! Response envelopes returned by the prompt and free-text endpoints.

use crate::FollowupOption;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message used when a failure envelope carries no usable detail.
pub const GENERIC_FAILURE_MESSAGE: &str = "Request failed. Please try again.";

/// Top-level envelope wrapping every prompt endpoint response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptEnvelope {
    /// Whether the server handled the request.
    pub success: bool,
    /// Prompt payload on success, structured error fields on failure.
    #[serde(default)]
    pub data: Option<Value>,
    /// Optional top-level message.
    #[serde(default)]
    pub message: Option<Value>,
}

impl PromptEnvelope {
    /// Build a human-readable message for a failure envelope.
    ///
    /// Structured `data` fields win over the top-level `message`; both fall
    /// back to [`GENERIC_FAILURE_MESSAGE`].
    pub fn failure_message(&self) -> String {
        if let Some(Value::Object(fields)) = &self.data {
            let parts = fields
                .iter()
                .map(|(key, value)| format!("{key}: {}", display_string(value)))
                .collect::<Vec<_>>();
            if !parts.is_empty() {
                return parts.join(", ");
            }
        }
        if let Some(message) = &self.message {
            let message = display_string(message);
            if !message.trim().is_empty() {
                return message;
            }
        }
        GENERIC_FAILURE_MESSAGE.to_string()
    }
}

/// Prompt payload carried by a success envelope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptData {
    /// Primary prompt text; not always a string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_prompt_text: Option<Value>,
    /// Response text, used when there is no main prompt text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_text: Option<Value>,
    /// Follow-up choices for the prompt.
    #[serde(default)]
    pub followups: Option<Vec<FollowupOption>>,
    /// Optional structured payload (e.g. a selectable entity list).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_action: Option<Value>,
    /// Opaque intent tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<Value>,
}

/// Parsed success reply of the prompt endpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromptReply {
    /// Text to display for the prompt.
    pub display_text: String,
    /// Response text, when the server sent one.
    pub response_text: Option<String>,
    /// Follow-up choices.
    pub followups: Vec<FollowupOption>,
    /// Raw extra action payload.
    pub extra_action: Option<Value>,
    /// Opaque intent tag.
    pub intent: Option<Value>,
}

impl PromptReply {
    /// Build a reply with display text only.
    pub fn text(display_text: impl Into<String>) -> Self {
        Self {
            display_text: display_text.into(),
            ..Self::default()
        }
    }
}

impl From<PromptData> for PromptReply {
    fn from(data: PromptData) -> Self {
        let main = non_null(data.main_prompt_text).map(|value| display_string(&value));
        let response = non_null(data.response_text).map(|value| display_string(&value));
        Self {
            display_text: main.or_else(|| response.clone()).unwrap_or_default(),
            response_text: response,
            followups: data.followups.unwrap_or_default(),
            extra_action: non_null(data.extra_action),
            intent: non_null(data.intent),
        }
    }
}

/// Reply of the free-text endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeTextReply {
    /// Answer; non-string values are shown as JSON text.
    #[serde(default)]
    pub response: Option<Value>,
    /// Fallback message when no answer is present.
    #[serde(default)]
    pub message: Option<String>,
    /// Identifier of the stored query, used for exports.
    #[serde(default)]
    pub query_id: Option<Value>,
}

impl FreeTextReply {
    /// Text to display for the reply.
    pub fn display_text(&self) -> String {
        non_null(self.response.clone())
            .map(|value| display_string(&value))
            .or_else(|| self.message.clone())
            .unwrap_or_default()
    }

    /// Query id as a path segment, if present.
    pub fn query_id(&self) -> Option<String> {
        non_null(self.query_id.clone()).map(|value| display_string(&value))
    }
}

/// Render a JSON value as display text.
///
/// Strings are used as-is, `null` is empty, and any other value is
/// serialized to its JSON text.
pub fn display_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn non_null(value: Option<Value>) -> Option<Value> {
    value.filter(|value| !value.is_null())
}
