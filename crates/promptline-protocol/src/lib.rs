//! Wire protocol types for the prompt endpoint: envelopes, follow-ups, and
//! form field specifications.

mod envelope;
mod field;

pub use envelope::{
    FreeTextReply, GENERIC_FAILURE_MESSAGE, PromptData, PromptEnvelope, PromptReply,
    display_string,
};
pub use field::{EnumOption, EnumSource, FieldKind, FieldSpec};

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Identifier of a prompt node in the server-owned prompt graph.
pub type PromptId = i64;

/// Wire value of the sentinel follow-up id that returns to the root prompt.
pub const BACK_SENTINEL: &str = "back";

/// Identifier carried by a follow-up option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawFollowupId", into = "RawFollowupId")]
pub enum FollowupId {
    /// Re-query the given prompt.
    Prompt(PromptId),
    /// Return to the root prompt.
    Back,
}

impl fmt::Display for FollowupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FollowupId::Prompt(id) => write!(f, "{id}"),
            FollowupId::Back => f.write_str(BACK_SENTINEL),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawFollowupId {
    Number(PromptId),
    Text(String),
}

impl TryFrom<RawFollowupId> for FollowupId {
    type Error = String;

    fn try_from(raw: RawFollowupId) -> Result<Self, Self::Error> {
        match raw {
            RawFollowupId::Number(id) => Ok(FollowupId::Prompt(id)),
            RawFollowupId::Text(text) => {
                let trimmed = text.trim();
                if trimmed.eq_ignore_ascii_case(BACK_SENTINEL) {
                    return Ok(FollowupId::Back);
                }
                trimmed
                    .parse::<PromptId>()
                    .map(FollowupId::Prompt)
                    .map_err(|_| format!("invalid follow-up id: {text}"))
            }
        }
    }
}

impl From<FollowupId> for RawFollowupId {
    fn from(id: FollowupId) -> Self {
        match id {
            FollowupId::Prompt(id) => RawFollowupId::Number(id),
            FollowupId::Back => RawFollowupId::Text(BACK_SENTINEL.to_string()),
        }
    }
}

/// Dispatch verb attached to a follow-up.
///
/// The wire accepts the conversational names (`query`, `update`, `create`)
/// and the HTTP verbs they map to (`GET`, `PUT`, `POST`). Anything else is
/// treated as a plain query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptMethod {
    /// Read-only re-query (GET).
    #[default]
    Query,
    /// Update an existing record (PUT).
    Update,
    /// Create a new record (POST).
    Create,
}

impl PromptMethod {
    /// Parse a wire method name, falling back to `Query`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "update" | "put" => PromptMethod::Update,
            "create" | "post" => PromptMethod::Create,
            _ => PromptMethod::Query,
        }
    }

    /// Return the conversational name of the method.
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptMethod::Query => "query",
            PromptMethod::Update => "update",
            PromptMethod::Create => "create",
        }
    }

    /// Whether requests with this method carry a JSON body.
    pub fn is_mutating(&self) -> bool {
        !matches!(self, PromptMethod::Query)
    }
}

impl<'de> Deserialize<'de> for PromptMethod {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(value.as_deref().map(PromptMethod::parse).unwrap_or_default())
    }
}

/// Selectable continuation of the current prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowupOption {
    /// Prompt to re-query, or the back sentinel.
    #[serde(rename = "promptId")]
    pub id: FollowupId,
    /// Display label; may embed bracketed field names.
    #[serde(default)]
    pub text: String,
    /// Dispatch verb for this action.
    #[serde(rename = "httpRequestType", default)]
    pub method: PromptMethod,
    /// Explicit field list for creation-style actions.
    #[serde(
        rename = "fieldsToAdd",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub fields_to_add: Option<Vec<FieldSpec>>,
}

impl FollowupOption {
    /// Build a plain query follow-up.
    pub fn query(prompt_id: PromptId, text: impl Into<String>) -> Self {
        Self {
            id: FollowupId::Prompt(prompt_id),
            text: text.into(),
            method: PromptMethod::Query,
            fields_to_add: None,
        }
    }

    /// Build a back follow-up.
    pub fn back(text: impl Into<String>) -> Self {
        Self {
            id: FollowupId::Back,
            text: text.into(),
            method: PromptMethod::Query,
            fields_to_add: None,
        }
    }

    /// Override the method of this follow-up.
    pub fn with_method(mut self, method: PromptMethod) -> Self {
        self.method = method;
        self
    }

    /// Attach an explicit field list.
    pub fn with_fields(mut self, fields: Vec<FieldSpec>) -> Self {
        self.fields_to_add = Some(fields);
        self
    }
}
