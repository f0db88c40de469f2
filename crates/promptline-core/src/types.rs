//! Core data types shared across the engine API.

use chrono::{DateTime, Utc};
use promptline_config::SelectionConfig;
use promptline_protocol::{FollowupOption, display_string};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Unique identifier for a conversation.
pub type ConversationId = Uuid;

/// Lifecycle state of a conversation surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Surface is closed; nothing is held.
    #[default]
    Closed,
    /// Surface is open but the root prompt has not been requested yet.
    Empty,
    /// Surface is open and the root prompt has been requested.
    Populated,
}

/// Author of a turn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// Server-authored turn.
    Bot,
    /// User-authored turn.
    User,
}

impl Sender {
    /// Return the sender as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::Bot => "bot",
            Sender::User => "user",
        }
    }
}

/// Entity the user can pick to set the selection context.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelectableEntity {
    /// Numeric id merged into later requests.
    pub id: i64,
    /// Display label.
    pub label: String,
}

/// Structured payload attached to a bot turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ExtraAction {
    /// A list of entities the user can select.
    SelectableEntities(Vec<SelectableEntity>),
    /// Opaque data rendered as a key/value dump.
    Details(Value),
}

impl ExtraAction {
    /// Classify a raw extra action payload.
    ///
    /// The first configured list key holding an array turns the payload into
    /// selectable entities; entries without a numeric id are skipped.
    pub fn classify(value: Value, keys: &SelectionConfig) -> Self {
        let list = keys
            .list_keys
            .iter()
            .find_map(|key| value.get(key).and_then(Value::as_array));
        let Some(list) = list else {
            return ExtraAction::Details(value);
        };
        let entities = list
            .iter()
            .filter_map(|entry| {
                let id = entry.get(&keys.id_key).and_then(entity_id)?;
                let label = entry
                    .get(&keys.label_key)
                    .map(display_string)
                    .filter(|label| !label.is_empty())
                    .unwrap_or_else(|| id.to_string());
                Some(SelectableEntity { id, label })
            })
            .collect();
        ExtraAction::SelectableEntities(entities)
    }

    /// Flatten a details payload into display lines.
    pub fn detail_lines(&self) -> Vec<(String, String)> {
        match self {
            ExtraAction::SelectableEntities(_) => Vec::new(),
            ExtraAction::Details(Value::Object(map)) => map
                .iter()
                .map(|(key, value)| (key.clone(), display_string(value)))
                .collect(),
            ExtraAction::Details(other) => vec![(String::new(), display_string(other))],
        }
    }
}

fn entity_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// One message in the conversation transcript.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Turn {
    /// Unique turn id.
    pub id: Uuid,
    /// Conversation owning this turn.
    pub conversation_id: ConversationId,
    /// Author of the turn.
    pub sender: Sender,
    /// Display text.
    pub text: String,
    /// Follow-up choices offered by this turn.
    #[serde(default)]
    pub options: Vec<FollowupOption>,
    /// Optional structured payload.
    #[serde(default)]
    pub extra_action: Option<ExtraAction>,
    /// Opaque intent tag passed through from the server.
    #[serde(default)]
    pub intent: Option<Value>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Turn {
    fn new(conversation_id: ConversationId, sender: Sender, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            conversation_id,
            sender,
            text: text.into(),
            options: Vec::new(),
            extra_action: None,
            intent: None,
            created_at: Utc::now(),
        }
    }

    /// Build a bot turn.
    pub fn bot(conversation_id: ConversationId, text: impl Into<String>) -> Self {
        Self::new(conversation_id, Sender::Bot, text)
    }

    /// Build a user turn.
    pub fn user(conversation_id: ConversationId, text: impl Into<String>) -> Self {
        Self::new(conversation_id, Sender::User, text)
    }

    pub fn with_options(mut self, options: Vec<FollowupOption>) -> Self {
        self.options = options;
        self
    }

    pub fn with_extra_action(mut self, extra_action: Option<ExtraAction>) -> Self {
        self.extra_action = extra_action;
        self
    }

    pub fn with_intent(mut self, intent: Option<Value>) -> Self {
        self.intent = intent;
        self
    }

    /// Selectable entities carried by this turn, if any.
    pub fn entities(&self) -> &[SelectableEntity] {
        match &self.extra_action {
            Some(ExtraAction::SelectableEntities(entities)) => entities,
            _ => &[],
        }
    }
}
