use promptline_protocol::{FollowupOption, PromptReply};
use serde_json::{Value, json};

/// Reply with display text and follow-ups.
pub fn text_reply(text: &str, followups: Vec<FollowupOption>) -> PromptReply {
    PromptReply {
        followups,
        ..PromptReply::text(text)
    }
}

/// Reply carrying a `loans` entity list of `(loan_id, type)` pairs.
pub fn entities_reply(text: &str, entities: &[(i64, &str)]) -> PromptReply {
    let loans = entities
        .iter()
        .map(|(id, label)| json!({ "loan_id": id, "type": label }))
        .collect::<Vec<Value>>();
    PromptReply {
        extra_action: Some(json!({ "loans": loans })),
        ..PromptReply::text(text)
    }
}
