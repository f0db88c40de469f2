//! Classification of follow-up options into session actions.

use promptline_protocol::{FieldSpec, FollowupId, FollowupOption, PromptId, PromptMethod};
use regex::Regex;
use std::sync::LazyLock;

static BRACKETS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]*)\]").expect("bracket pattern is valid"));

/// What the session does with a selected follow-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowupAction {
    /// Collect input first, then submit it to `prompt_id`.
    ShowForm {
        fields: Vec<FieldSpec>,
        prompt_id: PromptId,
        prompt_text: String,
        method: PromptMethod,
    },
    /// Clear the transcript and re-issue the root prompt.
    Reset,
    /// Re-issue the prompt endpoint right away.
    Dispatch {
        prompt_id: PromptId,
        method: PromptMethod,
    },
}

/// Classify a follow-up option.
///
/// A back option always resets. `update` always shows a form, even when no
/// bracket segment names any field; `create` shows one only when it carries
/// an explicit field list.
pub fn classify(option: &FollowupOption) -> FollowupAction {
    let prompt_id = match option.id {
        FollowupId::Back => return FollowupAction::Reset,
        FollowupId::Prompt(prompt_id) => prompt_id,
    };
    let fields = match (option.method, &option.fields_to_add) {
        (PromptMethod::Update, _) => Some(
            bracket_fields(&option.text)
                .into_iter()
                .map(FieldSpec::text)
                .collect(),
        ),
        (PromptMethod::Create, Some(fields)) => Some(fields.clone()),
        _ => None,
    };
    match fields {
        Some(fields) => FollowupAction::ShowForm {
            fields,
            prompt_id,
            prompt_text: form_title(&option.text),
            method: option.method,
        },
        None => FollowupAction::Dispatch {
            prompt_id,
            method: option.method,
        },
    }
}

/// Field names listed in the first `[a/b/c]` segment of `text`.
pub fn bracket_fields(text: &str) -> Vec<String> {
    let Some(segment) = BRACKETS.captures(text).and_then(|caps| caps.get(1)) else {
        return Vec::new();
    };
    segment
        .as_str()
        .split('/')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

fn form_title(text: &str) -> String {
    match text.find('[') {
        Some(start) if text[start..].contains(']') => text[..start].trim().to_string(),
        _ => text.trim().to_string(),
    }
}
