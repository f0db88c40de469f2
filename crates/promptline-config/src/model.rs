//! Configuration schema for Promptline.

use promptline_protocol::{EnumOption, PromptId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Root config for the Promptline engine and client.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PromptlineConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub conversation: ConversationConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub forms: FormsConfig,
}

impl PromptlineConfig {
    /// Start building a config programmatically with defaults applied.
    pub fn builder() -> PromptlineConfigBuilder {
        PromptlineConfigBuilder::new()
    }
}

/// Builder for assembling a `PromptlineConfig` in code.
#[derive(Debug, Default, Clone)]
pub struct PromptlineConfigBuilder {
    config: PromptlineConfig,
}

impl PromptlineConfigBuilder {
    /// Create a new builder seeded with default config values.
    pub fn new() -> Self {
        Self {
            config: PromptlineConfig::default(),
        }
    }

    /// Replace the backend endpoint configuration.
    pub fn backend(mut self, backend: BackendConfig) -> Self {
        self.config.backend = backend;
        self
    }

    /// Point the backend at a different base URL, keeping the paths.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.backend.base_url = base_url.into();
        self
    }

    /// Replace the conversation configuration.
    pub fn conversation(mut self, conversation: ConversationConfig) -> Self {
        self.config.conversation = conversation;
        self
    }

    /// Replace the selectable entity configuration.
    pub fn selection(mut self, selection: SelectionConfig) -> Self {
        self.config.selection = selection;
        self
    }

    /// Replace the form configuration.
    pub fn forms(mut self, forms: FormsConfig) -> Self {
        self.config.forms = forms;
        self
    }

    /// Finalize and return the built `PromptlineConfig`.
    pub fn build(self) -> PromptlineConfig {
        self.config
    }
}

/// Backend endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_prompt_path")]
    pub prompt_path: String,
    #[serde(default = "default_free_text_path")]
    pub free_text_path: String,
    #[serde(default = "default_export_path")]
    pub export_path: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            prompt_path: default_prompt_path(),
            free_text_path: default_free_text_path(),
            export_path: default_export_path(),
        }
    }
}

impl BackendConfig {
    /// Full URL of the prompt endpoint.
    pub fn prompt_url(&self) -> String {
        join_url(&self.base_url, &self.prompt_path)
    }

    /// Full URL of the free-text endpoint.
    pub fn free_text_url(&self) -> String {
        join_url(&self.base_url, &self.free_text_path)
    }

    /// Download link for a stored query.
    pub fn export_url(&self, query_id: &str) -> String {
        format!(
            "{}/{}",
            join_url(&self.base_url, &self.export_path),
            query_id
        )
    }
}

fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        base.to_string()
    } else {
        format!("{base}/{path}")
    }
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_prompt_path() -> String {
    "/api/userbot/query".to_string()
}

fn default_free_text_path() -> String {
    "/genericchatbot".to_string()
}

fn default_export_path() -> String {
    "/download".to_string()
}

/// How free-text input is handled.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FreeTextMode {
    /// Append the user turn only.
    #[default]
    Local,
    /// Also send the text to the free-text endpoint.
    Forward,
}

/// Conversation behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationConfig {
    #[serde(default = "default_welcome_text")]
    pub welcome_text: String,
    #[serde(default)]
    pub root_prompt_id: PromptId,
    #[serde(default)]
    pub free_text: FreeTextMode,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            welcome_text: default_welcome_text(),
            root_prompt_id: 0,
            free_text: FreeTextMode::Local,
        }
    }
}

fn default_welcome_text() -> String {
    "Hello! How can I help you today?".to_string()
}

/// Keys used to recognize selectable entity lists in extra actions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelectionConfig {
    #[serde(default = "default_list_keys")]
    pub list_keys: Vec<String>,
    #[serde(default = "default_id_key")]
    pub id_key: String,
    #[serde(default = "default_label_key")]
    pub label_key: String,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            list_keys: default_list_keys(),
            id_key: default_id_key(),
            label_key: default_label_key(),
        }
    }
}

fn default_list_keys() -> Vec<String> {
    vec!["loans".to_string()]
}

fn default_id_key() -> String {
    "loan_id".to_string()
}

fn default_label_key() -> String {
    "type".to_string()
}

/// Form behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FormsConfig {
    /// Enumerated values applied to fields by name when the server sends none.
    #[serde(default = "default_inline_enums")]
    pub inline_enums: BTreeMap<String, Vec<EnumOption>>,
}

impl Default for FormsConfig {
    fn default() -> Self {
        Self {
            inline_enums: default_inline_enums(),
        }
    }
}

fn default_inline_enums() -> BTreeMap<String, Vec<EnumOption>> {
    let income_types = ["SELF_EMPLOYED", "SALARIED", "UNEMPLOYED"]
        .into_iter()
        .map(EnumOption::plain)
        .collect();
    BTreeMap::from([("incomeType".to_string(), income_types)])
}
