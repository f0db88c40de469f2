//! Tests for layered configuration loading.

use super::*;
use crate::FreeTextMode;
use pretty_assertions::assert_eq;
use promptline_protocol::EnumOption;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Write JSON5 contents to a path, creating parent directories if needed.
fn write_json5(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("dir");
    }
    fs::write(path, contents).expect("write");
}

/// Verify that an empty config parses with defaults.
#[test]
fn parse_minimal_config() {
    let config = PromptlineConfig::load_from_str("{}").expect("config");
    assert_eq!(
        config.backend.prompt_url(),
        "http://localhost:8080/api/userbot/query"
    );
    assert_eq!(
        config.conversation.welcome_text,
        "Hello! How can I help you today?"
    );
    assert_eq!(config.conversation.root_prompt_id, 0);
    assert_eq!(config.conversation.free_text, FreeTextMode::Local);
    assert_eq!(config.selection.list_keys, vec!["loans".to_string()]);
    assert_eq!(config.selection.id_key, "loan_id");
    assert_eq!(config.selection.label_key, "type");
    assert_eq!(
        config.forms.inline_enums.get("incomeType"),
        Some(&vec![
            EnumOption::plain("SELF_EMPLOYED"),
            EnumOption::plain("SALARIED"),
            EnumOption::plain("UNEMPLOYED"),
        ])
    );
}

#[test]
fn parses_full_config_with_comments() {
    let json5 = r#"{
        // local backend
        backend: { base_url: "https://bank.example/", export_path: "files" },
        conversation: { free_text: "forward", root_prompt_id: 3 },
        selection: { list_keys: ["accounts"], id_key: "account_id", label_key: "name" },
        forms: { inline_enums: { branch: ["north", { value: "s", label: "South" }] } },
    }"#;
    let config = PromptlineConfig::load_from_str(json5).expect("config");
    assert_eq!(
        config.backend.free_text_url(),
        "https://bank.example/genericchatbot"
    );
    assert_eq!(
        config.backend.export_url("42"),
        "https://bank.example/files/42"
    );
    assert_eq!(config.conversation.free_text, FreeTextMode::Forward);
    assert_eq!(config.conversation.root_prompt_id, 3);
    assert_eq!(config.selection.id_key, "account_id");
    assert_eq!(
        config.forms.inline_enums.get("branch"),
        Some(&vec![
            EnumOption::plain("north"),
            EnumOption {
                value: "s".to_string(),
                label: "South".to_string(),
            },
        ])
    );
}

/// Reject unexpected top-level config keys.
#[test]
fn rejects_unknown_top_level_key() {
    let err = PromptlineConfig::load_from_str(r#"{ unexpected: true }"#).unwrap_err();
    assert!(format!("{err}").contains("unknown key"));
}

#[test]
fn rejects_invalid_free_text_mode() {
    let err = PromptlineConfig::load_from_str(r#"{ conversation: { free_text: "echo" } }"#)
        .unwrap_err();
    let msg = format!("{err}");
    assert!(msg.contains("conversation.free_text"));
}

#[test]
fn rejects_non_http_base_url() {
    let err = PromptlineConfig::load_from_str(r#"{ backend: { base_url: "ftp://host" } }"#)
        .unwrap_err();
    assert!(matches!(&err, ConfigError::InvalidBaseUrl(url) if url == "ftp://host"));
    assert!(format!("{err}").contains("backend.base_url"));
}

#[test]
fn rejects_empty_selection_keys() {
    let err = PromptlineConfig::load_from_str(r#"{ selection: { id_key: "" } }"#).unwrap_err();
    assert!(matches!(err, ConfigError::EmptySelectionKey("id_key")));

    let err = PromptlineConfig::load_from_str(r#"{ selection: { list_keys: ["loans", ""] } }"#)
        .unwrap_err();
    assert_eq!(err.to_string(), "invalid config at selection.list_keys: must not be empty");
}

#[test]
fn rejects_malformed_enum_option() {
    let err =
        PromptlineConfig::load_from_str(r#"{ forms: { inline_enums: { tenure: [12] } } }"#)
            .unwrap_err();
    assert!(format!("{err}").contains("forms.inline_enums.tenure[0]"));
}

/// Ensure runtime overrides beat cwd, and cwd beats user.
#[test]
fn layered_config_applies_precedence() {
    let temp = TempDir::new().expect("tmp");
    let root = temp.path();
    let cwd = root.join("work");
    fs::create_dir_all(&cwd).expect("cwd");

    let user_config = root.join("home").join(DEFAULT_CONFIG_FILE);
    write_json5(
        &user_config,
        r#"{ backend: { base_url: "http://user:1" }, conversation: { welcome_text: "Hi user" } }"#,
    );
    write_json5(
        &cwd.join(DEFAULT_CONFIG_FILE),
        r#"{ backend: { base_url: "http://cwd:2" } }"#,
    );
    let runtime = root.join("runtime.json5");
    write_json5(&runtime, r#"{ conversation: { root_prompt_id: 9 } }"#);

    let mut options = LayeredConfigOptions::new(&cwd).with_runtime_path(&runtime);
    options.user_config_path = Some(user_config);

    let layered = PromptlineConfig::load_layered_with_options(options).expect("layered");
    assert_eq!(layered.config.backend.base_url, "http://cwd:2");
    assert_eq!(layered.config.conversation.welcome_text, "Hi user");
    assert_eq!(layered.config.conversation.root_prompt_id, 9);
    let sources = layered
        .layers
        .iter()
        .map(|layer| layer.source)
        .collect::<Vec<_>>();
    assert_eq!(
        sources,
        vec![
            ConfigLayerSource::User,
            ConfigLayerSource::Cwd,
            ConfigLayerSource::Runtime
        ]
    );
}

#[test]
fn missing_optional_layers_fall_back_to_defaults() {
    let temp = TempDir::new().expect("tmp");
    let mut options = LayeredConfigOptions::new(temp.path());
    options.user_config_path = Some(temp.path().join("absent.json5"));

    let layered = PromptlineConfig::load_layered_with_options(options).expect("layered");
    assert!(layered.layers.is_empty());
    assert_eq!(layered.config.backend.base_url, "http://localhost:8080");
}

#[test]
fn missing_runtime_layer_is_an_error() {
    let temp = TempDir::new().expect("tmp");
    let mut options =
        LayeredConfigOptions::new(temp.path()).with_runtime_path(temp.path().join("gone.json5"));
    options.user_config_path = None;

    let err = PromptlineConfig::load_layered_with_options(options).unwrap_err();
    assert!(matches!(err, ConfigError::ReadFailed(_)));
}

#[test]
fn layer_schema_errors_name_the_layer() {
    let temp = TempDir::new().expect("tmp");
    write_json5(
        &temp.path().join(DEFAULT_CONFIG_FILE),
        r#"{ selection: { list_keys: "loans" } }"#,
    );
    let mut options = LayeredConfigOptions::new(temp.path());
    options.user_config_path = None;

    let err = PromptlineConfig::load_layered_with_options(options).unwrap_err();
    let msg = format!("{err}");
    assert!(msg.contains("cwd("));
    assert!(msg.contains("selection.list_keys"));
}

#[test]
fn builder_overrides_base_url() {
    let config = PromptlineConfig::builder()
        .base_url("http://127.0.0.1:9000")
        .build();
    assert_eq!(
        config.backend.prompt_url(),
        "http://127.0.0.1:9000/api/userbot/query"
    );
    config.validate().expect("valid");
}
