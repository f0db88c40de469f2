//! Schema validation helpers for Promptline JSON5 configuration.

use crate::ConfigError;
use serde_json::{Map, Value};

/// Validate a single config layer against the schema.
pub(super) fn validate_layer_schema(value: &Value, layer: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, "")?;
    let allowed = ["$schema", "backend", "conversation", "selection", "forms"];
    ensure_allowed_keys(map, &allowed, layer, "")?;

    if let Some(value) = map.get("$schema") {
        expect_string(value, layer, "$schema")?;
    }
    if let Some(value) = map.get("backend") {
        validate_backend(value, layer, "backend")?;
    }
    if let Some(value) = map.get("conversation") {
        validate_conversation(value, layer, "conversation")?;
    }
    if let Some(value) = map.get("selection") {
        validate_selection(value, layer, "selection")?;
    }
    if let Some(value) = map.get("forms") {
        validate_forms(value, layer, "forms")?;
    }

    Ok(())
}

/// Validate the "backend" block.
fn validate_backend(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    let allowed = ["base_url", "prompt_path", "free_text_path", "export_path"];
    ensure_allowed_keys(map, &allowed, layer, path)?;
    for key in allowed {
        if let Some(value) = map.get(key) {
            expect_string(value, layer, &join_path(path, key))?;
        }
    }
    Ok(())
}

/// Validate the "conversation" block.
fn validate_conversation(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(
        map,
        &["welcome_text", "root_prompt_id", "free_text"],
        layer,
        path,
    )?;

    if let Some(value) = map.get("welcome_text") {
        expect_string(value, layer, &join_path(path, "welcome_text"))?;
    }
    if let Some(value) = map.get("root_prompt_id") {
        expect_integer(value, layer, &join_path(path, "root_prompt_id"))?;
    }
    if let Some(value) = map.get("free_text") {
        expect_enum(
            value,
            &["local", "forward"],
            layer,
            &join_path(path, "free_text"),
        )?;
    }
    Ok(())
}

/// Validate the "selection" block.
fn validate_selection(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(map, &["list_keys", "id_key", "label_key"], layer, path)?;

    if let Some(value) = map.get("list_keys") {
        validate_string_array(value, layer, &join_path(path, "list_keys"))?;
    }
    if let Some(value) = map.get("id_key") {
        expect_string(value, layer, &join_path(path, "id_key"))?;
    }
    if let Some(value) = map.get("label_key") {
        expect_string(value, layer, &join_path(path, "label_key"))?;
    }
    Ok(())
}

/// Validate the "forms" block.
fn validate_forms(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    ensure_allowed_keys(map, &["inline_enums"], layer, path)?;

    if let Some(value) = map.get("inline_enums") {
        let enums_path = join_path(path, "inline_enums");
        let enums = expect_object(value, layer, &enums_path)?;
        for (field, options) in enums {
            validate_enum_options(options, layer, &join_path(&enums_path, field))?;
        }
    }
    Ok(())
}

/// Validate an enum option list: strings or `{ value, label }` objects.
fn validate_enum_options(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let arr = expect_array(value, layer, path)?;
    for (idx, entry) in arr.iter().enumerate() {
        let entry_path = format!("{path}[{idx}]");
        match entry {
            Value::String(_) => {}
            Value::Object(map) => {
                ensure_allowed_keys(map, &["value", "label"], layer, &entry_path)?;
                let value_path = join_path(&entry_path, "value");
                let value = map
                    .get("value")
                    .ok_or_else(|| invalid_field(layer, &value_path, "missing required field"))?;
                expect_string(value, layer, &value_path)?;
                if let Some(label) = map.get("label") {
                    expect_string(label, layer, &join_path(&entry_path, "label"))?;
                }
            }
            _ => {
                return Err(invalid_field(
                    layer,
                    &entry_path,
                    "expected string or object",
                ));
            }
        }
    }
    Ok(())
}

/// Expect a JSON object or return a typed error.
fn expect_object<'a>(
    value: &'a Value,
    layer: &str,
    path: &str,
) -> Result<&'a Map<String, Value>, ConfigError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(invalid_field(layer, path, "expected object")),
    }
}

/// Expect a JSON array or return a typed error.
fn expect_array<'a>(
    value: &'a Value,
    layer: &str,
    path: &str,
) -> Result<&'a Vec<Value>, ConfigError> {
    match value {
        Value::Array(arr) => Ok(arr),
        _ => Err(invalid_field(layer, path, "expected array")),
    }
}

/// Expect a JSON string or return a typed error.
fn expect_string(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.as_str().is_some() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected string"))
    }
}

/// Expect a JSON integer or return a typed error.
fn expect_integer(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.is_i64() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected integer"))
    }
}

/// Expect one of a fixed set of strings.
fn expect_enum(value: &Value, allowed: &[&str], layer: &str, path: &str) -> Result<(), ConfigError> {
    match value.as_str() {
        Some(text) if allowed.contains(&text) => Ok(()),
        _ => Err(invalid_field(
            layer,
            path,
            &format!("expected one of: {}", allowed.join(", ")),
        )),
    }
}

/// Validate that a value is an array of strings.
fn validate_string_array(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let arr = expect_array(value, layer, path)?;
    for (idx, entry) in arr.iter().enumerate() {
        if entry.as_str().is_none() {
            return Err(invalid_field(
                layer,
                &format!("{path}[{idx}]"),
                "expected string",
            ));
        }
    }
    Ok(())
}

/// Ensure an object contains only allowed keys.
fn ensure_allowed_keys(
    map: &Map<String, Value>,
    allowed: &[&str],
    layer: &str,
    path: &str,
) -> Result<(), ConfigError> {
    for key in map.keys() {
        if !allowed.contains(&key.as_str()) {
            return Err(invalid_field(layer, &join_path(path, key), "unknown key"));
        }
    }
    Ok(())
}

/// Join nested paths for better error messages.
fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

/// Build a structured invalid-field error.
fn invalid_field(layer: &str, path: &str, message: &str) -> ConfigError {
    let normalized_path = if path.is_empty() { "root" } else { path };
    ConfigError::InvalidField {
        path: format!("{layer}:{normalized_path}"),
        message: message.to_string(),
    }
}
