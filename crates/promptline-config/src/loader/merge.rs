//! Layer merging.

use serde_json::Value;

/// Fold `overlay` into `base`. Objects merge key by key; any other overlay
/// value replaces what was there.
pub(super) fn merge_json_values(base: &mut Value, overlay: Value) {
    let overlay_map = match overlay {
        Value::Object(map) => map,
        scalar => {
            *base = scalar;
            return;
        }
    };
    match base {
        Value::Object(base_map) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_json_values(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        other => *other = Value::Object(overlay_map),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn objects_merge_and_arrays_replace() {
        let mut base = json!({
            "backend": { "base_url": "http://a", "prompt_path": "/q" },
            "selection": { "list_keys": ["loans"] }
        });
        merge_json_values(
            &mut base,
            json!({
                "backend": { "base_url": "http://b" },
                "selection": { "list_keys": ["cards"] }
            }),
        );
        assert_eq!(
            base,
            json!({
                "backend": { "base_url": "http://b", "prompt_path": "/q" },
                "selection": { "list_keys": ["cards"] }
            })
        );
    }
}
