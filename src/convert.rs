use serde_json::{Map, Value};

/// Rewrite every object key from camelCase to the snake_case column naming
/// used by the store. Arrays map element-wise; scalars and null pass through.
pub fn to_storage_keys(value: Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.into_iter().map(to_storage_keys).collect()),
        Value::Object(obj) => {
            let mut out = Map::with_capacity(obj.len());
            for (key, v) in obj {
                out.insert(snake_key(&key), to_storage_keys(v));
            }
            Value::Object(out)
        }
        other => other,
    }
}

/// Inverse of `to_storage_keys`: snake_case keys become camelCase, applied
/// recursively. Objects that end up with an `id` field additionally expose
/// the same value under the legacy `_id` alias. The alias is idempotent and
/// skipped when `id` is absent.
pub fn to_domain_keys(value: Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.into_iter().map(to_domain_keys).collect()),
        Value::Object(obj) => {
            let mut out = Map::with_capacity(obj.len() + 1);
            for (key, v) in obj {
                out.insert(camel_key(&key), to_domain_keys(v));
            }
            if let Some(id) = out.get("id").cloned() {
                out.insert("_id".to_string(), id);
            }
            Value::Object(out)
        }
        other => other,
    }
}

fn snake_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for ch in key.chars() {
        if ch.is_ascii_uppercase() {
            out.push('_');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

fn camel_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper_next = false;
    for (i, ch) in key.chars().enumerate() {
        if ch == '_' && i > 0 {
            upper_next = true;
        } else if upper_next {
            out.push(ch.to_ascii_uppercase());
            upper_next = false;
        } else {
            // A leading underscore is part of the name (the `_id` alias),
            // not a word separator.
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn storage_keys_rewrites_nested_objects_and_arrays() {
        let v = json!({
            "targetBatchIds": ["b1"],
            "nested": { "guardianName": "x", "plain": 1 },
            "list": [{ "weekStart": "2024-01-01" }]
        });
        assert_eq!(
            to_storage_keys(v),
            json!({
                "target_batch_ids": ["b1"],
                "nested": { "guardian_name": "x", "plain": 1 },
                "list": [{ "week_start": "2024-01-01" }]
            })
        );
    }

    #[test]
    fn domain_keys_round_trips_and_aliases_id() {
        let original = json!({
            "id": "a1",
            "guardianPhone": "123",
            "batchIds": [{ "id": "b1", "name": "Batch" }]
        });
        let back = to_domain_keys(to_storage_keys(original));
        assert_eq!(back.get("guardianPhone"), Some(&json!("123")));
        assert_eq!(back.get("_id"), Some(&json!("a1")));
        assert_eq!(back["batchIds"][0]["_id"], json!("b1"));
    }

    #[test]
    fn domain_keys_is_idempotent_on_camel_case() {
        let v = json!({ "id": "a1", "createdAt": "t", "_id": "a1" });
        let once = to_domain_keys(v.clone());
        let twice = to_domain_keys(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn alias_skipped_without_id() {
        let v = to_domain_keys(json!({ "name": "x" }));
        assert!(v.get("_id").is_none());
    }

    #[test]
    fn scalars_and_null_pass_through() {
        assert_eq!(to_storage_keys(json!(null)), json!(null));
        assert_eq!(to_domain_keys(json!(42)), json!(42));
        assert_eq!(to_storage_keys(json!("plainText")), json!("plainText"));
    }
}
