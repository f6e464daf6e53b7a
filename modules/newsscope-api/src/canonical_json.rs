//! Canonical JSON serialization: object keys sorted recursively, matching
//! Python's `json.dumps(..., sort_keys=True)` used by the original
//! precompute to produce a stable ETag input.

use serde_json::Value;
use std::collections::BTreeMap;

pub fn canonicalize(value: &Value) -> String {
    serde_json::to_string(&sort_keys(value)).unwrap_or_default()
}

fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> =
                map.iter().map(|(k, v)| (k.clone(), sort_keys(v))).collect();
            serde_json::to_value(sorted).unwrap_or(Value::Null)
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keys_are_sorted_regardless_of_insertion_order() {
        let value = json!({"b": 1, "a": 2, "c": {"z": 1, "y": 2}});
        let canonical = canonicalize(&value);
        assert_eq!(canonical, r#"{"a":2,"b":1,"c":{"y":2,"z":1}}"#);
    }

    #[test]
    fn identical_values_with_different_key_order_produce_identical_output() {
        let a = json!({"x": 1, "y": 2});
        let b = json!({"y": 2, "x": 1});
        assert_eq!(canonicalize(&a), canonicalize(&b));
    }
}
