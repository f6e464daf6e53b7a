use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;

/// Types usable as Gemini `responseSchema` structured output.
///
/// Automatically implemented for any `JsonSchema + DeserializeOwned` type.
/// Gemini's schema dialect is a restricted subset of OpenAPI 3.0: no
/// `$ref`, no `additionalProperties`, no `definitions` block.
pub trait StructuredOutput: JsonSchema + DeserializeOwned {
    fn response_schema() -> serde_json::Value {
        let schema = schema_for!(Self);
        let mut value = serde_json::to_value(schema).unwrap_or_default();

        inline_refs(&mut value);
        strip_unsupported_keywords(&mut value);

        if let serde_json::Value::Object(map) = &mut value {
            map.remove("definitions");
            map.remove("$schema");
        }

        value
    }
}

impl<T: JsonSchema + DeserializeOwned> StructuredOutput for T {}

fn inline_refs(value: &mut serde_json::Value) {
    let definitions = if let serde_json::Value::Object(map) = value {
        map.get("definitions").cloned()
    } else {
        None
    };

    if let Some(defs) = definitions {
        inline_refs_recursive(value, &defs);
    }
}

fn inline_refs_recursive(value: &mut serde_json::Value, definitions: &serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            if let Some(serde_json::Value::String(ref_path)) = map.get("$ref").cloned() {
                if ref_path.starts_with("#/definitions/") {
                    let type_name = ref_path.trim_start_matches("#/definitions/");
                    if let Some(def) = definitions.get(type_name) {
                        *value = def.clone();
                        inline_refs_recursive(value, definitions);
                        return;
                    }
                }
            }

            if let Some(serde_json::Value::Array(all_of)) = map.get("allOf").cloned() {
                if all_of.len() == 1 {
                    *value = all_of.into_iter().next().unwrap();
                    inline_refs_recursive(value, definitions);
                    return;
                }
            }

            for (_, v) in map.iter_mut() {
                inline_refs_recursive(v, definitions);
            }
        }
        serde_json::Value::Array(arr) => {
            for item in arr.iter_mut() {
                inline_refs_recursive(item, definitions);
            }
        }
        _ => {}
    }
}

/// Gemini rejects keywords outside its OpenAPI subset (`additionalProperties`,
/// format variants it doesn't recognize, etc). Strip them recursively.
fn strip_unsupported_keywords(value: &mut serde_json::Value) {
    const UNSUPPORTED: &[&str] = &["additionalProperties", "$schema", "definitions"];
    match value {
        serde_json::Value::Object(map) => {
            for key in UNSUPPORTED {
                map.remove(*key);
            }
            for (_, v) in map.iter_mut() {
                strip_unsupported_keywords(v);
            }
        }
        serde_json::Value::Array(arr) => {
            for item in arr.iter_mut() {
                strip_unsupported_keywords(item);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemars::JsonSchema;
    use serde::Deserialize;

    #[derive(Deserialize, JsonSchema)]
    struct Point {
        point_id: u32,
        label: String,
    }

    #[derive(Deserialize, JsonSchema)]
    struct Spectrum {
        spectrum_name: String,
        points: Vec<Point>,
    }

    #[test]
    fn nested_refs_are_inlined() {
        let schema = Spectrum::response_schema();
        let s = schema.as_object().unwrap();
        assert!(!s.contains_key("definitions"));
        let props = s.get("properties").unwrap().as_object().unwrap();
        let points = props.get("points").unwrap().as_object().unwrap();
        let items = points.get("items").unwrap().as_object().unwrap();
        assert!(!items.contains_key("$ref"));
        assert_eq!(
            items.get("type"),
            Some(&serde_json::Value::String("object".to_string()))
        );
    }

    #[test]
    fn unsupported_keywords_stripped() {
        let schema = Spectrum::response_schema();
        let schema_str = serde_json::to_string(&schema).unwrap();
        assert!(!schema_str.contains("additionalProperties"));
    }
}
