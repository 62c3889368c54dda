//! Deterministic JSON rendering

use super::DocumentError;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};

const INDENT: &[u8] = b"    ";

/// Rebuild every object with its keys in lexicographic order.
fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(entries.into_iter().map(|(k, v)| (k, sort_keys(v))).collect::<Map<_, _>>())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// Render `document` with sorted keys and four-space indentation.
///
/// Identical input always renders to identical bytes.
pub fn to_sorted_pretty<T: Serialize>(document: &T) -> Result<String, DocumentError> {
    let value = sort_keys(serde_json::to_value(document)?);

    let mut buffer = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(INDENT));
    value.serialize(&mut serializer)?;

    String::from_utf8(buffer).map_err(|e| DocumentError::Encoding(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keys_sorted_at_every_level() {
        let rendered = to_sorted_pretty(&json!({
            "zeta": 1,
            "alpha": {"y": [ {"b": 1, "a": 2} ], "x": true}
        }))
        .unwrap();

        let expected = r#"{
    "alpha": {
        "x": true,
        "y": [
            {
                "a": 2,
                "b": 1
            }
        ]
    },
    "zeta": 1
}"#;
        assert_eq!(rendered, expected);
    }

    #[test]
    fn empty_collections_stay_inline() {
        let rendered = to_sorted_pretty(&json!({"pairs": [], "extra": {}})).unwrap();
        assert_eq!(rendered, "{\n    \"extra\": {},\n    \"pairs\": []\n}");
    }
}
