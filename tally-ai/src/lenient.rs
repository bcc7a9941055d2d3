//! Lenient field deserializers
//!
//! Generated JSON is structurally valid after sanitizing but its field types
//! drift: a list of items may arrive as one string, a code as a number, an
//! item as an object. These helpers accept the common shapes and normalize
//! them at the deserialization boundary.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Keys checked, in order, when an object stands in for a text value
const TEXT_KEYS: &[&str] = &["description", "name", "item", "text", "title"];

/// A string from a string, number, bool, or descriptive object. Null → empty.
pub fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_text(&value).unwrap_or_default())
}

/// Like [`string`], but null or blank becomes `None`
pub fn opt_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_text(&value).filter(|s| !s.is_empty()))
}

/// A list of strings from an array, a single scalar, or null
///
/// Blank entries are dropped.
pub fn string_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_list(&value))
}

/// A quantity from a number or numeric string; anything else is 1
pub fn quantity<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let parsed = match &value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok(),
        _ => None,
    };
    Ok(parsed.filter(|q| q.is_finite()).unwrap_or_else(default_quantity))
}

pub fn default_quantity() -> f64 {
    1.0
}

pub(crate) fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(values) => {
            let parts: Vec<String> = values.iter().filter_map(value_to_text).filter(|s| !s.is_empty()).collect();
            Some(parts.join(", "))
        }
        Value::Object(map) => TEXT_KEYS
            .iter()
            .find_map(|key| map.get(*key).and_then(value_to_text))
            .or_else(|| Some(value.to_string())),
    }
}

pub(crate) fn value_to_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(values) => values
            .iter()
            .filter_map(value_to_text)
            .filter(|s| !s.is_empty())
            .collect(),
        other => value_to_text(other).filter(|s| !s.is_empty()).into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_to_list_shapes() {
        assert_eq!(value_to_list(&json!(["a", " b ", ""])), vec!["a", "b"]);
        assert_eq!(value_to_list(&json!("single")), vec!["single"]);
        assert_eq!(value_to_list(&json!([22, 23])), vec!["22", "23"]);
        assert_eq!(value_to_list(&json!([{"description": "WC"}, {"name": "Sink"}])), vec!["WC", "Sink"]);
        assert!(value_to_list(&json!(null)).is_empty());
        assert!(value_to_list(&json!("   ")).is_empty());
    }

    #[test]
    fn test_value_to_text_object_fallback() {
        assert_eq!(value_to_text(&json!({"other": 1})), Some(r#"{"other":1}"#.to_string()));
        assert_eq!(value_to_text(&json!(["a", "b"])), Some("a, b".to_string()));
    }

    #[derive(Deserialize)]
    struct Probe {
        #[serde(default = "default_quantity", deserialize_with = "quantity")]
        qty: f64,
    }

    #[test]
    fn test_quantity_fallbacks() {
        let parse = |s: &str| serde_json::from_str::<Probe>(s).unwrap().qty;
        assert_eq!(parse(r#"{"qty": 4}"#), 4.0);
        assert_eq!(parse(r#"{"qty": "1,200"}"#), 1200.0);
        assert_eq!(parse(r#"{"qty": "lot"}"#), 1.0);
        assert_eq!(parse(r#"{}"#), 1.0);
    }
}
