//! Translation bundles and key-path lookup
//!
//! A bundle is the nested key-to-message mapping for one locale, as parsed
//! from the fetched JSON resource. Lookups address it with dotted key paths
//! (`"greet.hi"`), walking one mapping per segment.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Separator between key path segments
pub const KEY_SEPARATOR: char = '.';

/// Nested mapping from keys to sub-mappings or messages
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bundle(Map<String, Value>);

impl Bundle {
    /// Parse a bundle from JSON text; the top level must be an object
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Walk a dotted key path
    ///
    /// Returns `None` when a segment is missing, when the walk reaches a value
    /// that is not a mapping before the last segment, or when the leaf is JSON
    /// `null`. Any other leaf is returned as stored.
    pub fn lookup(&self, key: &str) -> Option<&Value> {
        let mut segments = key.split(KEY_SEPARATOR);
        let first = segments.next()?;
        let mut current = self.0.get(first)?;

        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }

        if current.is_null() {
            None
        } else {
            Some(current)
        }
    }

    /// Look up a message that is stored as a string
    pub fn message(&self, key: &str) -> Option<&str> {
        self.lookup(key).and_then(Value::as_str)
    }
}

impl TryFrom<Value> for Bundle {
    type Error = Value;

    /// Accepts JSON objects, hands any other value back
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Bundle {
        Bundle::try_from(json!({
            "greet": { "hi": "Hello", "bye": "Goodbye {0}" },
            "title": "Welcome",
            "count": 3,
            "empty": null,
            "deep": { "a": { "b": { "c": "found" } } }
        }))
        .unwrap()
    }

    #[test]
    fn test_lookup_nested_leaf() {
        let bundle = sample();
        assert_eq!(bundle.message("greet.hi"), Some("Hello"));
        assert_eq!(bundle.message("deep.a.b.c"), Some("found"));
        assert_eq!(bundle.message("title"), Some("Welcome"));
    }

    #[test]
    fn test_lookup_missing_segment() {
        let bundle = sample();
        assert!(bundle.lookup("missing.key").is_none());
        assert!(bundle.lookup("greet.missing").is_none());
        assert!(bundle.lookup("deep.a.x.c").is_none());
    }

    #[test]
    fn test_lookup_through_leaf_is_none() {
        let bundle = sample();
        assert!(bundle.lookup("title.length").is_none());
        assert!(bundle.lookup("greet.hi.0").is_none());
        assert!(bundle.lookup("count.value").is_none());
    }

    #[test]
    fn test_lookup_passes_through_non_string_leaves() {
        let bundle = sample();
        assert_eq!(bundle.lookup("count"), Some(&json!(3)));
        assert_eq!(bundle.lookup("greet"), Some(&json!({ "hi": "Hello", "bye": "Goodbye {0}" })));
        assert!(bundle.message("count").is_none());
    }

    #[test]
    fn test_lookup_null_leaf_is_none() {
        assert!(sample().lookup("empty").is_none());
    }

    #[test]
    fn test_from_json_requires_object() {
        assert!(Bundle::from_json(r#"{"greet":{"hi":"Hello"}}"#).is_ok());
        assert!(Bundle::from_json(r#"["not", "a", "mapping"]"#).is_err());
        assert!(Bundle::from_json("not json").is_err());
    }

    #[test]
    fn test_try_from_rejects_non_object() {
        assert_eq!(Bundle::try_from(json!("text")), Err(json!("text")));
    }
}
