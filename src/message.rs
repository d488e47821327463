//! Message rendering with positional parameters
//!
//! Rendering turns the result of a lookup into display text. Messages may
//! contain positional placeholders `{0}` through `{9}`; each parameter that
//! is set replaces the first occurrence of its placeholder.

use crate::config::PARAMETER_COUNT;
use serde_json::Value;

/// Fixed-size ordered set of optional substitution parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params([Option<String>; PARAMETER_COUNT]);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build parameters from a list, in order; values past the last slot are ignored
    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut params = Self::default();
        for (index, value) in values.into_iter().take(PARAMETER_COUNT).enumerate() {
            params.0[index] = Some(value.into());
        }
        params
    }

    /// Set parameter `index`, builder style
    ///
    /// # Panics
    /// Panics if `index` is not below [`PARAMETER_COUNT`].
    pub fn with(mut self, index: usize, value: impl Into<String>) -> Self {
        self.0[index] = Some(value.into());
        self
    }

    /// Set or clear parameter `index`; returns `false` when out of range
    pub fn set(&mut self, index: usize, value: Option<String>) -> bool {
        match self.0.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Parameter `index`, if set
    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).and_then(|p| p.as_deref())
    }

    /// Whether no parameter is set
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(Option::is_none)
    }
}

/// Render a looked-up value as display text
///
/// A missing value renders as the empty string, a string as itself, and any
/// other JSON value as its JSON text. Empty parameters are not substituted.
pub fn render(value: Option<&Value>, params: &Params) -> String {
    let mut text = match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };

    for (index, param) in params.0.iter().enumerate() {
        let Some(param) = param.as_deref().filter(|p| !p.is_empty()) else {
            continue;
        };
        text = text.replacen(&format!("{{{}}}", index), param, 1);
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_missing_is_empty() {
        assert_eq!(render(None, &Params::new()), "");
        assert_eq!(render(Some(&Value::Null), &Params::new().with(0, "x")), "");
    }

    #[test]
    fn test_render_substitutes_positional_params() {
        let value = json!("Hello {0}, you have {1} messages");
        let params = Params::new().with(0, "Ada").with(1, "3");
        assert_eq!(render(Some(&value), &params), "Hello Ada, you have 3 messages");
    }

    #[test]
    fn test_render_replaces_first_occurrence_only() {
        let value = json!("{0} and {0}");
        assert_eq!(render(Some(&value), &Params::new().with(0, "a")), "a and {0}");
    }

    #[test]
    fn test_render_skips_unset_and_empty_params() {
        let value = json!("{0}-{1}-{2}");
        let params = Params::new().with(0, "x").with(1, "");
        assert_eq!(render(Some(&value), &params), "x-{1}-{2}");
    }

    #[test]
    fn test_render_non_string_leaf() {
        assert_eq!(render(Some(&json!(42)), &Params::new()), "42");
    }

    #[test]
    fn test_params_from_values_and_set() {
        let mut params = Params::from_values(["a", "b"]);
        assert_eq!(params.get(0), Some("a"));
        assert_eq!(params.get(1), Some("b"));
        assert_eq!(params.get(2), None);

        assert!(params.set(9, Some("last".to_string())));
        assert!(!params.set(PARAMETER_COUNT, Some("overflow".to_string())));
        assert_eq!(params.get(9), Some("last"));

        assert!(params.set(0, None));
        assert!(params.set(1, None));
        assert!(params.set(9, None));
        assert!(params.is_empty());
    }

    #[test]
    fn test_params_from_values_truncates() {
        let params = Params::from_values((0..20).map(|i| i.to_string()));
        assert_eq!(params.get(PARAMETER_COUNT - 1), Some("9"));
    }
}
