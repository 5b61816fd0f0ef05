//! Permissive calculator input with ordered alias lookup.

use serde_json::{Map, Value};

use super::normalize::{
    to_frac, to_number_loose, to_rate, truthy, try_frac, try_number, DEFAULT_ROUND_STEP,
};

/// A loosely-typed input record.
///
/// Every calculator reads its fields through an ordered list of aliases;
/// the first alias holding a non-null value wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelInput {
    fields: Map<String, Value>,
}

impl ModelInput {
    /// Wrap a JSON value. Anything other than an object becomes an empty input.
    pub fn new(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self { fields },
            _ => Self::default(),
        }
    }

    pub fn from_ref(value: &Value) -> Self {
        Self::new(value.clone())
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }

    /// First alias whose value is present and not `null`.
    pub fn pick(&self, keys: &[&str]) -> Option<&Value> {
        keys.iter()
            .filter_map(|k| self.fields.get(*k))
            .find(|v| !v.is_null())
    }

    /// First alias whose value coerces to a finite number.
    pub fn pick_number(&self, keys: &[&str]) -> Option<f64> {
        keys.iter()
            .find_map(|k| try_number(self.fields.get(*k)))
    }

    pub fn has(&self, keys: &[&str]) -> bool {
        self.pick(keys).is_some()
    }

    pub fn number(&self, keys: &[&str], default: f64) -> f64 {
        to_number_loose(self.pick(keys), default)
    }

    /// Number from the first present alias, `None` if absent or unparseable.
    pub fn opt_number(&self, keys: &[&str]) -> Option<f64> {
        try_number(self.pick(keys))
    }

    pub fn frac(&self, keys: &[&str], default: f64) -> f64 {
        to_frac(self.pick(keys), default)
    }

    pub fn opt_frac(&self, keys: &[&str]) -> Option<f64> {
        try_frac(self.pick(keys))
    }

    pub fn rate(&self, keys: &[&str], default: f64) -> f64 {
        to_rate(self.pick(keys), default)
    }

    pub fn flag(&self, keys: &[&str], default: bool) -> bool {
        self.pick(keys).map(truthy).unwrap_or(default)
    }

    pub fn text(&self, keys: &[&str]) -> Option<String> {
        match self.pick(keys)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Numeric array under `key`; non-numeric entries are skipped.
    pub fn numbers(&self, key: &str) -> Option<Vec<f64>> {
        match self.fields.get(key)? {
            Value::Array(items) => Some(items.iter().filter_map(|v| try_number(Some(v))).collect()),
            _ => None,
        }
    }

    /// Nested object under `key` as its own input.
    pub fn nested(&self, key: &str) -> ModelInput {
        self.fields
            .get(key)
            .map(ModelInput::from_ref)
            .unwrap_or_default()
    }

    /// Raw copy of a field for debug echoes.
    pub fn raw(&self, keys: &[&str]) -> Value {
        self.pick(keys).cloned().unwrap_or(Value::Null)
    }

    pub fn options(&self) -> ModelOptions {
        ModelOptions {
            inner: self.nested("options"),
        }
    }
}

impl From<Value> for ModelInput {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

/// The `options` sub-object of an input.
#[derive(Debug, Clone, Default)]
pub struct ModelOptions {
    inner: ModelInput,
}

impl ModelOptions {
    /// Rounding step for reported numbers (default `1e-6`).
    pub fn round_step(&self) -> f64 {
        self.inner.number(&["roundStep", "step"], DEFAULT_ROUND_STEP)
    }

    pub fn debug(&self) -> bool {
        self.inner.flag(&["debug"], false)
    }

    pub fn flag(&self, name: &str, default: bool) -> bool {
        self.inner.flag(&[name], default)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.inner.opt_number(&[name])
    }

    pub fn number_or(&self, name: &str, default: f64) -> f64 {
        self.inner.number(&[name], default)
    }

    pub fn has(&self, name: &str) -> bool {
        self.inner.has(&[name])
    }

    pub fn as_input(&self) -> &ModelInput {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pick_skips_null_aliases() {
        let input = ModelInput::new(json!({ "a": null, "b": 2, "c": 3 }));
        assert_eq!(input.pick(&["a", "b", "c"]), Some(&json!(2)));
        assert_eq!(input.number(&["a", "b"], 0.0), 2.0);
    }

    #[test]
    fn test_pick_keeps_first_present_even_if_malformed() {
        let input = ModelInput::new(json!({ "a": "oops", "b": 2 }));
        assert_eq!(input.number(&["a", "b"], 9.0), 9.0);
        assert_eq!(input.pick_number(&["a", "b"]), Some(2.0));
    }

    #[test]
    fn test_non_object_is_empty() {
        let input = ModelInput::new(json!([1, 2, 3]));
        assert!(input.fields().is_empty());
        assert_eq!(input.number(&["x"], 4.0), 4.0);
    }

    #[test]
    fn test_options_defaults() {
        let input = ModelInput::new(json!({}));
        let options = input.options();
        assert_eq!(options.round_step(), 1e-6);
        assert!(!options.debug());
        assert!(options.flag("clampToBounds", true));
    }

    #[test]
    fn test_options_values() {
        let input = ModelInput::new(json!({
            "options": { "roundStep": 0.01, "debug": true, "clampToBounds": false }
        }));
        let options = input.options();
        assert_eq!(options.round_step(), 0.01);
        assert!(options.debug());
        assert!(!options.flag("clampToBounds", true));
    }

    #[test]
    fn test_numbers_array() {
        let input = ModelInput::new(json!({ "xs": [1, "2", "x", 3.5] }));
        assert_eq!(input.numbers("xs"), Some(vec![1.0, 2.0, 3.5]));
        assert_eq!(input.numbers("missing"), None);
    }
}
