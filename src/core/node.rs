//! Output tree produced by calculators.
//!
//! JSON cannot carry `undefined`, `NaN` or infinities, so calculators build a
//! `Node` tree first; the sanitizer decides what survives before it is turned
//! into `serde_json::Value`.

use serde_json::{Map, Number, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<Node>),
    Map(Vec<(String, Node)>),
}

impl Node {
    /// Empty map, to be filled with [`Node::with`].
    pub fn object() -> Self {
        Node::Map(Vec::new())
    }

    /// Append a field; no-op on non-map nodes.
    pub fn with(mut self, key: &str, value: impl Into<Node>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace a field on a map node.
    pub fn insert(&mut self, key: &str, value: impl Into<Node>) {
        if let Node::Map(fields) = self {
            let value = value.into();
            match fields.iter_mut().find(|(k, _)| k == key) {
                Some(slot) => slot.1 = value,
                None => fields.push((key.to_string(), value)),
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        match self {
            Node::Map(fields) => fields.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Node::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Node::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Node::Undefined)
    }

    /// Convert to JSON. `Undefined` map entries and list items are dropped;
    /// remaining non-finite numbers become `null`.
    pub fn to_json(&self) -> Value {
        match self {
            Node::Undefined | Node::Null => Value::Null,
            Node::Bool(b) => Value::Bool(*b),
            Node::Number(v) => number_to_json(*v),
            Node::Text(s) => Value::String(s.clone()),
            Node::List(items) => Value::Array(
                items
                    .iter()
                    .filter(|n| !n.is_undefined())
                    .map(Node::to_json)
                    .collect(),
            ),
            Node::Map(fields) => {
                let mut map = Map::new();
                for (k, v) in fields {
                    if !v.is_undefined() {
                        map.insert(k.clone(), v.to_json());
                    }
                }
                Value::Object(map)
            }
        }
    }
}

/// Integral values serialize as JSON integers, as `JSON.stringify` would.
fn number_to_json(v: f64) -> Value {
    const MAX_SAFE: f64 = 9_007_199_254_740_991.0;
    if v.is_finite() && v.fract() == 0.0 && v.abs() <= MAX_SAFE {
        return Value::from(v as i64);
    }
    Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null)
}

impl From<f64> for Node {
    fn from(v: f64) -> Self {
        Node::Number(v)
    }
}

impl From<Option<f64>> for Node {
    fn from(v: Option<f64>) -> Self {
        v.map(Node::Number).unwrap_or(Node::Undefined)
    }
}

impl From<bool> for Node {
    fn from(b: bool) -> Self {
        Node::Bool(b)
    }
}

impl From<&str> for Node {
    fn from(s: &str) -> Self {
        Node::Text(s.to_string())
    }
}

impl From<String> for Node {
    fn from(s: String) -> Self {
        Node::Text(s)
    }
}

impl From<Option<String>> for Node {
    fn from(s: Option<String>) -> Self {
        s.map(Node::Text).unwrap_or(Node::Undefined)
    }
}

impl From<Vec<Node>> for Node {
    fn from(items: Vec<Node>) -> Self {
        Node::List(items)
    }
}

impl From<&Value> for Node {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Node::Null,
            Value::Bool(b) => Node::Bool(*b),
            Value::Number(n) => n.as_f64().map(Node::Number).unwrap_or(Node::Null),
            Value::String(s) => Node::Text(s.clone()),
            Value::Array(items) => Node::List(items.iter().map(Node::from).collect()),
            Value::Object(map) => {
                Node::Map(map.iter().map(|(k, v)| (k.clone(), Node::from(v))).collect())
            }
        }
    }
}

impl From<Value> for Node {
    fn from(value: Value) -> Self {
        Node::from(&value)
    }
}
