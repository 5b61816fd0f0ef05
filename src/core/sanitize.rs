//! Output sanitizer.
//!
//! Makes a calculator result safe to serialize: non-finite numbers never
//! escape, and the mode decides what happens to undefined and null fields.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::node::Node;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SanitizeMode {
    /// Drop undefined fields and non-finite numbers, keep nulls.
    #[serde(rename = "omit")]
    Omit,
    /// Keep every field; undefined and non-finite become `null`.
    #[serde(rename = "null")]
    Null,
    /// Drop undefined, null and non-finite values.
    #[default]
    #[serde(rename = "omitNullish")]
    OmitNullish,
}

impl SanitizeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SanitizeMode::Omit => "omit",
            SanitizeMode::Null => "null",
            SanitizeMode::OmitNullish => "omitNullish",
        }
    }

    fn drops_undefined(&self) -> bool {
        !matches!(self, SanitizeMode::Null)
    }
}

impl fmt::Display for SanitizeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SanitizeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "omit" => Ok(SanitizeMode::Omit),
            "null" => Ok(SanitizeMode::Null),
            "omitNullish" => Ok(SanitizeMode::OmitNullish),
            other => Err(format!(
                "invalid sanitize mode '{}' (expected omit, null or omitNullish)",
                other
            )),
        }
    }
}

/// Sanitize a tree. `None` means the root itself was dropped.
pub fn sanitize(node: &Node, mode: SanitizeMode) -> Option<Node> {
    match node {
        Node::Number(v) if !v.is_finite() => {
            if mode.drops_undefined() {
                None
            } else {
                Some(Node::Null)
            }
        }
        Node::Undefined => {
            if mode.drops_undefined() {
                None
            } else {
                Some(Node::Null)
            }
        }
        Node::Null => match mode {
            SanitizeMode::OmitNullish => None,
            _ => Some(Node::Null),
        },
        Node::List(items) => Some(Node::List(
            items.iter().filter_map(|item| sanitize(item, mode)).collect(),
        )),
        Node::Map(fields) => Some(Node::Map(
            fields
                .iter()
                .filter_map(|(k, v)| sanitize(v, mode).map(|v| (k.clone(), v)))
                .collect(),
        )),
        other => Some(other.clone()),
    }
}

/// Sanitize and serialize in one step. A dropped root becomes `null`.
pub fn sanitize_to_json(node: &Node, mode: SanitizeMode) -> Value {
    sanitize(node, mode)
        .map(|n| n.to_json())
        .unwrap_or(Value::Null)
}

/// Sanitize an arbitrary JSON value, for callers that already hold JSON.
pub fn sanitize_json(value: &Value, mode: SanitizeMode) -> Value {
    sanitize_to_json(&Node::from(value), mode)
}
