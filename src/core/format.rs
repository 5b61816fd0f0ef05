//! Presentation pass over sanitized JSON output.

use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Raw,
    /// Rate-like fields rendered as percent strings.
    Pct,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raw" => Ok(OutputFormat::Raw),
            "pct" => Ok(OutputFormat::Pct),
            other => Err(format!("invalid format '{}' (expected raw or pct)", other)),
        }
    }
}

fn is_percent_key(key: &str) -> bool {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(rate|pct|ratio)$|^r$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(key))
}

/// Apply an output format to a JSON tree.
pub fn apply_format(value: Value, format: OutputFormat) -> Value {
    match format {
        OutputFormat::Raw => value,
        OutputFormat::Pct => percentify(value),
    }
}

fn percentify(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| {
                    let v = match v {
                        Value::Number(n) if is_percent_key(&k) => match n.as_f64() {
                            Some(x) => Value::String(format!("{:.3}%", x * 100.0)),
                            None => Value::Number(n),
                        },
                        other => percentify(other),
                    };
                    (k, v)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(percentify).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pct_formats_rate_like_keys() {
        let out = apply_format(
            json!({
                "finalConversionRate": 0.1234,
                "usageChangePct": -0.05,
                "r": 0.5,
                "nested": { "debtRatio": 1 },
                "amount": 0.5
            }),
            OutputFormat::Pct,
        );
        assert_eq!(out["finalConversionRate"], "12.340%");
        assert_eq!(out["usageChangePct"], "-5.000%");
        assert_eq!(out["r"], "50.000%");
        assert_eq!(out["nested"]["debtRatio"], "100.000%");
        assert_eq!(out["amount"], 0.5);
    }

    #[test]
    fn test_raw_is_identity() {
        let value = json!({ "rate": 0.1 });
        assert_eq!(apply_format(value.clone(), OutputFormat::Raw), value);
    }
}
