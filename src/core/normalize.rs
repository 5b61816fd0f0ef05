//! Numeric coercion and guarded arithmetic shared by every calculator.
//!
//! Inputs arrive as loosely-typed JSON: numbers, numeric strings with
//! thousands separators, percent strings. These helpers turn them into
//! finite `f64` values and never panic.

use serde_json::Value;

/// Threshold below which a divisor counts as zero in [`div`].
pub const DIV_EPSILON: f64 = 1e-12;

/// Default rounding step for reported figures.
pub const DEFAULT_ROUND_STEP: f64 = 1e-6;

/// Sensitivity mode label. Both modes compute the same factor; the label is
/// carried for call-site readability only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensitivityMode {
    Increment,
    Decrement,
}

fn strip_separators(s: &str) -> String {
    s.trim()
        .chars()
        .filter(|c| *c != ',' && *c != '_' && !c.is_whitespace())
        .collect()
}

fn parse_finite(s: &str) -> Option<f64> {
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Coerce a JSON value to a finite number.
///
/// `None`/`null` and anything unparseable yield `default`. Strings are
/// trimmed and stripped of `,`, `_` and whitespace before parsing.
pub fn to_number_loose(value: Option<&Value>, default: f64) -> f64 {
    try_number(value).unwrap_or(default)
}

/// Like [`to_number_loose`] but reports absence instead of a default.
pub fn try_number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => parse_finite(&strip_separators(s)),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Coerce a rate-like value to a fraction.
///
/// A trailing `%` always divides by 100. Without it, magnitudes above 1 are
/// read as percentages and divided by 100; values at or below 1 pass through.
pub fn to_frac(value: Option<&Value>, default: f64) -> f64 {
    try_frac(value).unwrap_or(default)
}

pub fn try_frac(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::String(s) => {
            let cleaned = strip_separators(s);
            if let Some(body) = cleaned.strip_suffix('%') {
                return parse_finite(body).map(|v| v / 100.0);
            }
            parse_finite(&cleaned).map(percent_heuristic)
        }
        other => try_number(Some(other)).map(percent_heuristic),
    }
}

fn percent_heuristic(v: f64) -> f64 {
    if v > 1.0 {
        v / 100.0
    } else {
        v
    }
}

/// Coerce a rate where bare numbers are taken literally and only `"6%"`
/// style strings are scaled.
pub fn to_rate(value: Option<&Value>, default: f64) -> f64 {
    match value {
        Some(Value::String(s)) => {
            let cleaned = strip_separators(s);
            match cleaned.strip_suffix('%') {
                Some(body) => parse_finite(body).map(|v| v / 100.0),
                None => parse_finite(&cleaned),
            }
            .unwrap_or(default)
        }
        other => to_number_loose(other, default),
    }
}

/// Guarded division: `default` when either operand is non-finite or the
/// divisor is within [`DIV_EPSILON`] of zero.
pub fn div(a: f64, b: f64, default: f64) -> f64 {
    if !a.is_finite() || !b.is_finite() || b.abs() <= DIV_EPSILON {
        return default;
    }
    a / b
}

pub fn clamp(x: f64, lo: f64, hi: f64) -> f64 {
    lo.max(hi.min(x))
}

/// Round to the nearest multiple of `step`; a non-positive step is a no-op.
///
/// Decimal steps such as `1e-6` divide by their integral reciprocal so the
/// result is the closest `f64` to the decimal value.
pub fn round_to(x: f64, step: f64) -> f64 {
    if step.is_nan() || step <= 0.0 || !x.is_finite() {
        return x;
    }
    let inv = 1.0 / step;
    if inv.fract() == 0.0 && inv.is_finite() {
        (x * inv).round() / inv
    } else {
        (x / step).round() * step
    }
}

/// `exp(beta * r * (1 + (years - 1) / max(1, years)))`.
///
/// Non-finite `years` counts as one year.
pub fn calc_sensitivity(r: f64, beta: f64, years: f64, _mode: SensitivityMode) -> f64 {
    let years = if years.is_finite() { years } else { 1.0 };
    (beta * r * (1.0 + (years - 1.0) / years.max(1.0))).exp()
}

/// Natural log that never returns `NaN`/`-inf` for non-positive inputs.
pub fn safe_log(v: f64, eps: f64) -> f64 {
    if v > 0.0 {
        v.ln()
    } else {
        (v.abs() + eps).ln()
    }
}

/// Division whose denominator is pushed away from zero by `eps`,
/// keeping its sign.
pub fn safe_division(num: f64, den: f64, eps: f64) -> f64 {
    let den = if den.abs() < eps {
        if den < 0.0 {
            -eps
        } else {
            eps
        }
    } else {
        den
    };
    num / den
}

/// JavaScript-style truthiness for option flags.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|v| v != 0.0 && !v.is_nan()).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
