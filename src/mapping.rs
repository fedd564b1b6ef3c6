//! Field extraction from raw API entries.
//!
//! The gateway returns loosely typed JSON: fields may be absent, numbers
//! sometimes arrive as strings, and flags arrive as 0/1 integers. Every
//! collector goes through these helpers so that a missing or malformed
//! field always degrades to a documented default and never fails a scrape.
//! Only a failed remote call is allowed to propagate.

use serde_json::Value;

/// Extract a string field, falling back to `default`.
///
/// Numbers render through their JSON representation (so a `disabled` flag
/// of `0` becomes the label value `"0"`) and booleans map to `"1"`/`"0"`.
pub fn text(entry: &Value, key: &str, default: &str) -> String {
    match entry.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => (if *b { "1" } else { "0" }).to_string(),
        _ => default.to_string(),
    }
}

/// Extract a numeric field as `f64`, falling back to `default`.
///
/// Strings are trimmed and parsed; anything unparseable yields the
/// default rather than an error.
pub fn number(entry: &Value, key: &str, default: f64) -> f64 {
    match entry.get(key) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(default),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(default),
        Some(Value::Bool(b)) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        _ => default,
    }
}

/// Extract an integer field, falling back to `default`.
///
/// Fractional numbers truncate toward zero. Strings must parse as whole
/// integers; a fractional string like `"12.5"` yields the default, the
/// same way a strict integer cast of that string would fail.
pub fn integer(entry: &Value, key: &str, default: i64) -> i64 {
    match entry.get(key) {
        Some(Value::Number(n)) => match n.as_i64() {
            Some(v) => v,
            None => n.as_f64().map_or(default, |v| v as i64),
        },
        Some(Value::String(s)) => s.trim().parse().unwrap_or(default),
        Some(Value::Bool(b)) => i64::from(*b),
        _ => default,
    }
}
