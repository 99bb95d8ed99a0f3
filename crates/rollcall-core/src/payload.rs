//! Field extraction from loosely typed request bodies.
//!
//! Devices post JSON or urlencoded forms with no schema guarantees, so every
//! body is reduced to a JSON object first and fields are read with a single
//! presence rule: a non-empty string or a non-zero finite number counts as
//! present, anything else (absent, `null`, `false`, `""`, `0`, arrays,
//! objects) counts as missing.

use serde_json::{Map, Number, Value};

pub type Payload = Map<String, Value>;

/// Read `key` as text if it is present under the presence rule.
pub fn field(payload: &Payload, key: &str) -> Option<String> {
    match payload.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => number_text(n),
        _ => None,
    }
}

fn number_text(n: &Number) -> Option<String> {
    if let Some(i) = n.as_i64() {
        return (i != 0).then(|| i.to_string());
    }
    if let Some(u) = n.as_u64() {
        return (u != 0).then(|| u.to_string());
    }
    let f = n.as_f64()?;
    (f != 0.0 && f.is_finite()).then(|| f.to_string())
}

/// Read every key in `keys`, collecting the names of the missing ones.
pub(crate) fn required<const N: usize>(
    payload: &Payload,
    keys: [&'static str; N],
) -> Result<[String; N], Vec<&'static str>> {
    let mut missing = Vec::new();
    let values = keys.map(|key| {
        field(payload, key).unwrap_or_else(|| {
            missing.push(key);
            String::new()
        })
    });
    if missing.is_empty() {
        Ok(values)
    } else {
        Err(missing)
    }
}
