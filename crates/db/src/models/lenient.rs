//! Forgiving deserializers for payloads written by OCR and by the model.
//!
//! Neither source reliably sticks to one JSON type per field: quantities show
//! up as `"12"`, free text as `85`, flags as `"YES"`. These helpers decode
//! whatever arrives into the field's Rust type instead of rejecting the
//! whole document.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Parse a leading integer the way a form input does: optional sign, then
/// digits, anything after is ignored. Unparsable or negative input is `0`.
pub fn parse_int_or_zero(input: &str) -> u32 {
    let trimmed = input.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    if negative || digits.is_empty() {
        return 0;
    }

    digits.parse::<u64>().map_or(u32::MAX, clamp_u32)
}

fn clamp_u32(n: u64) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

fn value_to_text(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn value_to_count(value: &Value) -> u32 {
    match value {
        Value::Number(n) => match n.as_u64() {
            Some(u) => clamp_u32(u),
            None => n
                .as_f64()
                .filter(|f| f.is_finite() && *f > 0.0)
                .map_or(0, |f| clamp_u32(f.trunc() as u64)),
        },
        Value::String(s) => parse_int_or_zero(s),
        _ => 0,
    }
}

pub fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(value_to_text(Value::deserialize(deserializer)?))
}

pub fn text_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => Vec::new(),
        Value::Array(items) => items.into_iter().map(value_to_text).collect(),
        other => vec![value_to_text(other)],
    })
}

/// `null` decodes to the type's default; anything else decodes as usual.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

pub fn count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(value_to_count(&Value::deserialize(deserializer)?))
}

pub fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => {
            let s = s.trim();
            s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("yes")
        }
        _ => false,
    })
}

pub fn opt_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}
