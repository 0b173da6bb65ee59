//! Text encoding of values for CSV fields
//!
//! Export renders every value as the text PostgreSQL itself would print, with
//! NULL as an empty field. Import turns a field back into a value according to
//! the configured `ValueInference` policy.

use std::fmt::Write as _;
use tablesync_core::Value;

use crate::ValueInference;

/// Fixed labels for IEEE 754 specials, matching PostgreSQL's float output.
fn float_special_label(value: f64) -> Option<&'static str> {
    if value.is_nan() {
        Some("NaN")
    } else if value.is_infinite() && value.is_sign_positive() {
        Some("Infinity")
    } else if value.is_infinite() {
        Some("-Infinity")
    } else {
        None
    }
}

/// Encode a value as the text of one CSV field
pub fn encode_field(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Float32(v) => match float_special_label(*v as f64) {
            Some(label) => label.to_string(),
            None => v.to_string(),
        },
        Value::Float64(v) => match float_special_label(*v) {
            Some(label) => label.to_string(),
            None => v.to_string(),
        },
        Value::Bytes(bytes) => {
            let mut out = String::with_capacity(2 + bytes.len() * 2);
            out.push_str("\\x");
            for byte in bytes {
                let _ = write!(out, "{:02x}", byte);
            }
            out
        }
        Value::Array(items) => encode_array(items),
        other => other.to_string(),
    }
}

/// PostgreSQL array literal: `{1,2,NULL}`, elements quoted when needed
fn encode_array(items: &[Value]) -> String {
    let elements = items
        .iter()
        .map(|item| match item {
            Value::Null => "NULL".to_string(),
            Value::Array(nested) => encode_array(nested),
            other => quote_array_element(&encode_field(other)),
        })
        .collect::<Vec<_>>();
    format!("{{{}}}", elements.join(","))
}

fn quote_array_element(text: &str) -> String {
    let needs_quotes = text.is_empty()
        || text.eq_ignore_ascii_case("null")
        || text
            .chars()
            .any(|c| matches!(c, ',' | '{' | '}' | '"' | '\\') || c.is_whitespace());
    if !needs_quotes {
        return text.to_string();
    }
    let escaped = text.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}

/// Decode one CSV field into a value
pub fn decode_field(field: &str, inference: ValueInference) -> Value {
    match inference {
        ValueInference::Text => Value::String(field.to_string()),
        ValueInference::Infer => infer_value(field),
    }
}

fn infer_value(field: &str) -> Value {
    if field.is_empty() {
        return Value::Null;
    }

    match field {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }

    if let Ok(v) = field.parse::<i64>() {
        return Value::Int64(v);
    }

    // Rust's float parser also accepts "inf" and "nan"; only plain decimals count.
    if looks_decimal(field)
        && let Ok(v) = field.parse::<f64>()
    {
        return Value::Float64(v);
    }

    Value::String(field.to_string())
}

fn looks_decimal(field: &str) -> bool {
    let digits = field.strip_prefix(['-', '+']).unwrap_or(field);
    digits.chars().any(|c| c.is_ascii_digit())
        && digits
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '-' | '+'))
}
