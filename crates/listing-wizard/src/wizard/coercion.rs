//! Total shape coercions applied to loosely typed draft values.
//!
//! Every function takes the raw value (absent keys arrive as `None`) and a
//! default of the target shape, and always returns a value of that shape.

use serde_json::{Map, Number, Value};

const LIST_SEPARATOR: char = ',';

pub fn ensure_object(value: Option<&Value>, default: &Map<String, Value>) -> Map<String, Value> {
    match value {
        None | Some(Value::Null) => default.clone(),
        Some(Value::Object(map)) => map.clone(),
        Some(Value::String(raw)) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(parsed)) => parsed,
            _ => {
                let mut wrapped = Map::new();
                wrapped.insert("value".to_string(), Value::String(raw.clone()));
                wrapped
            }
        },
        Some(_) => default.clone(),
    }
}

pub fn ensure_array(value: Option<&Value>, default: &[Value]) -> Vec<Value> {
    match value {
        None | Some(Value::Null) => default.to_vec(),
        Some(Value::Array(items)) => items.clone(),
        Some(Value::String(raw)) if raw.contains(LIST_SEPARATOR) => raw
            .split(LIST_SEPARATOR)
            .map(str::trim)
            .filter(|piece| !piece.is_empty())
            .map(|piece| Value::String(piece.to_string()))
            .collect(),
        Some(Value::String(raw)) if raw.trim().is_empty() => default.to_vec(),
        Some(Value::String(raw)) => vec![Value::String(raw.trim().to_string())],
        Some(_) => default.to_vec(),
    }
}

pub fn ensure_number(value: Option<&Value>, default: &Number) -> Number {
    match value {
        Some(Value::Number(number)) => match number.as_f64() {
            Some(float) if float.is_finite() => number.clone(),
            _ => default.clone(),
        },
        Some(Value::String(raw)) => parse_number(raw).unwrap_or_else(|| default.clone()),
        Some(Value::Bool(flag)) => Number::from(u8::from(*flag)),
        _ => default.clone(),
    }
}

pub fn ensure_string(value: Option<&Value>, default: &str) -> String {
    match value {
        None | Some(Value::Null) => default.to_string(),
        Some(Value::String(raw)) => raw.clone(),
        Some(Value::Number(number)) => number.to_string(),
        Some(Value::Bool(flag)) => flag.to_string(),
        Some(structured) => structured.to_string(),
    }
}

pub fn ensure_boolean(value: Option<&Value>, default: bool) -> bool {
    match value {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(raw)) => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => true,
            "false" | "0" | "no" => false,
            _ => default,
        },
        Some(Value::Number(number)) => match number.as_f64() {
            Some(float) if float.is_nan() => default,
            Some(float) => float != 0.0,
            None => default,
        },
        _ => default,
    }
}

/// Parses a trimmed numeric string, keeping integral values as integers.
fn parse_number(raw: &str) -> Option<Number> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(integer) = trimmed.parse::<i64>() {
        return Some(Number::from(integer));
    }

    let float = trimmed.parse::<f64>().ok().filter(|float| float.is_finite())?;
    if float.fract() == 0.0 && float.abs() < i64::MAX as f64 {
        return Some(Number::from(float as i64));
    }
    Number::from_f64(float)
}
