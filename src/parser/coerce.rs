//! Field-level coercions for loosely typed upstream JSON.
//!
//! Every function here is total: a missing or malformed field comes back as an
//! `Err(CoercionError)` (or an explicit placeholder for strings), never a panic.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum CoercionError {
    #[error("field is missing")]
    Missing,
    #[error("field has an unsupported type")]
    WrongType,
    #[error("field is not a finite number")]
    NotANumber,
    #[error("field is out of range")]
    OutOfRange,
}

/// Accepts a JSON number or a numeric string.
pub fn coerce_f64(value: Option<&Value>) -> Result<f64, CoercionError> {
    match value {
        None | Some(Value::Null) => Err(CoercionError::Missing),
        Some(Value::Number(number)) => number
            .as_f64()
            .filter(|f| f.is_finite())
            .ok_or(CoercionError::NotANumber),
        Some(Value::String(text)) => {
            let text = text.trim();
            if text.is_empty() {
                return Err(CoercionError::Missing);
            }
            text.parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .ok_or(CoercionError::NotANumber)
        }
        Some(_) => Err(CoercionError::WrongType),
    }
}

/// Non-negative whole number (trophy counts, levels, offsets, ids).
pub fn coerce_count(value: Option<&Value>) -> Result<u64, CoercionError> {
    let number = coerce_f64(value)?;
    // 2^53: beyond this f64 no longer represents every integer
    if number < 0.0 || number.fract() != 0.0 || number > 9_007_199_254_740_992.0 {
        return Err(CoercionError::OutOfRange);
    }
    Ok(number as u64)
}

/// Rounded and clamped to `[0, 100]`.
pub fn coerce_percentage(value: Option<&Value>) -> Result<u8, CoercionError> {
    coerce_f64(value).map(clamp_percentage)
}

pub fn clamp_percentage(value: f64) -> u8 {
    value.round().clamp(0.0, 100.0) as u8
}

/// Strings default to `""` so downstream key building never sees a missing value.
pub fn string_or_empty(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(number)) => number.to_string(),
        _ => String::new(),
    }
}

/// Non-blank string or nothing.
pub fn non_blank_string(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(text)) if !text.trim().is_empty() => Some(text.clone()),
        _ => None,
    }
}

/// Array items, or an empty slice for anything that is not an array.
pub fn array_items(value: Option<&Value>) -> &[Value] {
    value
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}
