use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Number, Value};

use crate::error::{CdcError, CdcResult, ErrorKind};
use crate::schema::FieldType;
use crate::types::Cell;

/// Naive timestamp formats interpreted as UTC.
const NAIVE_TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Converts a non-null payload value into a [`Cell`] of the given type.
///
/// Returns [`ErrorKind::ConversionError`] naming `field` when the value cannot represent the
/// type. `null` is not accepted here, absent values are backfilled by the caller.
pub fn coerce_value(field: &str, value: &Value, field_type: FieldType) -> CdcResult<Cell> {
    let cell = match (field_type, value) {
        (FieldType::String, Value::String(s)) => Some(Cell::String(s.clone())),
        (FieldType::String, Value::Number(n)) => Some(Cell::String(n.to_string())),
        (FieldType::String, Value::Bool(b)) => Some(Cell::String(b.to_string())),

        (FieldType::Integer, Value::Number(n)) => number_to_i64(n).map(Cell::I64),
        (FieldType::Integer, Value::String(s)) => parse_integer(s).map(Cell::I64),

        (FieldType::Float, Value::Number(n)) => n.as_f64().map(Cell::F64),
        (FieldType::Float, Value::String(s)) => f64::from_str(s)
            .ok()
            .filter(|f| f.is_finite())
            .map(Cell::F64),

        (FieldType::Boolean, Value::Bool(b)) => Some(Cell::Bool(*b)),
        (FieldType::Boolean, Value::Number(n)) => match n.as_i64() {
            Some(0) => Some(Cell::Bool(false)),
            Some(1) => Some(Cell::Bool(true)),
            _ => None,
        },
        (FieldType::Boolean, Value::String(s)) => parse_bool(s).map(Cell::Bool),

        (FieldType::Timestamp, Value::String(s)) => parse_timestamp(s).map(Cell::Timestamp),
        (FieldType::Timestamp, Value::Number(n)) => n
            .as_i64()
            .and_then(DateTime::from_timestamp_millis)
            .map(Cell::Timestamp),

        (FieldType::Decimal, Value::Number(n)) => {
            BigDecimal::from_str(&n.to_string()).ok().map(Cell::Numeric)
        }
        (FieldType::Decimal, Value::String(s)) => {
            return BigDecimal::from_str(s)
                .map(Cell::Numeric)
                .map_err(|err| conversion_error(field, value, field_type).with_source(err));
        }

        _ => None,
    };

    match cell {
        Some(cell) => Ok(cell),
        None => Err(conversion_error(field, value, field_type)),
    }
}

#[track_caller]
fn conversion_error(field: &str, value: &Value, field_type: FieldType) -> CdcError {
    CdcError::from((
        ErrorKind::ConversionError,
        "Could not convert payload value",
        format!("field '{field}' expects {field_type}, got {value}"),
    ))
}

/// Accepts integers in `i64` range and floats without a fractional part.
fn number_to_i64(n: &Number) -> Option<i64> {
    if let Some(value) = n.as_i64() {
        return Some(value);
    }

    let value = n.as_f64()?;
    if value.fract() == 0.0 && value >= i64::MIN as f64 && value < i64::MAX as f64 {
        return Some(value as i64);
    }

    None
}

/// Accepts an optional leading `-` followed by decimal digits.
fn parse_integer(s: &str) -> Option<i64> {
    let digits = s.strip_prefix('-').unwrap_or(s);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    s.parse().ok()
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "t" => Some(true),
        "false" | "f" => Some(false),
        _ => None,
    }
}

/// Parses RFC 3339, or a naive date time interpreted as UTC.
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(s) {
        return Some(timestamp.with_timezone(&Utc));
    }

    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
        .map(|naive| naive.and_utc())
}
