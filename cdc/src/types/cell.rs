use bigdecimal::BigDecimal;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};

/// A typed, non-null value of a destination record field.
///
/// Cells are never null. Absent values are replaced by the backfill default of the field type
/// before a record is assembled.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    String(String),
    I64(i64),
    F64(f64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    Numeric(BigDecimal),
}

impl Serialize for Cell {
    /// Timestamps serialize as RFC 3339 strings with microsecond precision and decimals as
    /// their exact string form.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::String(value) => serializer.serialize_str(value),
            Cell::I64(value) => serializer.serialize_i64(*value),
            Cell::F64(value) => serializer.serialize_f64(*value),
            Cell::Bool(value) => serializer.serialize_bool(*value),
            Cell::Timestamp(value) => {
                serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Micros, true))
            }
            Cell::Numeric(value) => serializer.serialize_str(&value.to_string()),
        }
    }
}
