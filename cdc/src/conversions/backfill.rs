use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};

use crate::schema::FieldType;
use crate::types::Cell;

/// Returns the non-null substitute for an absent or `null` value of the given type.
///
/// The mapping is total and fixed: empty string, `0`, `0.0`, `false`, the Unix epoch and a
/// zero decimal. Timestamps use the epoch rather than wall-clock time so that transforming
/// the same envelope always yields the same record.
///
/// Backfilled values on deleted rows are placeholders. The `is_deleted` flag is the only
/// signal that the row was removed.
pub fn default_for(field_type: FieldType) -> Cell {
    match field_type {
        FieldType::String => Cell::String(String::new()),
        FieldType::Integer => Cell::I64(0),
        FieldType::Float => Cell::F64(0.0),
        FieldType::Boolean => Cell::Bool(false),
        FieldType::Timestamp => Cell::Timestamp(DateTime::<Utc>::UNIX_EPOCH),
        FieldType::Decimal => Cell::Numeric(BigDecimal::from(0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DeclaredType;

    #[test]
    fn defaults_per_type() {
        assert_eq!(default_for(FieldType::String), Cell::String(String::new()));
        assert_eq!(default_for(FieldType::Integer), Cell::I64(0));
        assert_eq!(default_for(FieldType::Float), Cell::F64(0.0));
        assert_eq!(default_for(FieldType::Boolean), Cell::Bool(false));
        assert_eq!(
            default_for(FieldType::Timestamp),
            Cell::Timestamp(DateTime::from_timestamp(0, 0).unwrap())
        );
        assert_eq!(
            default_for(FieldType::Decimal),
            Cell::Numeric("0.00".parse::<BigDecimal>().unwrap())
        );
    }

    #[test]
    fn wrapped_types_use_base_default() {
        let declared: DeclaredType = "optional<annotated<timestamp, datetime64>>".parse().unwrap();
        assert_eq!(
            default_for(declared.base_type()),
            Cell::Timestamp(DateTime::<Utc>::UNIX_EPOCH)
        );
    }
}
