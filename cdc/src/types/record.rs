use std::sync::Arc;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::schema::DestinationSchema;
use crate::types::Cell;

/// Name of the injected version token field.
pub const LSN_FIELD: &str = "lsn";

/// Name of the injected soft-delete flag field.
pub const IS_DELETED_FIELD: &str = "is_deleted";

/// A fully populated record shaped by the schema of its destination.
///
/// Holds exactly one [`Cell`] per declared field, in declaration order, plus the version
/// token and soft-delete flag derived from the envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct DestinationRecord {
    schema: Arc<DestinationSchema>,
    values: Vec<Cell>,
    version: u64,
    is_deleted: u8,
}

impl DestinationRecord {
    /// Creates a record. `values` must line up with the schema fields.
    pub(crate) fn new(
        schema: Arc<DestinationSchema>,
        values: Vec<Cell>,
        version: u64,
        is_deleted: bool,
    ) -> Self {
        debug_assert_eq!(schema.fields.len(), values.len());

        Self {
            schema,
            values,
            version,
            is_deleted: is_deleted as u8,
        }
    }

    /// Returns the destination name.
    pub fn destination(&self) -> &str {
        &self.schema.name
    }

    pub fn schema(&self) -> &Arc<DestinationSchema> {
        &self.schema
    }

    /// Returns the values in field declaration order.
    pub fn values(&self) -> &[Cell] {
        &self.values
    }

    /// Returns the value of a declared field.
    pub fn get(&self, field: &str) -> Option<&Cell> {
        self.schema
            .field_index(field)
            .and_then(|index| self.values.get(index))
    }

    /// Returns the numeric version token, used by the sink for last-writer-wins merges.
    pub fn version_token(&self) -> u64 {
        self.version
    }

    /// Returns `1` for deleted rows and `0` otherwise.
    pub fn is_deleted(&self) -> u8 {
        self.is_deleted
    }

    /// Returns the values of the `order_by` fields, identifying the logical row.
    ///
    /// Destinations without `order_by` are keyed by all of their values.
    pub fn key_values(&self) -> Vec<&Cell> {
        let indices = self.schema.key_indices();
        if indices.is_empty() {
            return self.values.iter().collect();
        }

        indices.into_iter().map(|index| &self.values[index]).collect()
    }

    /// Returns the outbound JSON shape: declared fields, then `is_deleted` and `lsn`.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl Serialize for DestinationRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len() + 2))?;
        for (field, value) in self.schema.fields.iter().zip(&self.values) {
            map.serialize_entry(&field.name, value)?;
        }
        map.serialize_entry(IS_DELETED_FIELD, &self.is_deleted)?;
        map.serialize_entry(LSN_FIELD, &self.version)?;
        map.end()
    }
}
