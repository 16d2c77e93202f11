use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// One field of a destination table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldConfig {
    pub name: String,
    /// Declared type such as `integer`, `optional<string>` or `annotated<integer, uint64>`.
    #[serde(rename = "type")]
    pub field_type: String,
}

/// A destination table records are routed to.
///
/// `name` must equal the source table name exactly, including case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationConfig {
    pub name: String,
    pub fields: Vec<FieldConfig>,
    /// Fields identifying a logical row. Rows with equal keys are merged by version.
    #[serde(default)]
    pub order_by: Vec<String>,
}

impl DestinationConfig {
    /// Checks the shape of the destination. Field types are checked when the registry is built.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::InvalidFieldValue {
                field: "destinations.name".to_owned(),
                constraint: "must not be empty".to_owned(),
            });
        }

        if self.fields.is_empty() {
            return Err(ValidationError::EmptyDestination(self.name.clone()));
        }

        Ok(())
    }
}
