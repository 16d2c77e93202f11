use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use cdc_config::shared::DestinationConfig;
use tracing::{debug, info};

use crate::cdc_error;
use crate::error::{CdcError, CdcResult, ErrorKind};
use crate::schema::field_type::{DeclaredType, FieldType};
use crate::types::{IS_DELETED_FIELD, LSN_FIELD};

/// A declared field of a destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchema {
    pub name: String,
    pub declared_type: DeclaredType,
}

impl FieldSchema {
    pub fn new(name: impl Into<String>, declared_type: impl Into<DeclaredType>) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
        }
    }

    /// Returns the base type of the field with wrappers removed.
    pub fn base_type(&self) -> FieldType {
        self.declared_type.base_type()
    }
}

/// Schema of one destination: its name, ordered fields and logical-row key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationSchema {
    pub name: String,
    pub fields: Vec<FieldSchema>,
    /// Fields identifying a logical row. Deletes must carry non-null values for them.
    pub order_by: Vec<String>,
}

impl DestinationSchema {
    pub fn new(name: impl Into<String>, fields: Vec<FieldSchema>) -> Self {
        Self {
            name: name.into(),
            fields,
            order_by: Vec::new(),
        }
    }

    pub fn with_order_by<I, S>(mut self, order_by: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.order_by = order_by.into_iter().map(Into::into).collect();
        self
    }

    /// Returns the position of a field in declaration order.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.name == name)
    }

    /// Returns the positions of the `order_by` fields.
    ///
    /// Unknown names are skipped. Registered schemas never contain them.
    pub fn key_indices(&self) -> Vec<usize> {
        self.order_by
            .iter()
            .filter_map(|name| self.field_index(name))
            .collect()
    }

    /// Returns every problem with this schema. An empty vector means the schema is valid.
    fn validation_errors(&self) -> Vec<CdcError> {
        let mut errors = Vec::new();
        let mut seen = HashSet::with_capacity(self.fields.len());

        for field in &self.fields {
            if field.name == LSN_FIELD || field.name == IS_DELETED_FIELD {
                errors.push(cdc_error!(
                    ErrorKind::ReservedFieldName,
                    "Field name is reserved for record metadata",
                    format!("destination '{}' declares field '{}'", self.name, field.name)
                ));
            }

            if !seen.insert(field.name.as_str()) {
                errors.push(cdc_error!(
                    ErrorKind::DuplicateField,
                    "Field declared more than once",
                    format!("destination '{}' declares field '{}' twice", self.name, field.name)
                ));
            }
        }

        for key in &self.order_by {
            if !seen.contains(key.as_str()) {
                errors.push(cdc_error!(
                    ErrorKind::UnknownKeyField,
                    "Order by references an undeclared field",
                    format!("destination '{}' orders by unknown field '{key}'", self.name)
                ));
            }
        }

        errors
    }
}

/// Destination schemas keyed by exact destination name.
///
/// The registry is built once before any worker starts and is immutable afterwards, so it is
/// shared between workers without locking.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    schemas: HashMap<String, Arc<DestinationSchema>>,
}

impl TypeRegistry {
    /// Builds and validates a registry from destination schemas.
    ///
    /// All problems are collected and returned together as an aggregated [`CdcError`].
    pub fn new(schemas: Vec<DestinationSchema>) -> CdcResult<Self> {
        let mut errors = Vec::new();
        let mut registry = HashMap::with_capacity(schemas.len());

        for schema in schemas {
            errors.extend(schema.validation_errors());

            match registry.entry(schema.name.clone()) {
                Entry::Vacant(entry) => {
                    debug!(
                        destination = %schema.name,
                        fields = schema.fields.len(),
                        "registering destination"
                    );
                    entry.insert(Arc::new(schema));
                }
                Entry::Occupied(entry) => {
                    errors.push(cdc_error!(
                        ErrorKind::DuplicateDestination,
                        "Destination registered more than once",
                        entry.key()
                    ));
                }
            }
        }

        if !errors.is_empty() {
            return Err(errors.into());
        }

        info!(destinations = registry.len(), "type registry built");

        Ok(Self { schemas: registry })
    }

    /// Builds a registry from configuration, parsing every declared field type.
    pub fn from_config(destinations: &[DestinationConfig]) -> CdcResult<Self> {
        let mut errors = Vec::new();
        let mut schemas = Vec::with_capacity(destinations.len());

        for destination in destinations {
            let mut fields = Vec::with_capacity(destination.fields.len());
            for field in &destination.fields {
                match field.field_type.parse::<DeclaredType>() {
                    Ok(declared_type) => fields.push(FieldSchema::new(&field.name, declared_type)),
                    Err(err) => errors.push(cdc_error!(
                        ErrorKind::UnsupportedFieldType,
                        "Unsupported field type",
                        format!(
                            "destination '{}' field '{}': {}",
                            destination.name,
                            field.name,
                            err.detail().unwrap_or_default()
                        )
                    )),
                }
            }

            schemas.push(
                DestinationSchema::new(&destination.name, fields)
                    .with_order_by(destination.order_by.iter().cloned()),
            );
        }

        match Self::new(schemas) {
            Ok(registry) if errors.is_empty() => Ok(registry),
            Ok(_) => Err(errors.into()),
            Err(err) => {
                errors.push(err);
                Err(errors.into())
            }
        }
    }

    /// Returns the schema registered under exactly `name`.
    pub fn get(&self, name: &str) -> Option<&Arc<DestinationSchema>> {
        self.schemas.get(name)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Returns the registered destination names in sorted order.
    pub fn destination_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.schemas.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
