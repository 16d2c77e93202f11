//! Resolution of source table names to registered destinations.

use std::sync::Arc;

use crate::schema::{DestinationSchema, TypeRegistry};

/// Handle to a registered destination, as returned by [`DestinationRouter::resolve`].
#[derive(Debug, Clone)]
pub struct DestinationHandle {
    schema: Arc<DestinationSchema>,
}

impl DestinationHandle {
    pub fn name(&self) -> &str {
        &self.schema.name
    }

    pub fn schema(&self) -> &Arc<DestinationSchema> {
        &self.schema
    }
}

/// Maps table names to destination handles through the [`TypeRegistry`].
///
/// Matching is exact and case-sensitive: `Customer` does not resolve to `customer`, and no
/// singular/plural or whitespace normalization takes place. Callers send unresolved events to
/// the dead letter sink. Lookups are read-only hash map accesses and need no synchronization.
#[derive(Debug, Clone)]
pub struct DestinationRouter {
    registry: Arc<TypeRegistry>,
}

impl DestinationRouter {
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self { registry }
    }

    /// Returns the destination registered under exactly `table`, if any.
    pub fn resolve(&self, table: &str) -> Option<DestinationHandle> {
        self.registry
            .get(table)
            .map(|schema| DestinationHandle {
                schema: schema.clone(),
            })
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldSchema, FieldType};

    fn router() -> DestinationRouter {
        let registry = TypeRegistry::new(vec![
            DestinationSchema::new("customer", vec![FieldSchema::new("id", FieldType::Integer)]),
            DestinationSchema::new("orderitem", vec![FieldSchema::new("id", FieldType::Integer)]),
        ])
        .unwrap();

        DestinationRouter::new(Arc::new(registry))
    }

    #[test]
    fn resolve_registered_destination() {
        let handle = router().resolve("customer").unwrap();
        assert_eq!(handle.name(), "customer");
        assert_eq!(handle.schema().fields.len(), 1);
    }

    #[test]
    fn resolve_is_case_sensitive_and_exact() {
        let router = router();
        for table in ["Customer", "CUSTOMER", "customers", "order_item", "OrderItem", ""] {
            assert!(router.resolve(table).is_none(), "table {table:?}");
        }
    }
}
