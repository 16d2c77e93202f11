use std::sync::Arc;

use crate::router::DestinationRouter;
use crate::schema::{DeclaredType, DestinationSchema, FieldSchema, FieldType, TypeRegistry};
use crate::transformer::Transformer;

/// Returns the schema of the `customer` destination.
pub fn customer_schema() -> DestinationSchema {
    DestinationSchema::new(
        "customer",
        vec![
            FieldSchema::new("id", FieldType::Integer),
            FieldSchema::new("email", FieldType::String),
            FieldSchema::new("name", FieldType::String),
        ],
    )
    .with_order_by(["id"])
}

/// Returns the schema of the `product` destination.
pub fn product_schema() -> DestinationSchema {
    DestinationSchema::new(
        "product",
        vec![
            FieldSchema::new("id", FieldType::Integer),
            FieldSchema::new("name", FieldType::String),
            FieldSchema::new("price", FieldType::Decimal),
            FieldSchema::new("in_stock", FieldType::Boolean),
            FieldSchema::new("created_at", FieldType::Timestamp),
        ],
    )
    .with_order_by(["id"])
}

/// Returns the schema of the `order` destination.
pub fn order_schema() -> DestinationSchema {
    DestinationSchema::new(
        "order",
        vec![
            FieldSchema::new("id", FieldType::Integer),
            FieldSchema::new("customer_id", FieldType::Integer),
            FieldSchema::new("total", FieldType::Decimal),
            FieldSchema::new("placed_at", FieldType::Timestamp),
            FieldSchema::new(
                "note",
                DeclaredType::Optional(Box::new(FieldType::String.into())),
            ),
        ],
    )
    .with_order_by(["id"])
}

/// Returns the schema of the `orderitem` destination.
pub fn order_item_schema() -> DestinationSchema {
    DestinationSchema::new(
        "orderitem",
        vec![
            FieldSchema::new("order_id", FieldType::Integer),
            FieldSchema::new("product_id", FieldType::Integer),
            FieldSchema::new(
                "quantity",
                DeclaredType::Annotated(Box::new(FieldType::Integer.into()), "uint32".to_owned()),
            ),
            FieldSchema::new("unit_price", FieldType::Decimal),
            FieldSchema::new("weight", FieldType::Float),
        ],
    )
    .with_order_by(["order_id", "product_id"])
}

/// Creates a registry with the `customer`, `product`, `order` and `orderitem` destinations.
pub fn sample_registry() -> TypeRegistry {
    TypeRegistry::new(vec![
        customer_schema(),
        product_schema(),
        order_schema(),
        order_item_schema(),
    ])
    .expect("sample registry is valid")
}

/// Creates a transformer over [`sample_registry`].
pub fn sample_transformer() -> Transformer {
    Transformer::new(DestinationRouter::new(Arc::new(sample_registry())))
}
