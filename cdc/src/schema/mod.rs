//! Destination schemas and the type registry used for routing and backfill.

mod field_type;
mod registry;

pub use field_type::{DeclaredType, FieldType};
pub use registry::{DestinationSchema, FieldSchema, TypeRegistry};
