//! Conversions from payload values to typed cells, and backfill defaults for absent values.

mod backfill;
mod coerce;

pub use backfill::default_for;
pub use coerce::coerce_value;
