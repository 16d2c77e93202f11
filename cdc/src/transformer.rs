//! Conversion of change envelopes into destination records.

use tracing::trace;

use crate::bail;
use crate::conversions::{coerce_value, default_for};
use crate::error::{CdcResult, ErrorKind};
use crate::router::DestinationRouter;
use crate::types::{ChangeEnvelope, DestinationRecord, Lsn};

/// Turns [`ChangeEnvelope`]s into fully populated [`DestinationRecord`]s.
///
/// The transformer is pure: it performs no I/O, never mutates the registry and holds no
/// per-event state, so the same envelope always yields the same record and a single instance
/// can be shared by any number of workers.
#[derive(Debug, Clone)]
pub struct Transformer {
    router: DestinationRouter,
}

impl Transformer {
    pub fn new(router: DestinationRouter) -> Self {
        Self { router }
    }

    pub fn router(&self) -> &DestinationRouter {
        &self.router
    }

    /// Transforms one envelope.
    ///
    /// Derives the version token from the ordering token and the soft-delete flag from the
    /// operation, resolves the destination, and fills every declared field with the coerced
    /// payload value or, when the value is absent or `null`, with the backfill default of the
    /// field type.
    ///
    /// Errors are per-event and eligible for the dead letter sink:
    /// [`ErrorKind::InvalidOrderingToken`], [`ErrorKind::DestinationNotRegistered`] (detail is
    /// the table name), [`ErrorKind::MissingKeyField`] for deletes without their key, and
    /// [`ErrorKind::ConversionError`].
    pub fn transform(&self, envelope: &ChangeEnvelope) -> CdcResult<DestinationRecord> {
        let lsn: Lsn = envelope.lsn.parse()?;
        let is_deleted = envelope.operation.is_delete();

        let Some(destination) = self.router.resolve(&envelope.table) else {
            bail!(
                ErrorKind::DestinationNotRegistered,
                "No destination registered",
                envelope.table.clone()
            );
        };
        let schema = destination.schema();

        if is_deleted {
            for key in &schema.order_by {
                if envelope.payload.get(key).is_none_or(|value| value.is_null()) {
                    bail!(
                        ErrorKind::MissingKeyField,
                        "Delete event is missing a key field",
                        format!("table '{}' requires non-null '{key}'", envelope.table)
                    );
                }
            }
        }

        let mut values = Vec::with_capacity(schema.fields.len());
        for field in &schema.fields {
            let value = match envelope.payload.get(&field.name) {
                Some(value) if !value.is_null() => {
                    coerce_value(&field.name, value, field.base_type())?
                }
                _ => default_for(field.base_type()),
            };
            values.push(value);
        }

        for key in envelope.payload.keys() {
            if schema.field_index(key).is_none() {
                trace!(table = %envelope.table, field = %key, "ignoring undeclared payload field");
            }
        }

        Ok(DestinationRecord::new(
            schema.clone(),
            values,
            lsn.into(),
            is_deleted,
        ))
    }
}
