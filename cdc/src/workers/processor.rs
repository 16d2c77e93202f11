use metrics::counter;
use tracing::{debug, error, warn};

use crate::dead_letter::{DeadLetterRecord, DeadLetterSink};
use crate::destination::Destination;
use crate::error::{CdcError, CdcResult};
use crate::metrics::{
    CDC_DEAD_LETTER_FAILURES_TOTAL, CDC_DEAD_LETTERS_TOTAL, CDC_DESTINATION_WRITE_FAILURES_TOTAL,
    CDC_EVENTS_RECEIVED_TOTAL, CDC_RECORDS_WRITTEN_TOTAL, DESTINATION_LABEL, REASON_KIND_LABEL,
};
use crate::transformer::Transformer;
use crate::transport::Delivery;
use crate::types::ChangeEnvelope;

/// Final state of a successfully handled delivery. Every outcome is acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The record was written to its destination.
    Written,
    /// The event was captured by the dead letter sink.
    DeadLettered,
    /// The event was dead letter eligible but the sink failed to capture it.
    ///
    /// The event is dropped after logging and counting the failure, so a broken sink cannot
    /// stall the stream.
    DeadLetterFailed,
}

/// Processes single deliveries: decode, transform, then write or dead letter.
#[derive(Debug, Clone)]
pub struct EventProcessor<D, L> {
    transformer: Transformer,
    destination: D,
    dead_letters: L,
}

impl<D, L> EventProcessor<D, L>
where
    D: Destination,
    L: DeadLetterSink,
{
    pub fn new(transformer: Transformer, destination: D, dead_letters: L) -> Self {
        Self {
            transformer,
            destination,
            dead_letters,
        }
    }

    /// Handles one delivery.
    ///
    /// Per-event failures (see [`crate::error::ErrorKind::is_dead_letter_eligible`]) end in the
    /// dead letter sink and are reported as an [`Outcome`]. Any other error, most notably a
    /// failed destination write, is returned so the delivery is handed back to the transport.
    pub async fn process(&self, delivery: &Delivery) -> CdcResult<Outcome> {
        counter!(CDC_EVENTS_RECEIVED_TOTAL).increment(1);

        match self.route(delivery).await {
            Ok(destination) => {
                counter!(CDC_RECORDS_WRITTEN_TOTAL, DESTINATION_LABEL => destination).increment(1);
                Ok(Outcome::Written)
            }
            Err(err) if err.kind().is_dead_letter_eligible() => {
                Ok(self.dead_letter(delivery, &err).await)
            }
            Err(err) => {
                counter!(CDC_DESTINATION_WRITE_FAILURES_TOTAL).increment(1);
                Err(err)
            }
        }
    }

    /// Writes the delivery to its destination, returning the destination name.
    async fn route(&self, delivery: &Delivery) -> CdcResult<String> {
        let envelope = ChangeEnvelope::decode(&delivery.payload)?;
        let record = self.transformer.transform(&envelope)?;
        let destination = record.destination().to_owned();
        let lsn = record.version_token();
        let is_deleted = record.is_deleted();

        self.destination.write(record).await?;
        debug!(
            delivery_id = delivery.id,
            destination = %destination,
            table = %envelope.table,
            operation = envelope.operation.as_str(),
            lsn,
            is_deleted,
            "record written"
        );

        Ok(destination)
    }

    async fn dead_letter(&self, delivery: &Delivery, err: &CdcError) -> Outcome {
        let record = DeadLetterRecord::from_bytes(&delivery.payload, err);

        warn!(
            delivery_id = delivery.id,
            table = record.table.as_deref().unwrap_or_default(),
            reason = %record.reason,
            "diverting event to dead letter sink"
        );

        let kind = err.kind().as_str();
        match self.dead_letters.capture(record).await {
            Ok(()) => {
                counter!(CDC_DEAD_LETTERS_TOTAL, REASON_KIND_LABEL => kind).increment(1);
                Outcome::DeadLettered
            }
            Err(capture_err) => {
                error!(
                    delivery_id = delivery.id,
                    error = %capture_err,
                    "dead letter sink failed to capture event, dropping it"
                );
                counter!(CDC_DEAD_LETTER_FAILURES_TOTAL).increment(1);
                Outcome::DeadLetterFailed
            }
        }
    }

    /// Shuts down the destination and the dead letter sink.
    pub async fn shutdown(&self) -> CdcResult<()> {
        let mut errors = Vec::new();

        if let Err(err) = self.destination.shutdown().await {
            errors.push(err);
        }
        if let Err(err) = self.dead_letters.shutdown().await {
            errors.push(err);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.into())
        }
    }
}
