use std::future::Future;

use crate::error::CdcResult;

/// Identifier of a delivery, unique within one event source.
pub type DeliveryId = u64;

/// One envelope as handed out by the transport, still in its raw wire form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub id: DeliveryId,
    pub payload: Vec<u8>,
    /// Number of times this delivery was handed out before, `0` on first delivery.
    pub redeliveries: u32,
}

impl Delivery {
    pub fn new(id: DeliveryId, payload: Vec<u8>) -> Self {
        Self {
            id,
            payload,
            redeliveries: 0,
        }
    }
}

/// Settles deliveries with the transport.
pub trait Acknowledger: Clone + Send + Sync + 'static {
    /// Confirms that the delivery was fully handled and must not be delivered again.
    fn ack(&self, id: DeliveryId) -> impl Future<Output = CdcResult<()>> + Send;

    /// Hands the delivery back to the transport for redelivery.
    fn nack(&self, id: DeliveryId, reason: &str) -> impl Future<Output = CdcResult<()>> + Send;
}

/// Source of deliveries.
///
/// [`EventSource::receive`] waits until a delivery is available and returns [`None`] once the
/// source is exhausted and every delivery it handed out has been acked.
pub trait EventSource {
    type Acknowledger: Acknowledger;

    /// Returns an acknowledger settling deliveries of this source.
    fn acknowledger(&self) -> Self::Acknowledger;

    /// Receives the next delivery.
    fn receive(&mut self) -> impl Future<Output = CdcResult<Option<Delivery>>> + Send;
}
