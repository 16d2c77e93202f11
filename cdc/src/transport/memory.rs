use std::collections::VecDeque;
use std::sync::Arc;

use cdc_config::shared::RedeliveryConfig;
use tokio::sync::Mutex;

use crate::error::CdcResult;
use crate::transport::{Delivery, DeliveryId, DeliveryTracker, EventSource};

#[derive(Debug, Default)]
struct Inner {
    pending: VecDeque<Vec<u8>>,
    next_id: DeliveryId,
    closed: bool,
}

/// In-memory event source for tests and embedding.
///
/// Clones share the same queue, so one handle can keep pushing payloads while another is
/// consumed by a worker pool. [`EventSource::receive`] returns [`None`] only after
/// [`MemorySource::close`] was called and every delivery was acked. The tracker keeps the full
/// ack and nack history.
#[derive(Debug, Clone)]
pub struct MemorySource {
    inner: Arc<Mutex<Inner>>,
    tracker: DeliveryTracker,
}

impl Default for MemorySource {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            tracker: DeliveryTracker::new().with_history(),
        }
    }
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a closed source holding `payloads` in order.
    pub fn from_payloads<I, P>(payloads: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Vec<u8>>,
    {
        let inner = Inner {
            pending: payloads.into_iter().map(Into::into).collect(),
            next_id: 0,
            closed: true,
        };

        Self {
            inner: Arc::new(Mutex::new(inner)),
            tracker: DeliveryTracker::new().with_history(),
        }
    }

    /// Sets the backoff of nacked deliveries. Call before handing out clones.
    pub fn with_redelivery(mut self, redelivery: RedeliveryConfig) -> Self {
        self.tracker = self.tracker.with_redelivery(redelivery);
        self
    }

    /// Appends a payload to the queue.
    pub async fn push(&self, payload: impl Into<Vec<u8>>) {
        {
            let mut inner = self.inner.lock().await;
            inner.pending.push_back(payload.into());
        }
        self.tracker.wake();
    }

    /// Marks the source as exhausted once the queued payloads are consumed.
    pub async fn close(&self) {
        {
            let mut inner = self.inner.lock().await;
            inner.closed = true;
        }
        self.tracker.wake();
    }

    /// Returns the tracker holding the ack and nack history of this source.
    pub fn tracker(&self) -> &DeliveryTracker {
        &self.tracker
    }

    /// Returns the number of payloads not yet handed out.
    pub async fn pending(&self) -> usize {
        let inner = self.inner.lock().await;
        inner.pending.len()
    }
}

impl EventSource for MemorySource {
    type Acknowledger = DeliveryTracker;

    fn acknowledger(&self) -> Self::Acknowledger {
        self.tracker.clone()
    }

    async fn receive(&mut self) -> CdcResult<Option<Delivery>> {
        loop {
            let notified = self.tracker.notified();

            if let Some(delivery) = self.tracker.next_redelivery() {
                return Ok(Some(delivery));
            }

            {
                let mut inner = self.inner.lock().await;
                if let Some(payload) = inner.pending.pop_front() {
                    let delivery = Delivery::new(inner.next_id, payload);
                    inner.next_id += 1;
                    drop(inner);

                    self.tracker.track(&delivery);
                    return Ok(Some(delivery));
                }

                if inner.closed && self.tracker.is_settled() {
                    return Ok(None);
                }
            }

            tokio::select! {
                _ = notified => {}
                _ = self.tracker.redelivery_ready() => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::Acknowledger;

    #[tokio::test(start_paused = true)]
    async fn drains_then_waits_for_settlement() {
        let mut source = MemorySource::from_payloads(["a", "b"]);
        let acknowledger = source.acknowledger();

        let first = source.receive().await.unwrap().unwrap();
        let second = source.receive().await.unwrap().unwrap();
        assert_eq!((first.id, first.payload.as_slice()), (0, b"a".as_slice()));
        assert_eq!((second.id, second.payload.as_slice()), (1, b"b".as_slice()));

        acknowledger.ack(first.id).await.unwrap();
        acknowledger.nack(second.id, "retry").await.unwrap();

        let redelivered = source.receive().await.unwrap().unwrap();
        assert_eq!(redelivered.id, 1);
        assert_eq!(redelivered.redeliveries, 1);

        acknowledger.ack(redelivered.id).await.unwrap();
        assert!(source.receive().await.unwrap().is_none());
        assert_eq!(source.tracker().acked(), vec![0, 1]);
    }

    #[tokio::test(start_paused = true)]
    async fn fresh_payloads_pass_a_waiting_redelivery() {
        let redelivery = RedeliveryConfig {
            initial_delay_ms: 500,
            ..RedeliveryConfig::default()
        };
        let mut source = MemorySource::from_payloads(["a", "b"]).with_redelivery(redelivery);
        let acknowledger = source.acknowledger();

        let first = source.receive().await.unwrap().unwrap();
        acknowledger.nack(first.id, "retry").await.unwrap();

        let started = tokio::time::Instant::now();
        let second = source.receive().await.unwrap().unwrap();
        assert_eq!(second.id, 1);
        acknowledger.ack(second.id).await.unwrap();

        let redelivered = source.receive().await.unwrap().unwrap();
        assert_eq!((redelivered.id, redelivered.redeliveries), (0, 1));
        assert!(started.elapsed() >= std::time::Duration::from_millis(500));
        assert_eq!(source.tracker().nacked(), vec![(0, "retry".to_owned())]);
    }

    #[tokio::test]
    async fn pushed_payload_wakes_receiver() {
        let source = MemorySource::new();
        let mut receiver = source.clone();

        let handle = tokio::spawn(async move { receiver.receive().await });
        tokio::task::yield_now().await;
        source.push("late").await;

        let delivery = handle.await.unwrap().unwrap().unwrap();
        assert_eq!(delivery.payload, b"late".to_vec());
        assert_eq!(source.pending().await, 0);
    }
}
