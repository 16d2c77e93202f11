use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use cdc_config::shared::RedeliveryConfig;
use tokio::sync::Notify;
use tokio::sync::futures::Notified;
use tokio::time::Instant;
use tracing::debug;

use crate::bail;
use crate::error::{CdcResult, ErrorKind};
use crate::transport::{Acknowledger, Delivery, DeliveryId};

/// A nacked delivery waiting for its backoff delay to pass.
#[derive(Debug)]
struct PendingRedelivery {
    delivery: Delivery,
    due_at: Instant,
}

/// Settlement log kept only when requested with [`DeliveryTracker::with_history`].
#[derive(Debug, Default)]
struct SettlementHistory {
    acked: Vec<DeliveryId>,
    nacked: Vec<(DeliveryId, String)>,
}

#[derive(Debug, Default)]
struct TrackerState {
    in_flight: HashMap<DeliveryId, Delivery>,
    redeliveries: VecDeque<PendingRedelivery>,
    acked_total: u64,
    nacked_total: u64,
    history: Option<SettlementHistory>,
}

/// Bookkeeping of handed out deliveries for sources without native acknowledgement.
///
/// A nacked delivery is queued for redelivery and handed out again by the owning source once
/// its backoff delay, growing with every redelivery, has passed. Until then fresh input keeps
/// flowing. Waiters on [`DeliveryTracker::notified`] are woken on every settlement.
///
/// Only unsettled deliveries are retained. Settled ones are counted, and their ids are kept
/// only by trackers built with [`DeliveryTracker::with_history`].
///
/// Bookkeeping methods are synchronous so a source can take an input and track it without an
/// await point in between. A receive cancelled by shutdown therefore never loses a delivery.
#[derive(Debug, Clone, Default)]
pub struct DeliveryTracker {
    state: Arc<Mutex<TrackerState>>,
    notify: Arc<Notify>,
    redelivery: RedeliveryConfig,
}

impl DeliveryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the id of every settled delivery, exposed by [`DeliveryTracker::acked`] and
    /// [`DeliveryTracker::nacked`].
    pub fn with_history(self) -> Self {
        self.lock().history = Some(SettlementHistory::default());
        self
    }

    pub fn with_redelivery(mut self, redelivery: RedeliveryConfig) -> Self {
        self.redelivery = redelivery;
        self
    }

    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records `delivery` as handed out and not yet settled.
    pub fn track(&self, delivery: &Delivery) {
        let mut state = self.lock();
        state.in_flight.insert(delivery.id, delivery.clone());
    }

    /// Takes the oldest nacked delivery whose delay has passed, marking it in flight again.
    pub fn next_redelivery(&self) -> Option<Delivery> {
        let now = Instant::now();

        let mut state = self.lock();
        let position = state
            .redeliveries
            .iter()
            .position(|pending| pending.due_at <= now)?;
        let mut delivery = state.redeliveries.remove(position)?.delivery;
        delivery.redeliveries += 1;
        state.in_flight.insert(delivery.id, delivery.clone());

        Some(delivery)
    }

    /// Returns when the earliest queued redelivery becomes due.
    pub fn next_redelivery_at(&self) -> Option<Instant> {
        let state = self.lock();
        state
            .redeliveries
            .iter()
            .map(|pending| pending.due_at)
            .min()
    }

    /// Completes once the earliest queued redelivery is due. Never completes while nothing is
    /// queued, so callers race it against [`DeliveryTracker::notified`].
    pub async fn redelivery_ready(&self) {
        match self.next_redelivery_at() {
            Some(due_at) => tokio::time::sleep_until(due_at).await,
            None => std::future::pending().await,
        }
    }

    /// Returns `true` when nothing is in flight or waiting for redelivery.
    pub fn is_settled(&self) -> bool {
        let state = self.lock();
        state.in_flight.is_empty() && state.redeliveries.is_empty()
    }

    /// Returns a future completing on the next settlement or [`DeliveryTracker::wake`].
    ///
    /// The future observes wakeups from the moment it is created, so it must be created before
    /// checking for work to avoid missing one.
    pub fn notified(&self) -> Notified<'_> {
        self.notify.notified()
    }

    /// Wakes every task waiting on [`DeliveryTracker::notified`].
    pub fn wake(&self) {
        self.notify.notify_waiters();
    }

    /// Returns the ids of acked deliveries in ack order. Empty without history.
    pub fn acked(&self) -> Vec<DeliveryId> {
        let state = self.lock();
        state
            .history
            .as_ref()
            .map(|history| history.acked.clone())
            .unwrap_or_default()
    }

    /// Returns the ids and reasons of nacked deliveries in nack order. Empty without history.
    pub fn nacked(&self) -> Vec<(DeliveryId, String)> {
        let state = self.lock();
        state
            .history
            .as_ref()
            .map(|history| history.nacked.clone())
            .unwrap_or_default()
    }

    pub fn acked_total(&self) -> u64 {
        self.lock().acked_total
    }

    pub fn nacked_total(&self) -> u64 {
        self.lock().nacked_total
    }

    /// Returns the number of deliveries currently in flight.
    pub fn in_flight(&self) -> usize {
        let state = self.lock();
        state.in_flight.len()
    }
}

impl Acknowledger for DeliveryTracker {
    async fn ack(&self, id: DeliveryId) -> CdcResult<()> {
        {
            let mut state = self.lock();
            if state.in_flight.remove(&id).is_none() {
                bail!(
                    ErrorKind::InvalidState,
                    "Acknowledged a delivery that is not in flight",
                    id
                );
            }

            state.acked_total += 1;
            if let Some(history) = state.history.as_mut() {
                history.acked.push(id);
            }
        }

        self.wake();

        Ok(())
    }

    async fn nack(&self, id: DeliveryId, reason: &str) -> CdcResult<()> {
        {
            let mut state = self.lock();
            let Some(delivery) = state.in_flight.remove(&id) else {
                bail!(
                    ErrorKind::InvalidState,
                    "Rejected a delivery that is not in flight",
                    id
                );
            };

            let delay = self.redelivery.delay_for(delivery.redeliveries);
            debug!(
                delivery_id = id,
                reason,
                redeliveries = delivery.redeliveries,
                delay_ms = delay.as_millis() as u64,
                "delivery queued for redelivery"
            );
            state.redeliveries.push_back(PendingRedelivery {
                delivery,
                due_at: Instant::now() + delay,
            });

            state.nacked_total += 1;
            if let Some(history) = state.history.as_mut() {
                history.nacked.push((id, reason.to_owned()));
            }
        }

        self.wake();

        Ok(())
    }
}
