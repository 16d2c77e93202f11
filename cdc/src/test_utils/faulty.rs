use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use tokio::sync::Semaphore;

use crate::bail;
use crate::dead_letter::{DeadLetterRecord, DeadLetterSink};
use crate::destination::Destination;
use crate::destination::memory::MemoryDestination;
use crate::error::{CdcResult, ErrorKind};
use crate::types::DestinationRecord;

#[derive(Debug, Default)]
struct Faults {
    failures_remaining: AtomicU32,
    stalls_remaining: AtomicU32,
    stall: Duration,
    attempts: AtomicU32,
}

/// Takes one unit from `counter` if it is non-zero.
fn take_one(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |value| {
            value.checked_sub(1)
        })
        .is_ok()
}

/// Destination that injects failures before delegating to a [`MemoryDestination`].
///
/// The first writes fail or stall as configured. A gate, when set, blocks every write until
/// [`FaultyDestination::release`] grants it.
#[derive(Debug, Clone)]
pub struct FaultyDestination {
    inner: MemoryDestination,
    faults: Arc<Faults>,
    gate: Option<Arc<Semaphore>>,
}

impl FaultyDestination {
    /// Fails the first `failures` writes with [`ErrorKind::DestinationWriteFailed`].
    pub fn failing(failures: u32) -> Self {
        let faults = Faults {
            failures_remaining: AtomicU32::new(failures),
            ..Faults::default()
        };

        Self {
            inner: MemoryDestination::new(),
            faults: Arc::new(faults),
            gate: None,
        }
    }

    /// Sleeps for `stall` in each of the first `stalls` writes before writing.
    pub fn stalling(stalls: u32, stall: Duration) -> Self {
        let faults = Faults {
            stalls_remaining: AtomicU32::new(stalls),
            stall,
            ..Faults::default()
        };

        Self {
            inner: MemoryDestination::new(),
            faults: Arc::new(faults),
            gate: None,
        }
    }

    /// Blocks every write until a permit is granted with [`FaultyDestination::release`].
    pub fn gated() -> Self {
        Self {
            inner: MemoryDestination::new(),
            faults: Arc::new(Faults::default()),
            gate: Some(Arc::new(Semaphore::new(0))),
        }
    }

    /// Lets `writes` more writes through the gate.
    pub fn release(&self, writes: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(writes);
        }
    }

    /// Returns the number of write attempts, including failed and stalled ones.
    pub fn attempts(&self) -> u32 {
        self.faults.attempts.load(Ordering::SeqCst)
    }

    /// Returns the wrapped destination holding all successful writes.
    pub fn memory(&self) -> &MemoryDestination {
        &self.inner
    }
}

impl Destination for FaultyDestination {
    fn name() -> &'static str {
        "faulty"
    }

    async fn write(&self, record: DestinationRecord) -> CdcResult<()> {
        self.faults.attempts.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            match gate.acquire().await {
                Ok(permit) => permit.forget(),
                Err(_) => bail!(ErrorKind::InvalidState, "Destination gate closed"),
            }
        }

        if take_one(&self.faults.stalls_remaining) {
            tokio::time::sleep(self.faults.stall).await;
        }

        if take_one(&self.faults.failures_remaining) {
            bail!(
                ErrorKind::DestinationWriteFailed,
                "Injected destination failure",
                record.destination()
            );
        }

        self.inner.write(record).await
    }
}

/// Dead letter sink whose captures always fail.
#[derive(Debug, Clone, Default)]
pub struct FailingDeadLetterSink {
    attempts: Arc<AtomicU32>,
}

impl FailingDeadLetterSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl DeadLetterSink for FailingDeadLetterSink {
    fn name() -> &'static str {
        "failing"
    }

    async fn capture(&self, record: DeadLetterRecord) -> CdcResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        bail!(
            ErrorKind::DeadLetterWriteFailed,
            "Injected dead letter failure",
            record.reason
        );
    }
}
