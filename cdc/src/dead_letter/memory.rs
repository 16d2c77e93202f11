use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use crate::dead_letter::{DeadLetterRecord, DeadLetterSink};
use crate::error::CdcResult;

/// In-memory dead letter sink for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryDeadLetterSink {
    records: Arc<Mutex<Vec<DeadLetterRecord>>>,
}

impl MemoryDeadLetterSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all captured records in capture order.
    pub async fn records(&self) -> Vec<DeadLetterRecord> {
        self.records.lock().await.clone()
    }

    pub async fn clear(&self) {
        self.records.lock().await.clear();
    }
}

impl DeadLetterSink for MemoryDeadLetterSink {
    fn name() -> &'static str {
        "memory"
    }

    async fn capture(&self, record: DeadLetterRecord) -> CdcResult<()> {
        debug!(reason = %record.reason, "capturing dead letter in memory");
        self.records.lock().await.push(record);

        Ok(())
    }
}
