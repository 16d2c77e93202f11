use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::destination::Destination;
use crate::error::CdcResult;
use crate::types::DestinationRecord;

#[derive(Debug, Default)]
struct Inner {
    records: Vec<DestinationRecord>,
}

/// In-memory destination for tests and embedding.
///
/// [`MemoryDestination`] keeps every written record in write order and can simulate the
/// replacing merge of an analytical store with [`MemoryDestination::merged_rows`]. All data is
/// lost when the process terminates.
#[derive(Debug, Clone, Default)]
pub struct MemoryDestination {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryDestination {
    /// Creates a new empty memory destination.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all written records in write order.
    pub async fn records(&self) -> Vec<DestinationRecord> {
        let inner = self.inner.lock().await;
        inner.records.clone()
    }

    /// Returns a copy of the records written to one destination, in write order.
    pub async fn records_for(&self, destination: &str) -> Vec<DestinationRecord> {
        let inner = self.inner.lock().await;
        inner
            .records
            .iter()
            .filter(|record| record.destination() == destination)
            .cloned()
            .collect()
    }

    /// Returns the logical rows of a destination after a replacing merge.
    ///
    /// Records are grouped by their key values. Within a group the record with the highest
    /// version token wins, and on equal tokens the most recently written one. Winners flagged
    /// as deleted are hidden. Rows are returned in the order their key was first written.
    pub async fn merged_rows(&self, destination: &str) -> Vec<DestinationRecord> {
        let inner = self.inner.lock().await;

        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut rows: Vec<&DestinationRecord> = Vec::new();

        for record in inner
            .records
            .iter()
            .filter(|record| record.destination() == destination)
        {
            let key = serde_json::to_string(&record.key_values()).unwrap_or_default();
            match positions.entry(key) {
                Entry::Vacant(entry) => {
                    entry.insert(rows.len());
                    rows.push(record);
                }
                Entry::Occupied(entry) => {
                    let current = &mut rows[*entry.get()];
                    if record.version_token() >= current.version_token() {
                        *current = record;
                    }
                }
            }
        }

        rows.into_iter()
            .filter(|record| record.is_deleted() == 0)
            .cloned()
            .collect()
    }

    /// Clears all stored records.
    pub async fn clear(&self) {
        let mut inner = self.inner.lock().await;
        inner.records.clear();
    }
}

impl Destination for MemoryDestination {
    fn name() -> &'static str {
        "memory"
    }

    async fn write(&self, record: DestinationRecord) -> CdcResult<()> {
        let mut inner = self.inner.lock().await;

        debug!(
            destination = record.destination(),
            lsn = record.version_token(),
            is_deleted = record.is_deleted(),
            "writing record to memory"
        );
        inner.records.push(record);

        Ok(())
    }

    async fn shutdown(&self) -> CdcResult<()> {
        let inner = self.inner.lock().await;
        info!(records = inner.records.len(), "memory destination shut down");

        Ok(())
    }
}
