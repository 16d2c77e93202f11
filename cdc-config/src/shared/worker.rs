use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Worker pool settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct WorkerConfig {
    /// Number of concurrent workers. Events of one table are always handled by the same worker.
    #[serde(default = "default_worker_count")]
    pub worker_count: u16,
    /// Capacity of each worker's queue. A full queue stops the intake from reading the source.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Maximum time, in milliseconds, one event may take before it is handed back for
    /// redelivery.
    #[serde(default = "default_event_timeout_ms")]
    pub event_timeout_ms: u64,
    /// Number of consecutive dead letter failures after which an alert is logged. `0` disables
    /// the alert.
    #[serde(default = "default_dead_letter_alert_threshold")]
    pub dead_letter_alert_threshold: u32,
}

impl WorkerConfig {
    pub const DEFAULT_WORKER_COUNT: u16 = 4;

    pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

    pub const DEFAULT_EVENT_TIMEOUT_MS: u64 = 30_000;

    pub const DEFAULT_DEAD_LETTER_ALERT_THRESHOLD: u32 = 10;

    pub fn validate(&self) -> Result<(), ValidationError> {
        let zero = [
            ("workers.worker_count", self.worker_count == 0),
            ("workers.queue_capacity", self.queue_capacity == 0),
            ("workers.event_timeout_ms", self.event_timeout_ms == 0),
        ];

        if let Some((field, _)) = zero.into_iter().find(|(_, is_zero)| *is_zero) {
            return Err(ValidationError::InvalidFieldValue {
                field: field.to_owned(),
                constraint: "must be greater than 0".to_owned(),
            });
        }

        Ok(())
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            queue_capacity: default_queue_capacity(),
            event_timeout_ms: default_event_timeout_ms(),
            dead_letter_alert_threshold: default_dead_letter_alert_threshold(),
        }
    }
}

fn default_worker_count() -> u16 {
    WorkerConfig::DEFAULT_WORKER_COUNT
}

fn default_queue_capacity() -> usize {
    WorkerConfig::DEFAULT_QUEUE_CAPACITY
}

fn default_event_timeout_ms() -> u64 {
    WorkerConfig::DEFAULT_EVENT_TIMEOUT_MS
}

fn default_dead_letter_alert_threshold() -> u32 {
    WorkerConfig::DEFAULT_DEAD_LETTER_ALERT_THRESHOLD
}
