//! Metrics definitions for change event routing.

use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};

static REGISTER_METRICS: Once = Once::new();

/// Label for the destination name in metrics.
pub const DESTINATION_LABEL: &str = "destination";

/// Label for the error kind that caused an event to be dead lettered.
pub const REASON_KIND_LABEL: &str = "reason_kind";

/// Counter for deliveries pulled from the event source.
pub const CDC_EVENTS_RECEIVED_TOTAL: &str = "cdc_events_received_total";

/// Counter for records written to a destination. Labels: `destination`.
pub const CDC_RECORDS_WRITTEN_TOTAL: &str = "cdc_records_written_total";

/// Counter for events diverted to the dead letter sink. Labels: `reason_kind`.
pub const CDC_DEAD_LETTERS_TOTAL: &str = "cdc_dead_letters_total";

/// Counter for dead letter captures that failed.
pub const CDC_DEAD_LETTER_FAILURES_TOTAL: &str = "cdc_dead_letter_failures_total";

/// Counter for destination writes that failed and were handed back for redelivery.
pub const CDC_DESTINATION_WRITE_FAILURES_TOTAL: &str = "cdc_destination_write_failures_total";

/// Counter for processing attempts that exceeded the per-event timeout.
pub const CDC_EVENT_TIMEOUTS_TOTAL: &str = "cdc_event_timeouts_total";

/// Histogram of the time spent on a single processing attempt.
pub const CDC_EVENT_PROCESSING_DURATION_SECONDS: &str = "cdc_event_processing_duration_seconds";

/// Registers descriptions for all routing metrics.
///
/// Safe to call multiple times, registration happens only once.
pub fn register_metrics() {
    REGISTER_METRICS.call_once(|| {
        describe_counter!(
            CDC_EVENTS_RECEIVED_TOTAL,
            Unit::Count,
            "Total number of change events received from the event source"
        );

        describe_counter!(
            CDC_RECORDS_WRITTEN_TOTAL,
            Unit::Count,
            "Total number of records written, labeled by destination"
        );

        describe_counter!(
            CDC_DEAD_LETTERS_TOTAL,
            Unit::Count,
            "Total number of events captured by the dead letter sink, labeled by reason kind"
        );

        describe_counter!(
            CDC_DEAD_LETTER_FAILURES_TOTAL,
            Unit::Count,
            "Total number of dead letter captures that failed"
        );

        describe_counter!(
            CDC_DESTINATION_WRITE_FAILURES_TOTAL,
            Unit::Count,
            "Total number of failed destination writes"
        );

        describe_counter!(
            CDC_EVENT_TIMEOUTS_TOTAL,
            Unit::Count,
            "Total number of event processing attempts that timed out"
        );

        describe_histogram!(
            CDC_EVENT_PROCESSING_DURATION_SECONDS,
            Unit::Seconds,
            "Duration of a single event processing attempt"
        );
    });
}
