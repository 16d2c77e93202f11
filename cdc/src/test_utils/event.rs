use serde_json::{Map, Value};

use crate::types::{ChangeEnvelope, Operation};

/// Creates an envelope, panicking if `payload` is not a JSON object.
pub fn envelope(table: &str, operation: Operation, lsn: &str, payload: Value) -> ChangeEnvelope {
    let payload: Map<String, Value> = match payload {
        Value::Object(map) => map,
        other => panic!("payload must be a JSON object, got {other}"),
    };

    ChangeEnvelope::new(table, operation, lsn, payload)
}

/// Creates the wire form of an envelope.
pub fn envelope_bytes(table: &str, operation: Operation, lsn: &str, payload: Value) -> Vec<u8> {
    envelope(table, operation, lsn, payload)
        .encode()
        .expect("envelope encodes")
}

/// Creates `count` wire envelopes inserting customers `1..=count` at increasing ordering tokens.
pub fn customer_inserts(count: u64) -> Vec<Vec<u8>> {
    (1..=count)
        .map(|id| {
            envelope_bytes(
                "customer",
                Operation::Insert,
                &format!("0/{id:X}"),
                serde_json::json!({
                    "id": id,
                    "email": format!("customer{id}@example.com"),
                    "name": format!("Customer {id}"),
                }),
            )
        })
        .collect()
}
