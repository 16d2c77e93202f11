use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::bail;
use crate::cdc_error;
use crate::error::{CdcResult, ErrorKind};

/// Kind of mutation carried by a [`ChangeEnvelope`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Insert,
    Update,
    Delete,
    /// Initial snapshot row, handled exactly like [`Operation::Insert`].
    Read,
}

impl Operation {
    /// Returns `true` if the operation removes the row.
    pub fn is_delete(&self) -> bool {
        matches!(self, Operation::Delete)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Insert => "insert",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Read => "read",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One captured row-level mutation as delivered by the transport.
///
/// The ordering token is kept in its textual form. It is parsed into an
/// [`crate::types::Lsn`] by the transformer, so that an envelope with a malformed token can
/// still be decoded and preserved as a dead letter.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEnvelope {
    /// Source table name, matched case-sensitively against destination names.
    pub table: String,
    pub operation: Operation,
    /// Ordering token in `<hex>/<hex>` form.
    pub lsn: String,
    /// Field values. For deletes only the key fields are guaranteed to be non-null.
    pub payload: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireEnvelope {
    metadata: WireMetadata,
    #[serde(default)]
    payload: Option<Map<String, Value>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMetadata {
    table: String,
    operation: Operation,
    lsn: String,
}

impl ChangeEnvelope {
    pub fn new(
        table: impl Into<String>,
        operation: Operation,
        lsn: impl Into<String>,
        payload: Map<String, Value>,
    ) -> Self {
        Self {
            table: table.into(),
            operation,
            lsn: lsn.into(),
            payload,
        }
    }

    /// Decodes an envelope from its JSON wire form.
    ///
    /// Missing `metadata`, `table`, `operation` or `lsn`, an unknown operation, or input that
    /// is not a JSON object all yield [`ErrorKind::MalformedEnvelope`]. A missing or `null`
    /// payload decodes as an empty payload.
    pub fn decode(bytes: &[u8]) -> CdcResult<Self> {
        let wire: WireEnvelope = serde_json::from_slice(bytes).map_err(|err| {
            cdc_error!(
                ErrorKind::MalformedEnvelope,
                "Could not decode change envelope",
                err.to_string(),
                source: err
            )
        })?;

        if wire.metadata.table.is_empty() {
            bail!(
                ErrorKind::MalformedEnvelope,
                "Could not decode change envelope",
                "metadata.table is empty"
            );
        }

        Ok(Self {
            table: wire.metadata.table,
            operation: wire.metadata.operation,
            lsn: wire.metadata.lsn,
            payload: wire.payload.unwrap_or_default(),
        })
    }

    /// Returns the JSON wire form of this envelope.
    pub fn to_json(&self) -> Value {
        let mut metadata = Map::new();
        metadata.insert("table".to_owned(), Value::String(self.table.clone()));
        metadata.insert(
            "operation".to_owned(),
            Value::String(self.operation.as_str().to_owned()),
        );
        metadata.insert("lsn".to_owned(), Value::String(self.lsn.clone()));

        let mut envelope = Map::new();
        envelope.insert("metadata".to_owned(), Value::Object(metadata));
        envelope.insert("payload".to_owned(), Value::Object(self.payload.clone()));

        Value::Object(envelope)
    }

    /// Encodes this envelope into its JSON wire form.
    pub fn encode(&self) -> CdcResult<Vec<u8>> {
        serde_json::to_vec(&self.to_json()).map_err(|err| {
            cdc_error!(
                ErrorKind::SerializationError,
                "Could not encode change envelope",
                err.to_string(),
                source: err
            )
        })
    }
}

/// Extracts the table name from a raw delivery without decoding the full envelope.
///
/// Returns [`None`] when the bytes do not carry a `metadata.table` string.
pub fn peek_table(bytes: &[u8]) -> Option<String> {
    #[derive(Deserialize)]
    struct Peek {
        metadata: PeekMetadata,
    }

    #[derive(Deserialize)]
    struct PeekMetadata {
        table: String,
    }

    serde_json::from_slice::<Peek>(bytes)
        .ok()
        .map(|peek| peek.metadata.table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_full_envelope() {
        let bytes = br#"{
            "metadata": {"table": "customer", "operation": "update", "lsn": "0/16B3748"},
            "payload": {"id": 1, "email": "a@example.com", "name": null}
        }"#;

        let envelope = ChangeEnvelope::decode(bytes).unwrap();
        assert_eq!(envelope.table, "customer");
        assert_eq!(envelope.operation, Operation::Update);
        assert_eq!(envelope.lsn, "0/16B3748");
        assert_eq!(envelope.payload.get("id"), Some(&json!(1)));
        assert_eq!(envelope.payload.get("name"), Some(&Value::Null));
    }

    #[test]
    fn decode_read_operation() {
        let bytes = br#"{"metadata": {"table": "product", "operation": "read", "lsn": "0/1"}, "payload": {}}"#;
        let envelope = ChangeEnvelope::decode(bytes).unwrap();
        assert_eq!(envelope.operation, Operation::Read);
        assert!(!envelope.operation.is_delete());
    }

    #[test]
    fn decode_missing_payload_is_empty() {
        let bytes = br#"{"metadata": {"table": "customer", "operation": "delete", "lsn": "0/1"}}"#;
        let envelope = ChangeEnvelope::decode(bytes).unwrap();
        assert!(envelope.payload.is_empty());

        let bytes = br#"{"metadata": {"table": "customer", "operation": "delete", "lsn": "0/1"}, "payload": null}"#;
        let envelope = ChangeEnvelope::decode(bytes).unwrap();
        assert!(envelope.payload.is_empty());
    }

    #[test]
    fn decode_rejects_malformed_input() {
        let inputs: [&[u8]; 6] = [
            b"not json",
            br#"[1, 2]"#,
            br#"{"payload": {}}"#,
            br#"{"metadata": {"operation": "insert", "lsn": "0/1"}}"#,
            br#"{"metadata": {"table": "customer", "operation": "upsert", "lsn": "0/1"}}"#,
            br#"{"metadata": {"table": "", "operation": "insert", "lsn": "0/1"}}"#,
        ];

        for input in inputs {
            let err = ChangeEnvelope::decode(input).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::MalformedEnvelope);
        }
    }

    #[test]
    fn encode_then_decode_preserves_envelope() {
        let mut payload = Map::new();
        payload.insert("id".to_owned(), json!(7));
        let envelope = ChangeEnvelope::new("order", Operation::Insert, "0/2A", payload);

        let decoded = ChangeEnvelope::decode(&envelope.encode().unwrap()).unwrap();
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn peek_table_reads_metadata_only() {
        assert_eq!(
            peek_table(br#"{"metadata": {"table": "Customer", "operation": "bogus"}}"#),
            Some("Customer".to_owned())
        );
        assert_eq!(peek_table(b"garbage"), None);
    }
}
