use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::error::{CdcError, ErrorKind};
use crate::types::ChangeEnvelope;

/// The original input preserved by a dead letter record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadLetterPayload {
    /// The inbound JSON, when the input parsed as JSON.
    Envelope(Value),
    /// The raw bytes, base64 encoded when serialized, when the input was not JSON.
    Raw(#[serde(serialize_with = "serialize_base64")] Vec<u8>),
}

/// An event that could not be delivered, with the reason it was diverted.
///
/// Serializes as `{"reason", "error_kind", "table"?, "failed_at", "envelope" | "raw"}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeadLetterRecord {
    pub reason: String,
    #[serde(serialize_with = "serialize_error_kind")]
    pub error_kind: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    pub failed_at: DateTime<Utc>,
    #[serde(flatten)]
    pub payload: DeadLetterPayload,
}

impl DeadLetterRecord {
    /// Wraps raw transport bytes that failed processing with `error`.
    ///
    /// Bytes that parse as JSON are preserved as an envelope, anything else as raw bytes. The
    /// table is taken from `metadata.table` when present.
    pub fn from_bytes(bytes: &[u8], error: &CdcError) -> Self {
        let payload = match serde_json::from_slice::<Value>(bytes) {
            Ok(value) => DeadLetterPayload::Envelope(value),
            Err(_) => DeadLetterPayload::Raw(bytes.to_vec()),
        };

        let table = match &payload {
            DeadLetterPayload::Envelope(value) => value
                .pointer("/metadata/table")
                .and_then(Value::as_str)
                .map(str::to_owned),
            DeadLetterPayload::Raw(_) => None,
        };

        Self::new(payload, table, error)
    }

    /// Wraps a decoded envelope that failed processing with `error`.
    pub fn from_envelope(envelope: &ChangeEnvelope, error: &CdcError) -> Self {
        Self::new(
            DeadLetterPayload::Envelope(envelope.to_json()),
            Some(envelope.table.clone()),
            error,
        )
    }

    fn new(payload: DeadLetterPayload, table: Option<String>, error: &CdcError) -> Self {
        Self {
            reason: error.dead_letter_reason(),
            error_kind: error.kind(),
            table,
            failed_at: Utc::now(),
            payload,
        }
    }

    /// Returns the original bytes, re-encoding a preserved envelope, for replay.
    pub fn original_bytes(&self) -> Vec<u8> {
        match &self.payload {
            DeadLetterPayload::Envelope(value) => serde_json::to_vec(value).unwrap_or_default(),
            DeadLetterPayload::Raw(bytes) => bytes.clone(),
        }
    }
}

fn serialize_error_kind<S: Serializer>(kind: &ErrorKind, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(kind.as_str())
}

fn serialize_base64<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&STANDARD.encode(bytes))
}
