use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::cdc_error;
use crate::destination::Destination;
use crate::error::{CdcResult, ErrorKind};
use crate::types::DestinationRecord;

/// Extension of the per-destination output files.
const FILE_EXTENSION: &str = "jsonl";

/// Destination that appends each record as one JSON line to `<dir>/<destination>.jsonl`.
///
/// Files are opened lazily in append mode and kept open until [`Destination::shutdown`]. The
/// outbound line holds the declared fields followed by `is_deleted` and `lsn`.
#[derive(Debug, Clone)]
pub struct JsonLinesDestination {
    output_dir: PathBuf,
    files: Arc<Mutex<HashMap<String, File>>>,
}

impl JsonLinesDestination {
    /// Creates the destination, creating `output_dir` if it does not exist.
    pub async fn new(output_dir: impl AsRef<Path>) -> CdcResult<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&output_dir).await?;

        Ok(Self {
            output_dir,
            files: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// Returns the file records of `destination` are appended to.
    pub fn file_path(&self, destination: &str) -> PathBuf {
        self.output_dir
            .join(format!("{destination}.{FILE_EXTENSION}"))
    }
}

impl Destination for JsonLinesDestination {
    fn name() -> &'static str {
        "jsonl"
    }

    async fn write(&self, record: DestinationRecord) -> CdcResult<()> {
        let mut line = serde_json::to_vec(&record).map_err(|err| {
            cdc_error!(
                ErrorKind::SerializationError,
                "Could not serialize destination record",
                err.to_string(),
                source: err
            )
        })?;
        line.push(b'\n');

        let mut files = self.files.lock().await;
        if !files.contains_key(record.destination()) {
            let path = self.file_path(record.destination());
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .await
                .map_err(|err| {
                    cdc_error!(
                        ErrorKind::DestinationWriteFailed,
                        "Could not open destination file",
                        path.display(),
                        source: err
                    )
                })?;
            debug!(path = %path.display(), "opened destination file");
            files.insert(record.destination().to_owned(), file);
        }

        let Some(file) = files.get_mut(record.destination()) else {
            return Err(cdc_error!(
                ErrorKind::InvalidState,
                "Destination file missing after open",
                record.destination()
            ));
        };

        // The record must reach the file before the event is acknowledged.
        let written = match file.write_all(&line).await {
            Ok(()) => file.flush().await,
            Err(err) => Err(err),
        };
        written.map_err(|err| {
            cdc_error!(
                ErrorKind::DestinationWriteFailed,
                "Could not append record to destination file",
                record.destination(),
                source: err
            )
        })?;

        debug!(
            destination = record.destination(),
            lsn = record.version_token(),
            is_deleted = record.is_deleted(),
            "appended record to destination file"
        );

        Ok(())
    }

    async fn shutdown(&self) -> CdcResult<()> {
        let mut files = self.files.lock().await;
        for (destination, file) in files.iter_mut() {
            file.flush().await?;
            file.sync_all().await?;
            debug!(destination = %destination, "flushed destination file");
        }

        info!(files = files.len(), "json lines destination shut down");
        files.clear();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::DestinationRouter;
    use crate::schema::{DestinationSchema, FieldSchema, FieldType, TypeRegistry};
    use crate::transformer::Transformer;
    use crate::types::{ChangeEnvelope, Operation};
    use serde_json::{Value, json};

    #[tokio::test]
    async fn appends_one_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let registry = TypeRegistry::new(vec![DestinationSchema::new(
            "customer",
            vec![
                FieldSchema::new("id", FieldType::Integer),
                FieldSchema::new("email", FieldType::String),
            ],
        )])
        .unwrap();
        let transformer = Transformer::new(DestinationRouter::new(Arc::new(registry)));

        let destination = JsonLinesDestination::new(dir.path().join("out"))
            .await
            .unwrap();
        for (operation, lsn) in [(Operation::Insert, "0/1"), (Operation::Delete, "0/2")] {
            let Value::Object(payload) = json!({"id": 1, "email": "a@example.com"}) else {
                unreachable!();
            };
            let record = transformer
                .transform(&ChangeEnvelope::new("customer", operation, lsn, payload))
                .unwrap();
            destination.write(record).await.unwrap();
        }
        destination.shutdown().await.unwrap();

        let contents = tokio::fs::read_to_string(destination.file_path("customer"))
            .await
            .unwrap();
        let lines: Vec<Value> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(
            lines,
            vec![
                json!({"id": 1, "email": "a@example.com", "is_deleted": 0, "lsn": 1}),
                json!({"id": 1, "email": "a@example.com", "is_deleted": 1, "lsn": 2}),
            ]
        );
    }
}
