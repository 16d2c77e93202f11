use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::info;

use crate::cdc_error;
use crate::dead_letter::{DeadLetterRecord, DeadLetterSink};
use crate::error::{CdcResult, ErrorKind};

/// Dead letter sink that appends each record as one JSON line to a single file.
#[derive(Debug, Clone)]
pub struct JsonLinesDeadLetterSink {
    path: PathBuf,
    file: Arc<Mutex<Option<File>>>,
}

impl JsonLinesDeadLetterSink {
    /// Creates the sink. The file and its parent directory are created on first capture.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            file: Arc::new(Mutex::new(None)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn open(&self) -> CdcResult<File> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        info!(path = %self.path.display(), "opened dead letter file");

        Ok(file)
    }
}

impl DeadLetterSink for JsonLinesDeadLetterSink {
    fn name() -> &'static str {
        "jsonl"
    }

    async fn capture(&self, record: DeadLetterRecord) -> CdcResult<()> {
        let mut line = serde_json::to_vec(&record).map_err(|err| {
            cdc_error!(
                ErrorKind::SerializationError,
                "Could not serialize dead letter record",
                err.to_string(),
                source: err
            )
        })?;
        line.push(b'\n');

        let mut guard = self.file.lock().await;
        if guard.is_none() {
            let file = self.open().await.map_err(|err| {
                cdc_error!(
                    ErrorKind::DeadLetterWriteFailed,
                    "Could not open dead letter file",
                    self.path.display(),
                    source: err
                )
            })?;
            *guard = Some(file);
        }

        let Some(file) = guard.as_mut() else {
            return Err(cdc_error!(
                ErrorKind::InvalidState,
                "Dead letter file missing after open"
            ));
        };

        let written = match file.write_all(&line).await {
            Ok(()) => file.flush().await,
            Err(err) => Err(err),
        };
        written.map_err(|err| {
            cdc_error!(
                ErrorKind::DeadLetterWriteFailed,
                "Could not append dead letter record",
                self.path.display(),
                source: err
            )
        })?;

        Ok(())
    }

    async fn shutdown(&self) -> CdcResult<()> {
        let mut guard = self.file.lock().await;
        if let Some(mut file) = guard.take() {
            file.flush().await?;
            file.sync_all().await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[tokio::test]
    async fn appends_records_and_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonLinesDeadLetterSink::new(dir.path().join("dlq").join("dead_letters.jsonl"));

        for table in ["Customer", "unknown_table"] {
            let error = cdc_error!(
                ErrorKind::DestinationNotRegistered,
                "No destination registered",
                table
            );
            let bytes = format!(
                r#"{{"metadata":{{"table":"{table}","operation":"insert","lsn":"0/1"}},"payload":{{}}}}"#
            );
            sink.capture(DeadLetterRecord::from_bytes(bytes.as_bytes(), &error))
                .await
                .unwrap();
        }
        sink.shutdown().await.unwrap();

        let contents = tokio::fs::read_to_string(sink.path()).await.unwrap();
        let reasons: Vec<String> = contents
            .lines()
            .map(|line| {
                let value: Value = serde_json::from_str(line).unwrap();
                value["reason"].as_str().unwrap().to_owned()
            })
            .collect();

        assert_eq!(
            reasons,
            vec![
                "no destination registered for Customer",
                "no destination registered for unknown_table"
            ]
        );
    }
}
